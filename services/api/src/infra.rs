use brewscore::feedback::{
    BatchId, FeedbackId, FeedbackRecord, FeedbackRepository, RepositoryError, ScoreWriteBack,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Process-local feedback store backing the service and the demo.
#[derive(Default, Clone)]
pub(crate) struct InMemoryFeedbackRepository {
    records: Arc<Mutex<HashMap<FeedbackId, FeedbackRecord>>>,
}

impl InMemoryFeedbackRepository {
    fn lock(&self) -> Result<MutexGuard<'_, HashMap<FeedbackId, FeedbackRecord>>, RepositoryError> {
        self.records
            .lock()
            .map_err(|_| RepositoryError::Unavailable("feedback store lock poisoned".to_string()))
    }
}

impl FeedbackRepository for InMemoryFeedbackRepository {
    fn insert(&self, record: FeedbackRecord) -> Result<FeedbackRecord, RepositoryError> {
        let mut guard = self.lock()?;
        if guard.contains_key(&record.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    fn fetch(&self, id: &FeedbackId) -> Result<Option<FeedbackRecord>, RepositoryError> {
        let guard = self.lock()?;
        Ok(guard.get(id).cloned())
    }

    fn write_score(&self, id: &FeedbackId, score: ScoreWriteBack) -> Result<(), RepositoryError> {
        let mut guard = self.lock()?;
        match guard.get_mut(id) {
            Some(record) => {
                record.score = Some(score);
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    fn for_batch(&self, batch_id: &BatchId) -> Result<Vec<FeedbackRecord>, RepositoryError> {
        let guard = self.lock()?;
        let mut records: Vec<FeedbackRecord> = guard
            .values()
            .filter(|record| &record.submission.batch_id == batch_id)
            .cloned()
            .collect();
        records.sort_by(|left, right| left.id.cmp(&right.id));
        Ok(records)
    }
}
