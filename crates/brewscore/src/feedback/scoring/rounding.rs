/// Round to two decimals, ties away from zero.
///
/// Operates on the binary `f64` value: `1.005` and `2.675` are stored slightly below the
/// midpoint and round down, while exactly representable ties such as `0.125` round up
/// to `0.13`. This is what `Number.prototype.toFixed(2)` yields for the same inputs.
pub fn round2(value: f64) -> f64 {
    round_decimals(value, 100.0)
}

/// One-decimal variant used for dashboard averages.
pub fn round1(value: f64) -> f64 {
    round_decimals(value, 10.0)
}

fn round_decimals(value: f64, scale: f64) -> f64 {
    if !value.is_finite() {
        return value;
    }

    let scaled = value * scale;
    // Exact error of the multiplication; decides ties the product rounded onto.
    let residue = value.mul_add(scale, -scaled);
    let whole = scaled.trunc();

    let steps = if (scaled - whole).abs() == 0.5 {
        let true_tie = residue == 0.0;
        let beyond_tie = residue.signum() == scaled.signum();
        if true_tie || beyond_tie {
            whole + scaled.signum()
        } else {
            whole
        }
    } else {
        scaled.round()
    };

    let rounded = steps / scale;
    // Normalise -0.0 so serialized output stays byte-identical.
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}
