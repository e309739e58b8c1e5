//! Linear-interpolation resampling.

/// Resample from `source_rate` to `target_rate`.
pub fn resample_linear(input: &[f32], source_rate: u32, target_rate: u32) -> Vec<f32> {
    resample_by_ratio(input, source_rate as f64 / target_rate as f64)
}

/// Resample by reading the input at `ratio` input samples per output sample.
///
/// `ratio > 1` shortens the signal, `ratio < 1` stretches it. The output holds
/// `ceil(len / ratio)` samples. A ratio that is not a positive finite number
/// leaves the input unchanged.
pub fn resample_by_ratio(input: &[f32], ratio: f64) -> Vec<f32> {
    if input.is_empty() {
        return Vec::new();
    }
    if !(ratio.is_finite() && ratio > 0.0) {
        return input.to_vec();
    }
    if input.len() == 1 {
        return vec![input[0]];
    }

    let output_len = ((input.len() as f64 / ratio).ceil()) as usize;
    let mut output = Vec::with_capacity(output_len);

    for i in 0..output_len {
        let src_pos = i as f64 * ratio;
        let idx = src_pos as usize;
        let frac = (src_pos - idx as f64) as f32;

        let sample = if idx + 1 < input.len() {
            input[idx] * (1.0 - frac) + input[idx + 1] * frac
        } else {
            input[idx.min(input.len() - 1)]
        };
        output.push(sample);
    }

    output
}
