use crate::error::ScaleError;

/// Bump an even window size to the next odd one.
pub fn odd_window(window_size: usize) -> usize {
    match window_size % 2 {
        0 => window_size + 1,
        _ => window_size,
    }
}

/// Normalized gaussian weights over an odd window, `sigma = window / 6`.
///
/// An even `window_size` is bumped to the next odd size, so the kernel is
/// always centered on a sample.
pub fn smoothing_kernel(window_size: usize) -> Vec<f64> {
    let size = odd_window(window_size);
    let center = (size / 2) as f64;
    let sigma = size as f64 / 6.0;
    let denom = 2.0 * sigma * sigma;

    let weights = (0..size)
        .map(|i| {
            let x = i as f64 - center;
            (-(x * x) / denom).exp()
        })
        .collect::<Vec<_>>();

    let total = weights.iter().sum::<f64>();
    weights.into_iter().map(|w| w / total).collect()
}

/// Smooth a series with a gaussian kernel, keeping its length.
///
/// Taps that fall outside the series are dropped and the remaining weights
/// renormalized, so the ends are averaged over fewer samples and a
/// constant series comes back unchanged.
///
/// # Arguments
///
/// * `src` - The series to smooth.
/// * `window_size` - The requested window size, bumped to odd.
///
/// # Errors
///
/// `InsufficientFrames` when the series is shorter than the window.
pub fn gaussian_smooth(src: &[f64], window_size: usize) -> Result<Vec<f64>, ScaleError> {
    // reject before allocating the kernel
    let size = odd_window(window_size);
    if src.len() < size {
        return Err(ScaleError::InsufficientFrames {
            stage: "gaussian smoothing",
            required: size,
            actual: src.len(),
        });
    }
    let kernel = smoothing_kernel(size);

    let half = kernel.len() / 2;
    let n = src.len();

    let dst = (0..n)
        .map(|i| {
            let lo = i.saturating_sub(half);
            let hi = (i + half).min(n - 1);
            let (acc, weight) = (lo..=hi).fold((0.0, 0.0), |(acc, weight), j| {
                let k = kernel[j + half - i];
                (acc + k * src[j], weight + k)
            });
            acc / weight
        })
        .collect();

    Ok(dst)
}
