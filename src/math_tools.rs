//! Numerical building blocks shared by the pipeline stages: the Kaiser
//! window and its Bessel kernel, centered convolution, and local-extrema
//! search along a matrix row.

use ndarray::ArrayView1;
use realfft::RealFftPlanner;

/// Generate a Kaiser window of `length` samples with shape parameter β.
///
/// β trades main-lobe width against sidelobe level; the filter bank uses
/// β = 9.0 for strong stopband rejection of neighbouring period bands.
pub fn kaiser_window(length: usize, beta: f64) -> Vec<f64> {
    if length == 0 {
        return vec![];
    }
    if length == 1 {
        return vec![1.0];
    }

    let half = (length - 1) as f64 / 2.0;
    let i0_beta = bessel_i0(beta);
    (0..length)
        .map(|n| {
            let x = (n as f64 - half) / half;
            bessel_i0(beta * (1.0 - x * x).sqrt()) / i0_beta
        })
        .collect()
}

/// Modified Bessel function of the first kind, order 0.
///
/// Polynomial approximation for small arguments, asymptotic expansion
/// beyond 3.75 (Abramowitz & Stegun 9.8.1/9.8.2).
fn bessel_i0(x: f64) -> f64 {
    let ax = x.abs();
    if ax < 1e-10 {
        return 1.0;
    }

    if ax < 3.75 {
        let t = (x / 3.75).powi(2);
        1.0 + t
            * (3.5156229
                + t * (3.0899424
                    + t * (1.2067492 + t * (0.2659732 + t * (0.0360768 + t * 0.0045813)))))
    } else {
        let t = 3.75 / ax;
        (ax.exp() / ax.sqrt())
            * (0.39894228
                + t * (0.01328592
                    + t * (0.00225319
                        + t * (-0.00157565
                            + t * (0.00916281
                                + t * (-0.02057706
                                    + t * (0.02635537 + t * (-0.01647633 + t * 0.00392377))))))))
    }
}

/// Direct evaluation below this operation count; FFT overlap wins above.
const DIRECT_CONV_OPS: usize = 16_384;

/// Centered ("same") convolution: the output has the length of `signal`,
/// aligned so a symmetric kernel introduces no delay.
///
/// Long products go through a zero-padded real FFT; small ones are
/// evaluated directly.
pub fn convolve_same(signal: &[f64], kernel: &[f64]) -> Vec<f64> {
    let n = signal.len();
    let m = kernel.len();
    if n == 0 || m == 0 {
        return vec![0.0; n];
    }
    if n.saturating_mul(m) <= DIRECT_CONV_OPS {
        return convolve_same_direct(signal, kernel);
    }
    convolve_same_fft(signal, kernel)
}

fn convolve_same_direct(signal: &[f64], kernel: &[f64]) -> Vec<f64> {
    let n = signal.len();
    let m = kernel.len();
    let center = (m - 1) / 2;
    let mut out = vec![0.0; n];
    for (i, o) in out.iter_mut().enumerate() {
        let mut acc = 0.0;
        // full-convolution index i + center; kernel taps k hit signal i + center - k
        for (k, &h) in kernel.iter().enumerate() {
            let j = i + center;
            if j >= k && j - k < n {
                acc += signal[j - k] * h;
            }
        }
        *o = acc;
    }
    out
}

fn convolve_same_fft(signal: &[f64], kernel: &[f64]) -> Vec<f64> {
    let n = signal.len();
    let m = kernel.len();
    let size = (n + m - 1).next_power_of_two();

    let mut planner = RealFftPlanner::<f64>::new();
    let r2c = planner.plan_fft_forward(size);
    let c2r = planner.plan_fft_inverse(size);

    let mut padded = vec![0.0; size];
    padded[..n].copy_from_slice(signal);
    let mut spectrum = r2c.make_output_vec();
    // the transforms only fail on a length mismatch, which the padding
    // above rules out; fall through to the direct path regardless
    if r2c.process(&mut padded, &mut spectrum).is_err() {
        return convolve_same_direct(signal, kernel);
    }

    let mut padded_kernel = vec![0.0; size];
    padded_kernel[..m].copy_from_slice(kernel);
    let mut kernel_spectrum = r2c.make_output_vec();
    if r2c.process(&mut padded_kernel, &mut kernel_spectrum).is_err() {
        return convolve_same_direct(signal, kernel);
    }

    for (s, k) in spectrum.iter_mut().zip(kernel_spectrum.iter()) {
        *s *= *k;
    }

    let mut full = vec![0.0; size];
    if c2r.process(&mut spectrum, &mut full).is_err() {
        return convolve_same_direct(signal, kernel);
    }

    let scale = 1.0 / size as f64;
    let center = (m - 1) / 2;
    full[center..center + n].iter().map(|v| v * scale).collect()
}

/// Cross-correlate two equal-rate signals over lags `-max_lag..=max_lag`.
///
/// `R_xy(lag) = Σ_n x[n] · y[n + lag]`, returned with the zero lag at index
/// `max_lag`.
pub fn cross_correlate_full(x: &[f64], y: &[f64], max_lag: usize) -> Vec<f64> {
    let n = x.len().min(y.len());
    if n == 0 {
        return Vec::new();
    }
    let max_lag = max_lag.min(n.saturating_sub(1));
    let mut result = Vec::with_capacity(2 * max_lag + 1);

    // negative lags: y leads x
    for lag in (1..=max_lag).rev() {
        let mut sum = 0.0;
        for i in 0..(n - lag) {
            sum += x[i + lag] * y[i];
        }
        result.push(sum);
    }

    // zero and positive lags
    for lag in 0..=max_lag {
        let mut sum = 0.0;
        for i in 0..(n - lag) {
            sum += x[i] * y[i + lag];
        }
        result.push(sum);
    }

    result
}

/// Indices of strict local maxima of `row` (both neighbours smaller).
pub fn local_maxima(row: ArrayView1<f64>) -> Vec<usize> {
    local_extrema(row, |c, l, r| c > l && c > r)
}

/// Indices of strict local minima of `row` (both neighbours greater).
pub fn local_minima(row: ArrayView1<f64>) -> Vec<usize> {
    local_extrema(row, |c, l, r| c < l && c < r)
}

fn local_extrema(row: ArrayView1<f64>, keep: impl Fn(f64, f64, f64) -> bool) -> Vec<usize> {
    let mut hits = Vec::new();
    for i in 1..row.len().saturating_sub(1) {
        if keep(row[i], row[i - 1], row[i + 1]) {
            hits.push(i);
        }
    }
    hits
}
