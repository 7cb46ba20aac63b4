//! Rician noise
//!
//! Magnitude images carry Rician noise: Gaussian noise of equal variance is
//! added to the real and imaginary channels and the magnitude is returned.

use ndarray::{ArrayD, ArrayViewD};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};

use crate::config::NoiseConfig;
use crate::error::SimError;

/// Add Rician noise with standard deviation `1 / snr` per channel.
pub fn add_noise<R: Rng + ?Sized>(
    signal: &[f64],
    snr: f64,
    rng: &mut R,
) -> Result<Vec<f64>, SimError> {
    let channel = channel_noise(snr)?;
    check_signal(signal.iter())?;
    Ok(signal
        .iter()
        .map(|&s| rician_sample(s, &channel, rng))
        .collect())
}

/// [`add_noise`] for arrays of any shape; the output has the input's shape.
pub fn add_noise_array<R: Rng + ?Sized>(
    signal: ArrayViewD<'_, f64>,
    snr: f64,
    rng: &mut R,
) -> Result<ArrayD<f64>, SimError> {
    let channel = channel_noise(snr)?;
    check_signal(signal.iter())?;
    Ok(signal.map(|&s| rician_sample(s, &channel, rng)))
}

/// Deterministic [`add_noise`] driven by a ChaCha8 generator seeded from `config.seed`.
pub fn add_noise_seeded(signal: &[f64], config: &NoiseConfig) -> Result<Vec<f64>, SimError> {
    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
    add_noise(signal, config.snr, &mut rng)
}

fn channel_noise(snr: f64) -> Result<Normal<f64>, SimError> {
    if !snr.is_finite() || snr <= 0.0 {
        return Err(SimError::value(
            "snr",
            format!("must be finite and > 0, got {snr}"),
        ));
    }
    Normal::new(0.0, 1.0 / snr).map_err(|e| SimError::value("snr", e.to_string()))
}

fn check_signal<'a>(mut values: impl Iterator<Item = &'a f64>) -> Result<(), SimError> {
    match values.find(|s| !s.is_finite() || **s < 0.0) {
        Some(bad) => Err(SimError::value(
            "signal",
            format!("entries must be finite and >= 0, got {bad}"),
        )),
        None => Ok(()),
    }
}

fn rician_sample<R: Rng + ?Sized>(s: f64, channel: &Normal<f64>, rng: &mut R) -> f64 {
    let real = s + channel.sample(rng);
    let imag = channel.sample(rng);
    real.hypot(imag)
}
