//! Simulation configuration
//!
//! Serde-backed settings with documented defaults. Every struct validates
//! itself before use; a [`RunConfig`] can be read from TOML text.

use serde::{Deserialize, Serialize};

use crate::error::SimError;
use crate::protocol::{EncodingShape, Protocol};

/// Settings of one distribution simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Per-tensor population weights; uniform `1/M` when absent.
    /// Used as given, without renormalisation.
    pub population_weights: Option<Vec<f64>>,
    /// Exponent applied to each tensor's `<B, D>` before the exponential (1 = mono-exponential).
    pub generalized_exponent: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            population_weights: None,
            generalized_exponent: 1.0,
        }
    }
}

impl SimulationConfig {
    pub fn validate(&self) -> Result<(), SimError> {
        if !self.generalized_exponent.is_finite() || self.generalized_exponent <= 0.0 {
            return Err(SimError::value(
                "generalized_exponent",
                format!("must be finite and > 0, got {}", self.generalized_exponent),
            ));
        }
        if let Some(weights) = &self.population_weights {
            if let Some(i) = weights.iter().position(|w| !w.is_finite() || *w < 0.0) {
                return Err(SimError::value(
                    "p",
                    format!("entry {i} must be finite and >= 0, got {}", weights[i]),
                ));
            }
        }
        Ok(())
    }
}

/// Acquisition scheme as plain data.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProtocolConfig {
    pub bvals: Vec<f64>,
    pub bvecs: Vec<[f64; 3]>,
    #[serde(default)]
    pub shape: EncodingShape,
}

impl ProtocolConfig {
    pub fn build(&self) -> Result<Protocol, SimError> {
        Protocol::from_directions(&self.bvals, &self.bvecs, self.shape)
    }
}

/// Rician noise settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseConfig {
    /// Signal-to-noise ratio relative to a unit b0 signal.
    pub snr: f64,
    /// RNG seed for reproducibility
    pub seed: u64,
}

impl Default for NoiseConfig {
    fn default() -> Self {
        Self {
            snr: 50.0,
            seed: 42,
        }
    }
}

impl NoiseConfig {
    pub fn validate(&self) -> Result<(), SimError> {
        if !self.snr.is_finite() || self.snr <= 0.0 {
            return Err(SimError::value(
                "snr",
                format!("must be finite and > 0, got {}", self.snr),
            ));
        }
        Ok(())
    }
}

/// Protocol, simulation and optional noise settings of one run.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RunConfig {
    pub protocol: ProtocolConfig,
    #[serde(default)]
    pub simulation: SimulationConfig,
    #[serde(default)]
    pub noise: Option<NoiseConfig>,
}

impl RunConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self, SimError> {
        let cfg: RunConfig = toml::from_str(raw)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), SimError> {
        self.protocol
            .build()
            .map_err(|e| SimError::Config(e.to_string()))?;
        self.simulation
            .validate()
            .map_err(|e| SimError::Config(e.to_string()))?;
        if let Some(noise) = &self.noise {
            noise.validate().map_err(|e| SimError::Config(e.to_string()))?;
        }
        Ok(())
    }
}
