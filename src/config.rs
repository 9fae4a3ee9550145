use crate::error::{OrderError, Result};
use std::time::Duration;

pub const DEFAULT_CURRENCY: &str = "USD";
pub const DEFAULT_LATENCY: Duration = Duration::from_millis(1000);
pub const DEFAULT_SUCCESS_RATE: f64 = 0.8;

/// Behaviour of the simulated payment processor.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulatorConfig {
    /// Artificial delay applied to every charge and refund.
    pub latency: Duration,
    /// Probability in `[0, 1]` that a charge succeeds.
    pub success_rate: f64,
    /// Seed for the simulator's random source. `None` seeds from the OS.
    pub seed: Option<u64>,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            latency: DEFAULT_LATENCY,
            success_rate: DEFAULT_SUCCESS_RATE,
            seed: None,
        }
    }
}

impl SimulatorConfig {
    pub fn validate(&self) -> Result<()> {
        if (0.0..=1.0).contains(&self.success_rate) {
            Ok(())
        } else {
            Err(OrderError::ValidationError(format!(
                "success rate must be between 0 and 1, got {}",
                self.success_rate
            )))
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Currency every order is charged in.
    pub currency: String,
    pub payment: SimulatorConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            currency: DEFAULT_CURRENCY.to_string(),
            payment: SimulatorConfig::default(),
        }
    }
}
