use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Largest accepted grid side. At 2px per cell the rendered frame is
/// 4096 × 4096 RGBA (64 MiB), and each grid buffer holds 4M cells.
pub const MAX_SIZE: usize = 2048;

/// Parameters of one simulation run. Replaceable between runs, never mid-step.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Grid side length.
    pub size: usize,
    /// Per-neighbor, per-step chance an infected cell infects a susceptible one.
    pub probability_to_infect_neighbour: f64,
    /// Days a new infection lasts, drawn uniformly; `end` is exclusive.
    pub illness_duration: Range<u32>,
    /// Per-step chance an infected cell dies.
    pub probability_of_death: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            size: 50,
            probability_to_infect_neighbour: 0.1,
            illness_duration: 2..6,
            probability_of_death: 0.05,
        }
    }
}

impl SimulationConfig {
    /// Check every precondition the engine relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.size == 0 {
            return Err(ConfigError::ZeroSize);
        }
        if self.size > MAX_SIZE {
            return Err(ConfigError::SizeTooLarge {
                size: self.size,
                max: MAX_SIZE,
            });
        }
        check_probability(
            "probability_to_infect_neighbour",
            self.probability_to_infect_neighbour,
        )?;
        check_probability("probability_of_death", self.probability_of_death)?;
        if self.illness_duration.is_empty() {
            return Err(ConfigError::EmptyDuration {
                min: self.illness_duration.start,
                max: self.illness_duration.end,
            });
        }
        Ok(())
    }
}

fn check_probability(name: &'static str, value: f64) -> Result<(), ConfigError> {
    // NaN fails the range check too.
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::Probability { name, value })
    }
}
