pub mod cell;
pub mod config;
pub mod driver;
pub mod engine;
pub mod error;
pub mod grid;
pub mod render;
pub mod rng;

use std::time::Instant;

use serde::Serialize;
use tracing::info;

pub use cell::{CellChange, CellState, Census, ChangeObserver, NoOpObserver};
pub use config::SimulationConfig;
pub use engine::{Simulation, StepSummary};
pub use error::{ConfigError, Error, Result};
pub use grid::Grid;
pub use rng::{RandomSource, Rng, ScriptedSource};

#[derive(Clone, Debug, Serialize)]
pub struct Timing {
    pub name: &'static str,
    pub ms: f64,
}

/// A finished batch run.
pub struct Run {
    pub simulation: Simulation,
    pub history: Vec<StepSummary>,
    pub timings: Vec<Timing>,
}

/// Seed `outbreak`, then advance until nobody is infected or `max_steps`.
/// Every change goes to `observer`, including the seeding.
pub fn run(
    config: SimulationConfig,
    seed: u64,
    outbreak: &[(i64, i64)],
    max_steps: u64,
    mut observer: impl ChangeObserver,
) -> Result<Run> {
    let mut timings = Vec::new();
    let total_start = Instant::now();

    let mut simulation = Simulation::with_seed(config, seed)?;
    for &(x, y) in outbreak {
        let change = simulation.force_infect(x, y);
        observer.on_change(&change);
    }

    let t = Instant::now();
    let mut history = Vec::new();
    while simulation.is_active() && simulation.generation() < max_steps {
        history.push(simulation.advance(&mut observer));
    }
    timings.push(Timing {
        name: "advance",
        ms: t.elapsed().as_secs_f64() * 1000.0,
    });

    timings.push(Timing {
        name: "TOTAL",
        ms: total_start.elapsed().as_secs_f64() * 1000.0,
    });

    let census = simulation.census();
    info!(
        steps = history.len(),
        immune = census.immune,
        dead = census.dead,
        susceptible = census.susceptible,
        "run finished"
    );

    Ok(Run {
        simulation,
        history,
        timings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_stops_when_epidemic_burns_out() {
        let cfg = SimulationConfig { size: 16, ..Default::default() };
        let run = run(cfg, 5, &[(8, 8)], 10_000, NoOpObserver).unwrap();
        assert!(!run.simulation.is_active());
        assert_eq!(run.history.len() as u64, run.simulation.generation());
        assert_eq!(run.simulation.census().total(), 256);
        assert_eq!(run.timings.last().map(|t| t.name), Some("TOTAL"));
    }

    #[test]
    fn run_respects_step_limit() {
        let cfg = SimulationConfig {
            size: 30,
            probability_to_infect_neighbour: 0.9,
            probability_of_death: 0.0,
            ..Default::default()
        };
        let run = run(cfg, 1, &[(0, 0)], 2, NoOpObserver).unwrap();
        assert_eq!(run.history.len(), 2);
        assert!(run.simulation.is_active());
    }

    #[test]
    fn run_reports_seeding_to_observer() {
        let cfg = SimulationConfig { size: 4, ..Default::default() };
        let mut changes = Vec::new();
        run(cfg, 3, &[(1, 1)], 0, &mut changes).unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!((changes[0].x, changes[0].y), (1, 1));
    }

    #[test]
    fn run_rejects_invalid_config() {
        let cfg = SimulationConfig { probability_of_death: 3.0, ..Default::default() };
        assert!(matches!(run(cfg, 0, &[], 1, NoOpObserver), Err(Error::InvalidConfig { .. })));
    }
}
