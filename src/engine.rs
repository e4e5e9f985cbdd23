use serde::Serialize;
use tracing::{debug, info};

use crate::cell::{CellChange, CellState, Census, ChangeObserver};
use crate::config::SimulationConfig;
use crate::error::Result;
use crate::grid::Grid;
use crate::rng::{RandomSource, Rng};

/// Outcome of one [`Simulation::advance`] call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct StepSummary {
    /// Generation reached by this step.
    pub generation: u64,
    /// Susceptible cells that became infected.
    pub newly_infected: usize,
    /// Infected cells that became immune.
    pub recovered: usize,
    /// Infected cells that died.
    pub died: usize,
    /// Counts after the step.
    pub census: Census,
}

/// Double-buffered epidemic automaton on a torus.
///
/// A step reads only `current` and writes only `next`, then swaps them, so no
/// cell sees a neighbor's same-step update. In particular a cell infected during
/// step N starts infecting others in step N+1.
///
/// When several infected cells successfully infect the same susceptible
/// neighbor in one step, the last writer in row-major order of the infecting
/// cells wins; every success draws its own duration.
pub struct Simulation<R = Rng> {
    config: SimulationConfig,
    current: Grid<CellState>,
    next: Grid<CellState>,
    rng: R,
    generation: u64,
}

impl Simulation<Rng> {
    /// Engine seeded with a deterministic [`Rng`].
    pub fn with_seed(config: SimulationConfig, seed: u64) -> Result<Self> {
        Self::new(config, Rng::new(seed))
    }
}

impl<R: RandomSource> Simulation<R> {
    pub fn new(config: SimulationConfig, rng: R) -> Result<Self> {
        config.validate()?;
        let size = config.size;
        Ok(Self {
            config,
            current: Grid::new(size),
            next: Grid::new(size),
            rng,
            generation: 0,
        })
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn size(&self) -> usize {
        self.current.size()
    }

    pub fn grid(&self) -> &Grid<CellState> {
        &self.current
    }

    /// State at wrapped coordinates.
    pub fn get(&self, x: i64, y: i64) -> CellState {
        self.current.get(x, y)
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn census(&self) -> Census {
        Census::tally(&self.current.data)
    }

    /// True while at least one cell is infected.
    pub fn is_active(&self) -> bool {
        self.current.data.iter().any(|s| s.is_infected())
    }

    pub fn rng_mut(&mut self) -> &mut R {
        &mut self.rng
    }

    /// Advance one generation and report every changed cell to `observer`.
    pub fn advance(&mut self, mut observer: impl ChangeObserver) -> StepSummary {
        self.next.copy_from(&self.current);

        let p_infect = self.config.probability_to_infect_neighbour;
        let p_death = self.config.probability_of_death;

        for i in 0..self.current.len() {
            let CellState::Infected { days_remaining } = self.current.data[i] else {
                continue;
            };
            let (x, y) = self.current.coords(i);

            let own = if days_remaining == 0 {
                CellState::Immune
            } else if self.rng.chance(p_death) {
                CellState::Dead
            } else {
                CellState::Infected { days_remaining: days_remaining - 1 }
            };
            self.next.data[i] = own;

            for (t, s) in self.current.neighbors_of(x as i64, y as i64) {
                let j = self.current.idx(t, s);
                if !self.current.data[j].is_susceptible() {
                    continue;
                }
                if self.rng.chance(p_infect) {
                    let days_remaining = self.rng.draw_duration(&self.config.illness_duration);
                    self.next.data[j] = CellState::Infected { days_remaining };
                }
            }
        }

        self.generation += 1;
        let mut summary = StepSummary {
            generation: self.generation,
            ..StepSummary::default()
        };

        for (i, (&before, &after)) in self.current.data.iter().zip(&self.next.data).enumerate() {
            if before == after {
                continue;
            }
            match (before, after) {
                (CellState::Susceptible, CellState::Infected { .. }) => summary.newly_infected += 1,
                (CellState::Infected { .. }, CellState::Immune) => summary.recovered += 1,
                (CellState::Infected { .. }, CellState::Dead) => summary.died += 1,
                _ => {}
            }
            let (x, y) = self.current.coords(i);
            observer.on_change(&CellChange { x, y, state: after });
        }

        std::mem::swap(&mut self.current, &mut self.next);
        summary.census = self.census();

        debug!(
            generation = summary.generation,
            newly_infected = summary.newly_infected,
            recovered = summary.recovered,
            died = summary.died,
            infected = summary.census.infected,
            "step"
        );
        summary
    }

    /// Infect `(x, y)` with a fresh duration. No neighbor is touched.
    pub fn force_infect(&mut self, x: i64, y: i64) -> CellChange {
        let days_remaining = self.rng.draw_duration(&self.config.illness_duration);
        self.force_state(x, y, CellState::Infected { days_remaining })
    }

    /// Put `(x, y)` into `state` in both buffers, outside the step loop.
    pub fn force_state(&mut self, x: i64, y: i64, state: CellState) -> CellChange {
        let (x, y) = self.current.wrap(x, y);
        let i = self.current.idx(x, y);
        self.current.data[i] = state;
        self.next.data[i] = state;
        CellChange { x, y, state }
    }

    /// Every cell back to susceptible, generation 0. Config is kept.
    pub fn reset(&mut self) {
        self.current.fill(CellState::Susceptible);
        self.next.fill(CellState::Susceptible);
        self.generation = 0;
        info!(size = self.size(), "simulation reset");
    }

    /// Replace the config between runs. A new size starts a fresh grid;
    /// the same size keeps the cells.
    pub fn reconfigure(&mut self, config: SimulationConfig) -> Result<()> {
        config.validate()?;
        if config.size != self.size() {
            self.current = Grid::new(config.size);
            self.next = Grid::new(config.size);
            self.generation = 0;
        }
        info!(
            size = config.size,
            infect = config.probability_to_infect_neighbour,
            death = config.probability_of_death,
            "simulation reconfigured"
        );
        self.config = config;
        Ok(())
    }
}
