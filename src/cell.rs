use serde::{Deserialize, Serialize};

/// Disease state of one individual.
///
/// `Immune` and `Dead` are terminal: nothing inside a step moves a cell out
/// of them. Only an explicit force command can.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum CellState {
    #[default]
    Susceptible,
    Infected { days_remaining: u32 },
    Immune,
    Dead,
}

impl CellState {
    #[inline]
    pub fn is_susceptible(self) -> bool {
        matches!(self, Self::Susceptible)
    }

    #[inline]
    pub fn is_infected(self) -> bool {
        matches!(self, Self::Infected { .. })
    }

    /// Renderer-facing name of the state.
    pub fn label(self) -> &'static str {
        match self {
            Self::Susceptible => "initial",
            Self::Infected { .. } => "sick",
            Self::Immune => "immune",
            Self::Dead => "dead",
        }
    }
}

/// "Cell `(x, y)` is now `state`."
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct CellChange {
    pub x: usize,
    pub y: usize,
    pub state: CellState,
}

/// Receives per-cell change notifications from the engine.
pub trait ChangeObserver {
    fn on_change(&mut self, change: &CellChange);
}

/// Discards every notification.
pub struct NoOpObserver;

impl ChangeObserver for NoOpObserver {
    fn on_change(&mut self, _change: &CellChange) {}
}

impl ChangeObserver for Vec<CellChange> {
    fn on_change(&mut self, change: &CellChange) {
        self.push(*change);
    }
}

impl<O: ChangeObserver + ?Sized> ChangeObserver for &mut O {
    fn on_change(&mut self, change: &CellChange) {
        (**self).on_change(change);
    }
}

/// Cell counts per state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Census {
    pub susceptible: usize,
    pub infected: usize,
    pub immune: usize,
    pub dead: usize,
}

impl Census {
    pub fn tally<'a>(states: impl IntoIterator<Item = &'a CellState>) -> Self {
        let mut c = Self::default();
        for s in states {
            match s {
                CellState::Susceptible => c.susceptible += 1,
                CellState::Infected { .. } => c.infected += 1,
                CellState::Immune => c.immune += 1,
                CellState::Dead => c.dead += 1,
            }
        }
        c
    }

    pub fn total(&self) -> usize {
        self.susceptible + self.infected + self.immune + self.dead
    }
}
