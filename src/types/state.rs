//! Operating states and the per-sample state mask

use serde::{Deserialize, Serialize};

/// Operating state of the machine at one sample.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum MachineState {
    Off,
    Standby,
    Production,
}

impl MachineState {
    pub const ALL: [MachineState; 3] = [
        MachineState::Off,
        MachineState::Standby,
        MachineState::Production,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MachineState::Off => "off",
            MachineState::Standby => "standby",
            MachineState::Production => "production",
        }
    }

    /// Powered on: standby or production.
    pub fn is_on(&self) -> bool {
        !matches!(self, MachineState::Off)
    }
}

impl std::fmt::Display for MachineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The three mutually exclusive flags for one row of the mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateFlags {
    pub is_off: bool,
    pub is_standby: bool,
    pub is_production: bool,
}

impl From<MachineState> for StateFlags {
    fn from(state: MachineState) -> Self {
        Self {
            is_off: state == MachineState::Off,
            is_standby: state == MachineState::Standby,
            is_production: state == MachineState::Production,
        }
    }
}

/// Sample count per state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateDistribution {
    pub off: usize,
    pub standby: usize,
    pub production: usize,
}

impl StateDistribution {
    pub fn total(&self) -> usize {
        self.off + self.standby + self.production
    }

    pub fn count(&self, state: MachineState) -> usize {
        match state {
            MachineState::Off => self.off,
            MachineState::Standby => self.standby,
            MachineState::Production => self.production,
        }
    }

    /// Share of samples in `state`, 0.0 for an empty mask.
    pub fn fraction(&self, state: MachineState) -> f64 {
        let total = self.total();
        if total == 0 {
            0.0
        } else {
            self.count(state) as f64 / total as f64
        }
    }
}

/// Per-sample state labels aligned 1:1 with a [`Series`](super::Series).
///
/// Storing one enum value per row makes "exactly one flag per row" hold
/// by construction; the boolean views are derived on demand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateMask {
    states: Vec<MachineState>,
}

impl StateMask {
    pub fn new(states: Vec<MachineState>) -> Self {
        Self { states }
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn states(&self) -> &[MachineState] {
        &self.states
    }

    pub fn state(&self, index: usize) -> Option<MachineState> {
        self.states.get(index).copied()
    }

    pub fn flags(&self, index: usize) -> Option<StateFlags> {
        self.state(index).map(StateFlags::from)
    }

    pub fn is_off(&self, index: usize) -> bool {
        self.state(index) == Some(MachineState::Off)
    }

    pub fn is_standby(&self, index: usize) -> bool {
        self.state(index) == Some(MachineState::Standby)
    }

    pub fn is_production(&self, index: usize) -> bool {
        self.state(index) == Some(MachineState::Production)
    }

    pub fn is_on(&self, index: usize) -> bool {
        self.state(index).is_some_and(|s| s.is_on())
    }

    /// Boolean `is_production` column.
    pub fn production_flags(&self) -> Vec<bool> {
        self.states
            .iter()
            .map(|s| *s == MachineState::Production)
            .collect()
    }

    /// Maximal runs of `state` as inclusive `(start, end)` index pairs.
    pub fn runs(&self, state: MachineState) -> Vec<(usize, usize)> {
        let mut runs = Vec::new();
        let mut run_start: Option<usize> = None;
        for (i, s) in self.states.iter().enumerate() {
            match (run_start, *s == state) {
                (None, true) => run_start = Some(i),
                (Some(start), false) => {
                    runs.push((start, i - 1));
                    run_start = None;
                }
                _ => {}
            }
        }
        if let Some(start) = run_start {
            runs.push((start, self.states.len() - 1));
        }
        runs
    }

    pub fn distribution(&self) -> StateDistribution {
        let mut dist = StateDistribution::default();
        for s in &self.states {
            match s {
                MachineState::Off => dist.off += 1,
                MachineState::Standby => dist.standby += 1,
                MachineState::Production => dist.production += 1,
            }
        }
        dist
    }
}
