//! Minimum-run hysteresis on raw state labels
//!
//! A label change is accepted only once the new state persists for at least
//! `min_run` consecutive samples. Shorter runs are relabeled to the state in
//! effect before them; runs ahead of the first stable run adopt that run's
//! state.

use crate::types::MachineState;

#[derive(Debug, Clone, Copy)]
struct Run {
    state: MachineState,
    start: usize,
    len: usize,
}

fn runs_of(labels: &[MachineState]) -> Vec<Run> {
    let mut runs: Vec<Run> = Vec::new();
    for (i, state) in labels.iter().enumerate() {
        match runs.last_mut() {
            Some(run) if run.state == *state => run.len += 1,
            _ => runs.push(Run {
                state: *state,
                start: i,
                len: 1,
            }),
        }
    }
    runs
}

/// Returns the stabilised labels and the number of samples relabeled.
///
/// If no run reaches `min_run` there is nothing to anchor on and the labels
/// are returned unchanged.
pub fn apply_hysteresis(labels: &[MachineState], min_run: usize) -> (Vec<MachineState>, usize) {
    let mut out = labels.to_vec();
    if min_run <= 1 || labels.is_empty() {
        return (out, 0);
    }

    let runs = runs_of(labels);
    let Some(anchor) = runs.iter().position(|r| r.len >= min_run) else {
        return (out, 0);
    };

    let mut relabeled = 0;
    let mut current = runs[anchor].state;
    for (k, run) in runs.iter().enumerate() {
        let keep = if k < anchor {
            false
        } else if run.state == current {
            true
        } else if run.len >= min_run {
            current = run.state;
            true
        } else {
            false
        };
        if !keep && run.state != current {
            out[run.start..run.start + run.len].fill(current);
            relabeled += run.len;
        }
    }
    (out, relabeled)
}
