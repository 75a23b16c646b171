//! Cooperative progress reporting.
//!
//! Engine calls report after every unit of work: one (output, input) pair for
//! dense convolution, one channel for depthwise convolution, one neuron for
//! fully-connected layers. Unit `i` of `n` reports `i / (n - 1)`, so the first
//! report is `0.0` and the last is exactly `1.0`. A single-unit call reports
//! `1.0` once.

pub(crate) struct Progress<'x, 'h> {
    hook: Option<&'x mut (dyn FnMut(f32) + 'h)>,
    units: usize,
    done: usize,
}

impl<'x, 'h> Progress<'x, 'h> {
    pub(crate) fn new(hook: Option<&'x mut (dyn FnMut(f32) + 'h)>, units: usize) -> Self {
        Self {
            hook,
            units,
            done: 0,
        }
    }

    /// Report the unit that just completed.
    pub(crate) fn tick(&mut self) {
        let value = progress_value(self.done, self.units);
        self.done += 1;
        if let Some(hook) = self.hook.as_deref_mut() {
            hook(value);
        }
    }
}

/// Value reported for unit `index` of `units`.
pub fn progress_value(index: usize, units: usize) -> f32 {
    if units <= 1 {
        return 1.0;
    }
    (index as f32 / (units - 1) as f32).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    extern crate std;

    use std::vec::Vec;

    use super::*;

    #[test]
    fn test_single_unit_reports_one() {
        assert_eq!(progress_value(0, 1), 1.0);
        assert_eq!(progress_value(0, 0), 1.0);
    }

    #[test]
    fn test_reports_are_monotone_and_end_at_one() {
        let mut seen = Vec::new();
        let mut hook = |p: f32| seen.push(p);
        let mut progress = Progress::new(Some(&mut hook), 5);
        for _ in 0..5 {
            progress.tick();
        }
        drop(progress);
        assert_eq!(seen, [0.0, 0.25, 0.5, 0.75, 1.0]);
    }
}
