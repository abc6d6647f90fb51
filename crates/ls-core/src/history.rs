//! Fixed-depth sample memory, most recent first.

use std::collections::VecDeque;

use crate::Real;

/// The last `capacity` samples of a signal.
///
/// `get(0)` is the newest sample. Reads past what has been recorded yield
/// `0.0`, so difference equations start from zero initial conditions. The
/// capacity is fixed at construction.
#[derive(Clone, Debug, PartialEq)]
pub struct SampleHistory {
    samples: VecDeque<Real>,
    capacity: usize,
}

impl SampleHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Newest sample at index 0; zero beyond the recorded depth.
    pub fn get(&self, lag: usize) -> Real {
        self.samples.get(lag).copied().unwrap_or(0.0)
    }

    /// Push a new sample, dropping the oldest once full.
    pub fn push(&mut self, value: Real) {
        if self.capacity == 0 {
            return;
        }
        if self.samples.len() == self.capacity {
            self.samples.pop_back();
        }
        self.samples.push_front(value);
    }

    /// Overwrite the contents with `newest_first`, truncated to capacity.
    pub fn set_from(&mut self, newest_first: &[Real]) {
        self.samples.clear();
        self.samples
            .extend(newest_first.iter().copied().take(self.capacity));
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    /// Samples newest first.
    pub fn iter(&self) -> impl Iterator<Item = Real> + '_ {
        self.samples.iter().copied()
    }
}
