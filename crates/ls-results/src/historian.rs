//! In-memory recorder of named signal channels.
//!
//! Channels are created on first write and listed in that order. Within a
//! channel timestamps never go backwards (equal timestamps are kept), so a time
//! window is a contiguous slice found by binary search.

use std::collections::HashMap;

use ls_core::Condition;

use crate::types::{Sample, WarningRecord};
use crate::{ResultsError, ResultsResult};

#[derive(Debug, Clone, Default)]
pub struct Historian {
    channels: Vec<(String, Vec<Sample>)>,
    index: HashMap<String, usize>,
    warnings: Vec<WarningRecord>,
}

impl Historian {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `value` at `time_s` to `channel`.
    pub fn record(&mut self, channel: &str, time_s: f64, value: f64) -> ResultsResult<()> {
        if !time_s.is_finite() {
            return Err(ResultsError::NonFiniteTimestamp {
                channel: channel.to_string(),
                time_s,
            });
        }
        let slot = match self.index.get(channel) {
            Some(&i) => i,
            None => {
                self.channels.push((channel.to_string(), Vec::new()));
                self.index.insert(channel.to_string(), self.channels.len() - 1);
                self.channels.len() - 1
            }
        };
        let samples = &mut self.channels[slot].1;
        if let Some(last) = samples.last() {
            if time_s < last.time_s {
                return Err(ResultsError::NonMonotonicTimestamp {
                    channel: channel.to_string(),
                    time_s,
                    last_s: last.time_s,
                });
            }
        }
        samples.push(Sample { time_s, value });
        Ok(())
    }

    /// Samples of `channel` with `t0 <= time_s <= t1`, in time order.
    pub fn query(&self, channel: &str, t0: f64, t1: f64) -> ResultsResult<Window<'_>> {
        let samples = self.samples(channel)?;
        if !(t0 <= t1) {
            return Ok(Window { samples: &[] });
        }
        let start = samples.partition_point(|s| s.time_s < t0);
        let end = samples.partition_point(|s| s.time_s <= t1);
        Ok(Window {
            samples: &samples[start..end.max(start)],
        })
    }

    /// Every sample of `channel`.
    pub fn samples(&self, channel: &str) -> ResultsResult<&[Sample]> {
        self.index
            .get(channel)
            .map(|&i| self.channels[i].1.as_slice())
            .ok_or_else(|| ResultsError::UnknownChannel {
                channel: channel.to_string(),
            })
    }

    /// Channel names in first-recorded order.
    pub fn channels(&self) -> impl Iterator<Item = &str> {
        self.channels.iter().map(|(name, _)| name.as_str())
    }

    pub fn has_channel(&self, channel: &str) -> bool {
        self.index.contains_key(channel)
    }

    /// Number of samples in `channel`, 0 when it has never been written.
    pub fn len(&self, channel: &str) -> usize {
        self.samples(channel).map_or(0, <[Sample]>::len)
    }

    /// Total samples over all channels.
    pub fn total_samples(&self) -> usize {
        self.channels.iter().map(|(_, s)| s.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total_samples() == 0 && self.warnings.is_empty()
    }

    pub fn record_warning(&mut self, time_s: f64, source: &str, condition: Condition) {
        self.warnings.push(WarningRecord {
            time_s,
            source: source.to_string(),
            condition,
        });
    }

    /// Warnings in the order they were raised.
    pub fn warnings(&self) -> &[WarningRecord] {
        &self.warnings
    }

    pub fn clear(&mut self) {
        self.channels.clear();
        self.index.clear();
        self.warnings.clear();
    }
}

/// A borrowed time window over one channel. Iterating does not consume it, so
/// the same window can be walked any number of times.
#[derive(Debug, Clone, Copy)]
pub struct Window<'a> {
    samples: &'a [Sample],
}

impl<'a> Window<'a> {
    pub fn iter(&self) -> std::iter::Copied<std::slice::Iter<'a, Sample>> {
        self.samples.iter().copied()
    }

    pub fn values(&self) -> impl Iterator<Item = f64> + 'a {
        self.samples.iter().map(|s| s.value)
    }

    pub fn times(&self) -> impl Iterator<Item = f64> + 'a {
        self.samples.iter().map(|s| s.time_s)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn as_slice(&self) -> &'a [Sample] {
        self.samples
    }
}

impl<'a> IntoIterator for Window<'a> {
    type Item = Sample;
    type IntoIter = std::iter::Copied<std::slice::Iter<'a, Sample>>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp() -> Historian {
        let mut h = Historian::new();
        for k in 0..10 {
            h.record("plant", k as f64 * 0.1, k as f64).unwrap();
        }
        h
    }

    #[test]
    fn earlier_timestamp_rejected() {
        let mut h = ramp();
        let err = h.record("plant", 0.5, 0.0).unwrap_err();
        assert!(matches!(err, ResultsError::NonMonotonicTimestamp { .. }));
        assert_eq!(h.len("plant"), 10);
        // other channels are independent
        h.record("error", 0.0, 1.0).unwrap();
    }

    #[test]
    fn equal_timestamps_allowed() {
        let mut h = Historian::new();
        h.record("u", 1.0, 1.0).unwrap();
        h.record("u", 1.0, 2.0).unwrap();
        assert_eq!(h.query("u", 1.0, 1.0).unwrap().len(), 2);
    }

    #[test]
    fn non_finite_timestamp_rejected() {
        let mut h = Historian::new();
        assert!(matches!(
            h.record("u", f64::NAN, 0.0),
            Err(ResultsError::NonFiniteTimestamp { .. })
        ));
        assert!(!h.has_channel("u"));
    }

    #[test]
    fn query_is_inclusive_and_restartable() {
        let h = ramp();
        let window = h.query("plant", 0.2, 0.5).unwrap();
        let first: Vec<f64> = window.values().collect();
        let second: Vec<f64> = window.into_iter().map(|s| s.value).collect();
        assert_eq!(first, vec![2.0, 3.0, 4.0, 5.0]);
        assert_eq!(first, second);
    }

    #[test]
    fn query_edges() {
        let h = ramp();
        assert!(h.query("plant", 0.5, 0.2).unwrap().is_empty());
        assert!(h.query("plant", 5.0, 6.0).unwrap().is_empty());
        assert_eq!(h.query("plant", f64::NEG_INFINITY, f64::INFINITY).unwrap().len(), 10);
        assert!(matches!(
            h.query("missing", 0.0, 1.0),
            Err(ResultsError::UnknownChannel { .. })
        ));
    }

    #[test]
    fn channels_listed_in_first_write_order() {
        let mut h = Historian::new();
        for name in ["generator", "regulator", "plant", "error"] {
            h.record(name, 0.0, 0.0).unwrap();
        }
        h.record("generator", 0.1, 0.0).unwrap();
        let names: Vec<&str> = h.channels().collect();
        assert_eq!(names, ["generator", "regulator", "plant", "error"]);
        assert_eq!(h.total_samples(), 5);
    }

    #[test]
    fn warnings_are_kept_in_order() {
        let mut h = Historian::new();
        h.record_warning(
            0.1,
            "gpc",
            Condition::IdentificationStalled {
                reason: "no excitation".to_string(),
            },
        );
        h.record_warning(
            0.2,
            "gpc",
            Condition::ControlComputationDegenerate {
                reason: "singular".to_string(),
            },
        );
        assert_eq!(h.warnings().len(), 2);
        assert_eq!(h.warnings()[1].condition.kind(), "ControlComputationDegenerate");
        h.clear();
        assert!(h.is_empty());
    }
}
