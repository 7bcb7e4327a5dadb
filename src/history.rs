//! Bounded per-series sample history for display.

use std::collections::{BTreeMap, VecDeque};

use crate::error::{FilterError, Result};

/// The default number of values retained per series.
pub const DEFAULT_HISTORY_WINDOW: usize = 100;

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
struct Series {
    enabled: bool,
    values: VecDeque<f32>,
}

impl Series {
    fn new(enabled: bool) -> Self {
        Self {
            enabled,
            values: VecDeque::new(),
        }
    }
}

/// A set of independent, bounded, insertion-ordered series of values keyed
/// by `K`.
///
/// Each series holds at most [`HistoryBuffer::window_size`] values, pushing
/// past that evicts the oldest value. Series can be disabled, which drops
/// their values and ignores further pushes until they are enabled again.
/// Series are created on first use and start enabled.
///
/// # Example
///
/// ```
/// use linacc::history::HistoryBuffer;
///
/// let mut history = HistoryBuffer::new(2).unwrap();
/// history.push("x", 1.0);
/// history.push("x", 2.0);
/// history.push("x", 3.0);
/// assert_eq!(history.snapshot(&"x"), vec![2.0, 3.0]);
///
/// history.set_enabled("x", false);
/// assert!(!history.push("x", 4.0));
/// assert!(history.snapshot(&"x").is_empty());
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HistoryBuffer<K: Ord> {
    window_size: usize,
    series: BTreeMap<K, Series>,
}

impl<K: Ord + Copy> HistoryBuffer<K> {
    /// Creates an empty buffer retaining `window_size` values per series.
    ///
    /// # Errors
    ///
    /// Returns [`FilterError::InvalidWindowSize`] if `window_size` is zero.
    pub fn new(window_size: usize) -> Result<Self> {
        if window_size == 0 {
            return Err(FilterError::InvalidWindowSize);
        }

        Ok(Self {
            window_size,
            series: BTreeMap::new(),
        })
    }

    /// Appends `value` to the series `key`, evicting its oldest value if the
    /// window is full.
    ///
    /// Returns `false` without storing anything if the series is disabled.
    pub fn push(&mut self, key: K, value: f32) -> bool {
        let series = self.series.entry(key).or_insert_with(|| Series::new(true));
        if !series.enabled {
            return false;
        }

        series.values.push_back(value);
        while series.values.len() > self.window_size {
            series.values.pop_front();
        }
        true
    }

    /// Enables or disables the series `key`.
    ///
    /// Disabling a series clears its values immediately, so enabling it
    /// again always starts from an empty series.
    pub fn set_enabled(&mut self, key: K, enabled: bool) {
        let series = self.series.entry(key).or_insert_with(|| Series::new(enabled));
        if !enabled && !series.values.is_empty() {
            log::debug!("clearing {} values of a disabled series", series.values.len());
            series.values.clear();
        }
        series.enabled = enabled;
    }

    /// Changes the number of values retained per series.
    ///
    /// Series longer than the new window size are trimmed immediately, oldest
    /// values first.
    ///
    /// # Errors
    ///
    /// Returns [`FilterError::InvalidWindowSize`] if `window_size` is zero.
    /// The buffer is not modified.
    pub fn set_window_size(&mut self, window_size: usize) -> Result<()> {
        if window_size == 0 {
            return Err(FilterError::InvalidWindowSize);
        }

        self.window_size = window_size;
        for series in self.series.values_mut() {
            let excess = series.values.len().saturating_sub(window_size);
            series.values.drain(..excess);
        }
        Ok(())
    }

    /// Returns a copy of the values of series `key`, oldest first.
    ///
    /// Unknown series are empty.
    #[must_use]
    pub fn snapshot(&self, key: &K) -> Vec<f32> {
        self.series
            .get(key)
            .map(|series| series.values.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Returns the number of values in series `key`.
    #[must_use]
    pub fn len(&self, key: &K) -> usize {
        self.series.get(key).map_or(0, |series| series.values.len())
    }

    /// Returns `true` if series `key` exists and is enabled, or does not exist
    /// yet and would be created enabled.
    #[must_use]
    pub fn is_enabled(&self, key: &K) -> bool {
        self.series.get(key).map_or(true, |series| series.enabled)
    }

    /// Returns the number of values retained per series.
    #[must_use]
    pub fn window_size(&self) -> usize {
        self.window_size
    }

    /// Returns the keys of all known series, in order.
    #[must_use]
    pub fn keys(&self) -> impl Iterator<Item = K> + '_ {
        self.series.keys().copied()
    }

    /// Drops the values of every series, keeping their enabled state.
    pub fn clear(&mut self) {
        for series in self.series.values_mut() {
            series.values.clear();
        }
    }
}
