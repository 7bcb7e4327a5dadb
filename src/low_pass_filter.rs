//! A module implementing single-pole low-pass filters that separate gravity
//! from linear acceleration.
//!
//! This module provides [`LowPassFilter`], which tracks a low-frequency
//! estimate (the gravity estimate) of a multi-dimensional signal sampled at a
//! possibly irregular rate, and derives the high-frequency residual (the
//! linear acceleration) from it.

use nalgebra::SVector;
use std::time::Duration;

use crate::coefficient::{Formulation, TimeConstant};
use crate::error::{FilterError, Result};

/// The default sample period assumed for the first sample after a reset.
pub const DEFAULT_NOMINAL_PERIOD: Duration = Duration::from_millis(20);

/// The output of a [`LowPassFilter`] for a single sample.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Decomposition<const N: usize> {
    /// The low-frequency component of the signal.
    pub gravity: SVector<f32, N>,
    /// The input minus [`Self::gravity`].
    pub linear_acceleration: SVector<f32, N>,
}

impl<const N: usize> Decomposition<N> {
    fn zeros() -> Self {
        Self {
            gravity: SVector::zeros(),
            linear_acceleration: SVector::zeros(),
        }
    }
}

/// A single-pole IIR low-pass filter for N-dimensional signals with a
/// variable sample period.
///
/// For every sample the smoothing coefficient is derived from the time
/// constant and the time elapsed since the previous sample, using the
/// filter's [`Formulation`]. The gravity estimate is then updated and the
/// linear acceleration is computed as `input - gravity`.
///
/// # Note
///
/// The first sample after construction or [`LowPassFilter::reset`] has no
/// previous timestamp. It is filtered as if it arrived one
/// [`LowPassFilter::nominal_period`] after the previous sample, starting
/// from a zero gravity estimate.
///
/// # Example
///
/// ```rust
/// use nalgebra::Vector3;
/// use std::time::Duration;
/// use linacc::coefficient::{Formulation, TimeConstant};
/// use linacc::low_pass_filter::LowPassFilter;
///
/// let mut filter = LowPassFilter::<3>::new(Formulation::InputWeighted, TimeConstant::new(1.0));
///
/// let signal = Vector3::new(0.0, 0.0, 1.0);
/// let mut output = filter.add_sample(signal, Duration::ZERO).unwrap();
/// for step in 1..200 {
///     output = filter
///         .add_sample(signal, Duration::from_millis(100 * step))
///         .unwrap();
/// }
///
/// // the gravity estimate has settled on the constant input
/// assert!((output.gravity.z - 1.0).abs() < 1e-3);
/// assert!(output.linear_acceleration.z.abs() < 1e-3);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LowPassFilter<const N: usize> {
    /// The update strategy of this filter.
    formulation: Formulation,
    /// Time constant of the filter.
    time_constant: TimeConstant,
    /// The elapsed time assumed for the first sample.
    nominal_period: Duration,
    /// The current gravity estimate.
    gravity: SVector<f32, N>,
    /// Timestamp of the last accepted sample, `None` while uninitialized.
    last_timestamp: Option<Duration>,
    /// The coefficient used for the last accepted sample.
    last_alpha: Option<f32>,

    /// The last output of the filter.
    pub last_output: Decomposition<N>,
}

impl<const N: usize> LowPassFilter<N> {
    /// Creates a new, uninitialized [`LowPassFilter`] using
    /// [`DEFAULT_NOMINAL_PERIOD`] for the first sample.
    ///
    /// # Arguments
    ///
    /// * `formulation` - The coefficient and update equation to use.
    /// * `time_constant` - Time constant of the filter, larger values respond
    ///   slower.
    #[must_use]
    pub fn new(formulation: Formulation, time_constant: TimeConstant) -> Self {
        Self {
            formulation,
            time_constant,
            nominal_period: DEFAULT_NOMINAL_PERIOD,
            gravity: SVector::zeros(),
            last_timestamp: None,
            last_alpha: None,
            last_output: Decomposition::zeros(),
        }
    }

    /// Sets the elapsed time assumed for the first sample, builder style.
    #[must_use]
    pub fn with_nominal_period(mut self, nominal_period: Duration) -> Self {
        self.set_nominal_period(nominal_period);
        self
    }

    /// Filters the sample `x` taken at `timestamp`, returning the updated
    /// gravity estimate and the linear acceleration.
    ///
    /// A sample with the same timestamp as the previous one is discarded:
    /// the filter state is left untouched and the previous output is
    /// returned unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`FilterError::TimestampRegression`] if `timestamp` is earlier
    /// than the previous accepted timestamp. The filter state is not
    /// modified.
    pub fn add_sample(
        &mut self,
        x: SVector<f32, N>,
        timestamp: Duration,
    ) -> Result<Decomposition<N>> {
        let dt = match self.last_timestamp {
            None => self.nominal_period,
            Some(previous) => match timestamp.checked_sub(previous) {
                Some(dt) if dt.is_zero() => {
                    log::trace!("discarding sample with duplicate timestamp {timestamp:?}");
                    return Ok(self.last_output);
                }
                Some(dt) => dt,
                None => {
                    log::warn!("sample timestamp went backwards: {previous:?} -> {timestamp:?}");
                    return Err(FilterError::TimestampRegression {
                        previous,
                        current: timestamp,
                    });
                }
            },
        };

        let alpha = self.formulation.alpha(self.time_constant, dt);
        self.formulation.apply(alpha, &mut self.gravity, &x);

        self.last_timestamp = Some(timestamp);
        self.last_alpha = Some(alpha);
        self.last_output = Decomposition {
            gravity: self.gravity,
            linear_acceleration: x - self.gravity,
        };
        Ok(self.last_output)
    }

    /// Returns the filter to its uninitialized state.
    ///
    /// This should be called whenever the stream is paused and resumed or the
    /// sampling rate changes, otherwise the gap between samples would be
    /// taken as the sample period of the next sample.
    pub fn reset(&mut self) {
        log::debug!("resetting {:?} low-pass filter", self.formulation);
        self.gravity = SVector::zeros();
        self.last_timestamp = None;
        self.last_alpha = None;
        self.last_output = Decomposition::zeros();
    }

    /// Updates the time constant, keeping the current gravity estimate.
    pub fn set_time_constant(&mut self, time_constant: TimeConstant) {
        self.time_constant = time_constant;
    }

    /// Sets the elapsed time assumed for the first sample after a reset.
    ///
    /// A zero period is replaced by [`DEFAULT_NOMINAL_PERIOD`].
    pub fn set_nominal_period(&mut self, nominal_period: Duration) {
        self.nominal_period = if nominal_period.is_zero() {
            DEFAULT_NOMINAL_PERIOD
        } else {
            nominal_period
        };
    }

    /// Returns the update strategy of this filter.
    #[must_use]
    pub fn formulation(&self) -> Formulation {
        self.formulation
    }

    /// Returns the current time constant.
    #[must_use]
    pub fn time_constant(&self) -> TimeConstant {
        self.time_constant
    }

    /// Returns the elapsed time assumed for the first sample.
    #[must_use]
    pub fn nominal_period(&self) -> Duration {
        self.nominal_period
    }

    /// Returns the current gravity estimate.
    #[must_use]
    pub fn gravity(&self) -> SVector<f32, N> {
        self.gravity
    }

    /// Returns the coefficient applied to the last accepted sample, or `None`
    /// if no sample has been accepted since the last reset.
    #[must_use]
    pub fn last_alpha(&self) -> Option<f32> {
        self.last_alpha
    }

    /// Returns `true` once a sample has been accepted since the last reset.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.last_timestamp.is_some()
    }
}
