//! Smoothing coefficients for single-pole low-pass filters.
//!
//! A single-pole filter is characterized by its time constant `tau`. For a
//! stream with a varying sample period the per-sample coefficient `alpha` is
//! recomputed from `tau` and the elapsed time `dt` of every sample. Two
//! equivalent parameterizations are common, see [`Formulation`].

use nalgebra::SVector;
use std::time::Duration;

/// Time constant of a low-pass filter, in seconds.
///
/// The value is always strictly positive: constructing a time constant from
/// a non-positive or NaN value substitutes [`TimeConstant::MIN`], so that the
/// filter keeps running on a misconfiguration.
///
/// # Example
///
/// ```
/// use linacc::coefficient::TimeConstant;
///
/// assert_eq!(TimeConstant::new(0.5).as_secs_f32(), 0.5);
/// assert_eq!(TimeConstant::new(-1.0), TimeConstant::MIN);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(from = "f32", into = "f32")
)]
pub struct TimeConstant(f32);

impl TimeConstant {
    /// The time constant substituted for non-positive values.
    pub const MIN: Self = Self(1e-6);

    /// Creates a time constant of `seconds`, substituting [`Self::MIN`] for
    /// non-positive values.
    #[must_use]
    pub fn new(seconds: f32) -> Self {
        // NaN fails the comparison and is clamped as well.
        if seconds > 0.0 {
            Self(seconds)
        } else {
            log::warn!(
                "time constant {seconds}s is not positive, using {}s",
                Self::MIN.0
            );
            Self::MIN
        }
    }

    /// Returns the time constant in seconds.
    #[must_use]
    pub fn as_secs_f32(self) -> f32 {
        self.0
    }
}

impl Default for TimeConstant {
    fn default() -> Self {
        Self(1.0)
    }
}

impl From<f32> for TimeConstant {
    fn from(seconds: f32) -> Self {
        Self::new(seconds)
    }
}

impl From<TimeConstant> for f32 {
    fn from(value: TimeConstant) -> Self {
        value.0
    }
}

impl From<Duration> for TimeConstant {
    fn from(value: Duration) -> Self {
        Self::new(value.as_secs_f32())
    }
}

/// The update strategy of a single-pole low-pass filter.
///
/// Both strategies track the same state and converge to the same steady
/// state, they differ in which term `alpha` weights:
///
/// * [`Formulation::InputWeighted`]: `alpha = dt / (tau + dt)` and
///   `y += alpha * (x - y)`, alpha is the weight of the new input.
/// * [`Formulation::HistoryWeighted`]: `alpha = tau / (tau + dt)` and
///   `y = alpha * y + (1 - alpha) * x`, alpha is the weight of the previous
///   output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Formulation {
    /// `alpha = dt / (tau + dt)`, `y += alpha * (x - y)`.
    InputWeighted,
    /// `alpha = tau / (tau + dt)`, `y = alpha * y + (1 - alpha) * x`.
    HistoryWeighted,
}

impl Formulation {
    /// Both formulations, in display order.
    pub const ALL: [Self; 2] = [Self::InputWeighted, Self::HistoryWeighted];

    /// Computes the smoothing coefficient for a sample that arrived `dt`
    /// after the previous one.
    ///
    /// The result lies in `[0, 1]`. `dt == 0` yields the boundary value
    /// (`0` or `1`) of the formulation; filters never apply it, since a
    /// sample without elapsed time is discarded.
    ///
    /// # Example
    ///
    /// ```
    /// use std::time::Duration;
    /// use linacc::coefficient::{Formulation, TimeConstant};
    ///
    /// let tau = TimeConstant::new(1.0);
    /// let dt = Duration::from_millis(100);
    ///
    /// let a = Formulation::InputWeighted.alpha(tau, dt);
    /// let b = Formulation::HistoryWeighted.alpha(tau, dt);
    /// assert!((a - 0.1 / 1.1).abs() < 1e-6);
    /// assert!((a + b - 1.0).abs() < 1e-6);
    /// ```
    #[must_use]
    pub fn alpha(self, tau: TimeConstant, dt: Duration) -> f32 {
        let tau = tau.as_secs_f32();
        let dt = dt.as_secs_f32();

        match self {
            Self::InputWeighted => dt / (tau + dt),
            Self::HistoryWeighted => tau / (tau + dt),
        }
    }

    /// Applies one step of the recurrence to `state` using the coefficient
    /// `alpha` and the new input `x`.
    #[inline]
    pub fn apply<const N: usize>(
        self,
        alpha: f32,
        state: &mut SVector<f32, N>,
        x: &SVector<f32, N>,
    ) {
        match self {
            Self::InputWeighted => *state += alpha * (x - *state),
            Self::HistoryWeighted => *state = alpha * *state + (1.0 - alpha) * x,
        }
    }
}
