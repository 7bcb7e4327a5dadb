//! Timestamped accelerometer samples and input conditioning.

use nalgebra::SVector;
use std::time::Duration;

/// Standard gravity in m/s^2.
pub const STANDARD_GRAVITY: f32 = 9.806_65;

/// A sensor reading with the monotonic time it was taken at.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Sample<const N: usize> {
    /// The measured values.
    pub values: SVector<f32, N>,
    /// Time since an arbitrary, fixed epoch.
    pub timestamp: Duration,
}

impl<const N: usize> Sample<N> {
    /// Creates a sample taken at `timestamp`.
    #[must_use]
    pub fn new(values: SVector<f32, N>, timestamp: Duration) -> Self {
        Self { values, timestamp }
    }

    /// Creates a sample from a nanosecond timestamp, as reported by most
    /// sensor APIs.
    #[must_use]
    pub fn from_nanos(values: SVector<f32, N>, timestamp_ns: u64) -> Self {
        Self::new(values, Duration::from_nanos(timestamp_ns))
    }
}

/// An axis of a 3-dimensional sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Axis {
    /// The first component.
    X,
    /// The second component.
    Y,
    /// The third component.
    Z,
}

impl Axis {
    /// All axes, in component order.
    pub const ALL: [Self; 3] = [Self::X, Self::Y, Self::Z];

    /// Returns the component index of this axis.
    #[must_use]
    pub fn index(self) -> usize {
        match self {
            Self::X => 0,
            Self::Y => 1,
            Self::Z => 2,
        }
    }
}

/// Transformations applied to raw samples before filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Conditioning {
    /// Negate every axis, for devices mounted upside down.
    pub invert_axes: bool,
    /// Divide by [`STANDARD_GRAVITY`], so that values are in units of g.
    pub normalize_gravity: bool,
}

impl Default for Conditioning {
    fn default() -> Self {
        Self {
            invert_axes: false,
            normalize_gravity: true,
        }
    }
}

impl Conditioning {
    /// Applies the configured transformations to `values`.
    ///
    /// # Example
    ///
    /// ```
    /// use nalgebra::Vector3;
    /// use linacc::sample::{Conditioning, STANDARD_GRAVITY};
    ///
    /// let conditioning = Conditioning {
    ///     invert_axes: true,
    ///     normalize_gravity: true,
    /// };
    /// let values = conditioning.apply(Vector3::new(0.0, 0.0, STANDARD_GRAVITY));
    /// assert_eq!(values, Vector3::new(0.0, 0.0, -1.0));
    /// ```
    #[must_use]
    pub fn apply<const N: usize>(&self, mut values: SVector<f32, N>) -> SVector<f32, N> {
        if self.normalize_gravity {
            values /= STANDARD_GRAVITY;
        }
        if self.invert_axes {
            values = -values;
        }
        values
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Vector3;

    #[test]
    fn axis_indices() {
        let indices: Vec<usize> = Axis::ALL.into_iter().map(Axis::index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
    }

    #[test]
    fn sample_from_nanos() {
        let sample = Sample::from_nanos(Vector3::new(1.0, 2.0, 3.0), 1_500_000_000);
        assert_eq!(sample.timestamp, Duration::from_millis(1_500));
    }

    #[test]
    fn default_conditioning_normalizes() {
        let values = Conditioning::default().apply(Vector3::new(STANDARD_GRAVITY, -4.903_325, 0.0));
        assert_relative_eq!(values, Vector3::new(1.0, -0.5, 0.0), epsilon = 1e-6);
    }

    #[test]
    fn conditioning_can_be_disabled() {
        let conditioning = Conditioning {
            invert_axes: false,
            normalize_gravity: false,
        };
        let values = Vector3::new(1.0, 2.0, 3.0);
        assert_eq!(conditioning.apply(values), values);
    }

    #[test]
    fn inversion_without_normalization() {
        let conditioning = Conditioning {
            invert_axes: true,
            normalize_gravity: false,
        };
        assert_eq!(
            conditioning.apply(Vector3::new(1.0, -2.0, 3.0)),
            Vector3::new(-1.0, 2.0, -3.0)
        );
    }
}
