//! A moving-average filter with a fixed window per axis.

use nalgebra::SVector;
use std::collections::VecDeque;

use crate::error::{FilterError, Result};

/// The default number of samples averaged per axis.
pub const DEFAULT_MEAN_WINDOW: usize = 10;

/// An unweighted moving-average (FIR) filter over each component of a
/// signal.
///
/// Every component has its own queue of at most `window` samples. The queues
/// are created on the first call, which fixes the dimensionality of the
/// filter.
///
/// # Example
///
/// ```
/// use linacc::mean_filter::MeanFilter;
///
/// let mut filter = MeanFilter::new(3).unwrap();
///
/// assert_eq!(filter.add_samples(&[1.0]).unwrap(), vec![1.0]);
/// assert_eq!(filter.add_samples(&[2.0]).unwrap(), vec![1.5]);
/// assert_eq!(filter.add_samples(&[3.0]).unwrap(), vec![2.0]);
/// // the first sample has left the window
/// assert_eq!(filter.add_samples(&[4.0]).unwrap(), vec![3.0]);
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MeanFilter {
    window: usize,
    /// One queue per component, `None` until the first sample.
    queues: Option<Vec<VecDeque<f32>>>,
}

impl MeanFilter {
    /// Creates a filter averaging over the last `window` samples.
    ///
    /// # Errors
    ///
    /// Returns [`FilterError::InvalidWindowSize`] if `window` is zero.
    pub fn new(window: usize) -> Result<Self> {
        if window == 0 {
            return Err(FilterError::InvalidWindowSize);
        }

        Ok(Self {
            window,
            queues: None,
        })
    }

    /// Adds one sample and returns the mean of every component's window.
    ///
    /// The mean is taken over the samples currently in the window, which is
    /// fewer than the window size until the window has filled up.
    ///
    /// # Errors
    ///
    /// Returns [`FilterError::DimensionMismatch`] if `sample` does not have
    /// the dimensionality of the first sample. The filter is not modified.
    pub fn add_samples(&mut self, sample: &[f32]) -> Result<Vec<f32>> {
        let window = self.window;
        let queues = self.queues.get_or_insert_with(|| {
            log::debug!("initializing mean filter with {} components", sample.len());
            vec![VecDeque::with_capacity(window + 1); sample.len()]
        });

        if queues.len() != sample.len() {
            return Err(FilterError::DimensionMismatch {
                expected: queues.len(),
                actual: sample.len(),
            });
        }

        Ok(queues
            .iter_mut()
            .zip(sample)
            .map(|(queue, &value)| {
                queue.push_back(value);
                if queue.len() > window {
                    queue.pop_front();
                }
                mean(queue)
            })
            .collect())
    }

    /// Adds one fixed-size sample and returns the per-component mean.
    ///
    /// # Errors
    ///
    /// Returns [`FilterError::DimensionMismatch`] if the filter was
    /// initialized with a different dimensionality.
    pub fn filter<const N: usize>(&mut self, sample: SVector<f32, N>) -> Result<SVector<f32, N>> {
        let means = self.add_samples(sample.as_slice())?;
        Ok(SVector::from_column_slice(&means))
    }

    /// Forgets all samples and the dimensionality of the filter.
    pub fn reset(&mut self) {
        self.queues = None;
    }

    /// Returns the window size of this filter.
    #[must_use]
    pub fn window(&self) -> usize {
        self.window
    }

    /// Returns the dimensionality fixed by the first sample, if any.
    #[must_use]
    pub fn dimension(&self) -> Option<usize> {
        self.queues.as_ref().map(Vec::len)
    }

    /// Returns the number of samples currently averaged per component.
    #[must_use]
    pub fn len(&self) -> usize {
        self.queues
            .as_ref()
            .and_then(|queues| queues.first())
            .map_or(0, VecDeque::len)
    }

    /// Returns `true` if no sample is currently in the window.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn mean(queue: &VecDeque<f32>) -> f32 {
    let sum: f64 = queue.iter().copied().map(f64::from).sum();
    (sum / queue.len() as f64) as f32
}
