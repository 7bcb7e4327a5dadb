//! Separation of accelerometer samples into gravity and linear acceleration
//! using single-pole low-pass filters.
//!
//! The building blocks are:
//!
//! * [`low_pass_filter::LowPassFilter`], a variable-timestep IIR filter
//!   tracking the gravity estimate, in two [`coefficient::Formulation`]s.
//! * [`mean_filter::MeanFilter`], a moving-average smoother.
//! * [`history::HistoryBuffer`], bounded per-series history for display.
//!
//! [`Pipeline`] runs both low-pass formulations and the mean filter side by
//! side on one sample stream and records their output in a history buffer.

pub mod coefficient;
pub mod error;
pub mod history;
pub mod low_pass_filter;
pub mod mean_filter;
pub mod sample;

use coefficient::{Formulation, TimeConstant};
use history::{HistoryBuffer, DEFAULT_HISTORY_WINDOW};
use low_pass_filter::{Decomposition, LowPassFilter};
use mean_filter::{MeanFilter, DEFAULT_MEAN_WINDOW};
use nalgebra::Vector3;
use sample::{Axis, Conditioning, Sample};
use std::time::Duration;

pub use error::{FilterError, Result};

/// Sensor delivery rate presets.
///
/// Changing the rate invalidates the sample period observed so far, so the
/// [`Pipeline`] resets its low-pass filters when it changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SensorRate {
    /// Roughly 5 Hz.
    Slow,
    /// Roughly 50 Hz.
    Medium,
    /// As fast as the sensor delivers, assumed to be roughly 200 Hz.
    #[default]
    Fast,
}

impl SensorRate {
    /// Returns the expected period between two samples at this rate.
    ///
    /// This is used as the sample period of the first sample after a reset.
    #[must_use]
    pub fn nominal_period(self) -> Duration {
        match self {
            Self::Slow => Duration::from_millis(200),
            Self::Medium => Duration::from_millis(20),
            Self::Fast => Duration::from_millis(5),
        }
    }
}

/// Parameters for the [`Pipeline`].
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Parameters {
    /// Time constant shared by both low-pass filters.
    ///
    /// Values between 0.1 s and 3 s are typical for separating gravity from
    /// hand-held motion.
    pub time_constant: TimeConstant,
    /// The rate samples are expected to arrive at.
    pub sensor_rate: SensorRate,
    /// Number of samples averaged by the mean filter.
    pub mean_window: usize,
    /// Number of values kept per history series.
    pub history_window: usize,
    /// Transformations applied to raw samples before filtering.
    pub conditioning: Conditioning,
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            time_constant: TimeConstant::default(),
            sensor_rate: SensorRate::default(),
            mean_window: DEFAULT_MEAN_WINDOW,
            history_window: DEFAULT_HISTORY_WINDOW,
            conditioning: Conditioning::default(),
        }
    }
}

/// A signal produced by the [`Pipeline`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Channel {
    /// The conditioned input.
    Raw,
    /// The output of the mean filter.
    Smoothed,
    /// The gravity estimate of a low-pass filter.
    Gravity(Formulation),
    /// The linear acceleration of a low-pass filter.
    LinearAcceleration(Formulation),
}

impl Channel {
    /// All channels, in display order.
    pub const ALL: [Self; 6] = [
        Self::Raw,
        Self::Smoothed,
        Self::Gravity(Formulation::InputWeighted),
        Self::LinearAcceleration(Formulation::InputWeighted),
        Self::Gravity(Formulation::HistoryWeighted),
        Self::LinearAcceleration(Formulation::HistoryWeighted),
    ];
}

/// Identifies one series of the [`Pipeline`]'s history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SeriesKey {
    /// The signal of this series.
    pub channel: Channel,
    /// The axis of this series.
    pub axis: Axis,
}

impl SeriesKey {
    /// Creates a key for `channel` on `axis`.
    #[must_use]
    pub fn new(channel: Channel, axis: Axis) -> Self {
        Self { channel, axis }
    }

    /// Returns every series the pipeline records.
    #[must_use]
    pub fn all() -> impl Iterator<Item = Self> {
        Channel::ALL
            .into_iter()
            .flat_map(|channel| Axis::ALL.into_iter().map(move |axis| Self::new(channel, axis)))
    }
}

/// Which groups of series are recorded in the [`Pipeline`]'s history.
///
/// A series is recorded only if its axis and every group it belongs to are
/// shown, e.g. the x-axis gravity estimate of the input weighted filter
/// requires [`Self::axes`] `[0]`, [`Self::gravity`] and
/// [`Self::input_weighted`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DisplayOptions {
    /// Show the x, y and z axis.
    pub axes: [bool; 3],
    /// Show the conditioned input.
    pub raw: bool,
    /// Show the mean filter output.
    pub smoothed: bool,
    /// Show gravity estimates.
    pub gravity: bool,
    /// Show linear accelerations.
    pub linear_acceleration: bool,
    /// Show the output of the [`Formulation::InputWeighted`] filter.
    pub input_weighted: bool,
    /// Show the output of the [`Formulation::HistoryWeighted`] filter.
    pub history_weighted: bool,
}

impl Default for DisplayOptions {
    fn default() -> Self {
        Self {
            axes: [true; 3],
            raw: true,
            smoothed: true,
            gravity: true,
            linear_acceleration: true,
            input_weighted: true,
            history_weighted: true,
        }
    }
}

impl DisplayOptions {
    /// Returns `true` if the series `key` is shown.
    #[must_use]
    pub fn shows(&self, key: SeriesKey) -> bool {
        let formulation = |formulation: Formulation| match formulation {
            Formulation::InputWeighted => self.input_weighted,
            Formulation::HistoryWeighted => self.history_weighted,
        };

        self.axes[key.axis.index()]
            && match key.channel {
                Channel::Raw => self.raw,
                Channel::Smoothed => self.smoothed,
                Channel::Gravity(f) => self.gravity && formulation(f),
                Channel::LinearAcceleration(f) => self.linear_acceleration && formulation(f),
            }
    }
}

/// Everything the [`Pipeline`] computed for one sample.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Frame {
    /// Number of frames produced before this one.
    pub generation: u64,
    /// Timestamp of the sample.
    pub timestamp: Duration,
    /// The conditioned input.
    pub raw: Vector3<f32>,
    /// The mean filter output.
    pub smoothed: Vector3<f32>,
    /// The output of the [`Formulation::InputWeighted`] filter.
    pub input_weighted: Decomposition<3>,
    /// The output of the [`Formulation::HistoryWeighted`] filter.
    pub history_weighted: Decomposition<3>,
}

impl Frame {
    /// Returns the output of the low-pass filter using `formulation`.
    #[must_use]
    pub fn decomposition(&self, formulation: Formulation) -> &Decomposition<3> {
        match formulation {
            Formulation::InputWeighted => &self.input_weighted,
            Formulation::HistoryWeighted => &self.history_weighted,
        }
    }

    /// Returns the value of the series `key`.
    #[must_use]
    pub fn value(&self, key: SeriesKey) -> f32 {
        let vector = match key.channel {
            Channel::Raw => &self.raw,
            Channel::Smoothed => &self.smoothed,
            Channel::Gravity(f) => &self.decomposition(f).gravity,
            Channel::LinearAcceleration(f) => &self.decomposition(f).linear_acceleration,
        };
        vector[key.axis.index()]
    }
}

/// Runs both low-pass formulations and the mean filter on one stream of
/// 3-axis accelerometer samples.
///
/// # Example
///
/// ```
/// use nalgebra::Vector3;
/// use linacc::sample::{Axis, Sample, STANDARD_GRAVITY};
/// use linacc::{Channel, Parameters, Pipeline, SeriesKey};
///
/// let mut pipeline = Pipeline::new(Parameters::default()).unwrap();
///
/// let at_rest = Vector3::new(0.0, 0.0, STANDARD_GRAVITY);
/// for i in 0..3 {
///     pipeline.process(Sample::from_nanos(at_rest, i * 5_000_000)).unwrap();
/// }
///
/// let raw_z = pipeline.history().snapshot(&SeriesKey::new(Channel::Raw, Axis::Z));
/// assert_eq!(raw_z, vec![1.0, 1.0, 1.0]);
/// ```
#[derive(Debug, Clone)]
pub struct Pipeline {
    /// The parameters of the pipeline.
    parameters: Parameters,
    /// Low-pass filter using [`Formulation::InputWeighted`].
    input_weighted: LowPassFilter<3>,
    /// Low-pass filter using [`Formulation::HistoryWeighted`].
    history_weighted: LowPassFilter<3>,
    /// Moving average of the conditioned input.
    mean: MeanFilter,
    /// Recorded output, one series per channel and axis.
    history: HistoryBuffer<SeriesKey>,
    display: DisplayOptions,
    /// Timestamp of the last processed sample, used to drop duplicates.
    last_timestamp: Option<Duration>,
    generation: u64,
}

impl Pipeline {
    /// Creates a new pipeline with the given parameters.
    ///
    /// # Errors
    ///
    /// Returns [`FilterError::InvalidWindowSize`] if the mean or history
    /// window is zero.
    pub fn new(parameters: Parameters) -> Result<Self> {
        let filter = |formulation: Formulation| {
            LowPassFilter::new(formulation, parameters.time_constant)
                .with_nominal_period(parameters.sensor_rate.nominal_period())
        };

        Ok(Self {
            input_weighted: filter(Formulation::InputWeighted),
            history_weighted: filter(Formulation::HistoryWeighted),
            mean: MeanFilter::new(parameters.mean_window)?,
            history: HistoryBuffer::new(parameters.history_window)?,
            display: DisplayOptions::default(),
            last_timestamp: None,
            generation: 0,
            parameters,
        })
    }

    /// Processes one raw sample.
    ///
    /// Returns `None` if the sample has the same timestamp as the previous
    /// one, in which case nothing is filtered or recorded.
    ///
    /// # Errors
    ///
    /// Returns [`FilterError::TimestampRegression`] if the sample is older
    /// than the previous one. Nothing is filtered or recorded.
    pub fn process(&mut self, sample: Sample<3>) -> Result<Option<Frame>> {
        match self.last_timestamp {
            Some(previous) if sample.timestamp == previous => return Ok(None),
            Some(previous) if sample.timestamp < previous => {
                return Err(FilterError::TimestampRegression {
                    previous,
                    current: sample.timestamp,
                });
            }
            _ => {}
        }

        let raw = self.parameters.conditioning.apply(sample.values);
        let input_weighted = self.input_weighted.add_sample(raw, sample.timestamp)?;
        let history_weighted = self.history_weighted.add_sample(raw, sample.timestamp)?;
        let smoothed = self.mean.filter(raw)?;

        let frame = Frame {
            generation: self.generation,
            timestamp: sample.timestamp,
            raw,
            smoothed,
            input_weighted,
            history_weighted,
        };

        for key in SeriesKey::all() {
            self.history.push(key, frame.value(key));
        }

        self.last_timestamp = Some(sample.timestamp);
        self.generation += 1;
        Ok(Some(frame))
    }

    /// Resets the low-pass filters and the mean filter, e.g. when the stream
    /// is resumed after a pause.
    ///
    /// The recorded history is kept.
    pub fn reset(&mut self) {
        self.input_weighted.reset();
        self.history_weighted.reset();
        self.mean.reset();
        self.last_timestamp = None;
    }

    /// Sets the time constant of both low-pass filters without resetting
    /// them.
    pub fn set_time_constant(&mut self, time_constant: TimeConstant) {
        self.parameters.time_constant = time_constant;
        self.input_weighted.set_time_constant(time_constant);
        self.history_weighted.set_time_constant(time_constant);
    }

    /// Sets the expected sensor rate.
    ///
    /// The low-pass filters are reset, since the sample period observed so
    /// far no longer applies.
    pub fn set_sensor_rate(&mut self, sensor_rate: SensorRate) {
        log::info!("sensor rate changed to {sensor_rate:?}");
        self.parameters.sensor_rate = sensor_rate;

        for filter in [&mut self.input_weighted, &mut self.history_weighted] {
            filter.set_nominal_period(sensor_rate.nominal_period());
            filter.reset();
        }
        self.last_timestamp = None;
    }

    /// Sets the conditioning applied to subsequent samples.
    pub fn set_conditioning(&mut self, conditioning: Conditioning) {
        self.parameters.conditioning = conditioning;
    }

    /// Changes which series are recorded.
    ///
    /// Series that become hidden lose their recorded values.
    pub fn set_display(&mut self, display: DisplayOptions) {
        self.display = display;
        for key in SeriesKey::all() {
            self.history.set_enabled(key, display.shows(key));
        }
    }

    /// Changes the number of values kept per history series.
    ///
    /// # Errors
    ///
    /// Returns [`FilterError::InvalidWindowSize`] if `window_size` is zero.
    pub fn set_history_window(&mut self, window_size: usize) -> Result<()> {
        self.history.set_window_size(window_size)?;
        self.parameters.history_window = window_size;
        Ok(())
    }

    /// Returns the current parameters.
    #[must_use]
    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    /// Returns the current display options.
    #[must_use]
    pub fn display(&self) -> &DisplayOptions {
        &self.display
    }

    /// Returns the recorded history.
    #[must_use]
    pub fn history(&self) -> &HistoryBuffer<SeriesKey> {
        &self.history
    }

    /// Returns the low-pass filter using `formulation`.
    #[must_use]
    pub fn low_pass_filter(&self, formulation: Formulation) -> &LowPassFilter<3> {
        match formulation {
            Formulation::InputWeighted => &self.input_weighted,
            Formulation::HistoryWeighted => &self.history_weighted,
        }
    }

    /// Returns the mean filter.
    #[must_use]
    pub fn mean_filter(&self) -> &MeanFilter {
        &self.mean
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use crate::sample::STANDARD_GRAVITY;

    fn raw_parameters() -> Parameters {
        Parameters {
            conditioning: Conditioning {
                invert_axes: false,
                normalize_gravity: false,
            },
            ..Parameters::default()
        }
    }

    fn sample(x: f32, millis: u64) -> Sample<3> {
        Sample::new(Vector3::new(x, 0.0, 0.0), Duration::from_millis(millis))
    }

    #[test]
    fn default_parameters() {
        let parameters = Parameters::default();
        assert_relative_eq!(parameters.time_constant.as_secs_f32(), 1.0);
        assert_eq!(parameters.mean_window, 10);
        assert_eq!(parameters.history_window, 100);
        assert_eq!(parameters.sensor_rate, SensorRate::Fast);
    }

    #[test]
    fn zero_windows_are_rejected() {
        let mean = Parameters {
            mean_window: 0,
            ..Parameters::default()
        };
        assert!(matches!(Pipeline::new(mean), Err(FilterError::InvalidWindowSize)));

        let history = Parameters {
            history_window: 0,
            ..Parameters::default()
        };
        assert!(matches!(Pipeline::new(history), Err(FilterError::InvalidWindowSize)));
    }

    #[test]
    fn frame_matches_individual_filters() {
        let parameters = raw_parameters();
        let mut pipeline = Pipeline::new(parameters).unwrap();
        let mut lpf = LowPassFilter::new(Formulation::HistoryWeighted, parameters.time_constant)
            .with_nominal_period(parameters.sensor_rate.nominal_period());
        let mut mean = MeanFilter::new(parameters.mean_window).unwrap();

        for (i, x) in [0.5, 1.0, -0.25, 2.0].into_iter().enumerate() {
            let sample = sample(x, 20 * i as u64);
            let frame = pipeline.process(sample).unwrap().unwrap();

            assert_eq!(frame.generation, i as u64);
            assert_eq!(frame.raw, sample.values);
            assert_eq!(
                frame.history_weighted,
                lpf.add_sample(sample.values, sample.timestamp).unwrap()
            );
            assert_eq!(frame.smoothed, mean.filter(sample.values).unwrap());
        }
    }

    #[test]
    fn records_every_series() {
        let mut pipeline = Pipeline::new(raw_parameters()).unwrap();
        for i in 0..3 {
            pipeline.process(sample(1.0, i * 10)).unwrap();
        }

        for key in SeriesKey::all() {
            assert_eq!(pipeline.history().len(&key), 3, "{key:?}");
        }
        assert_eq!(
            pipeline
                .history()
                .snapshot(&SeriesKey::new(Channel::Raw, Axis::X)),
            vec![1.0; 3]
        );
    }

    #[test]
    fn duplicate_timestamp_is_dropped() {
        let mut pipeline = Pipeline::new(raw_parameters()).unwrap();
        pipeline.process(sample(1.0, 10)).unwrap();

        assert_eq!(pipeline.process(sample(5.0, 10)).unwrap(), None);

        let raw_x = SeriesKey::new(Channel::Raw, Axis::X);
        assert_eq!(pipeline.history().snapshot(&raw_x), vec![1.0]);
        assert_eq!(pipeline.mean_filter().len(), 1);

        let frame = pipeline.process(sample(3.0, 20)).unwrap().unwrap();
        assert_eq!(frame.generation, 1);
    }

    #[test]
    fn timestamp_regression_is_rejected() {
        let mut pipeline = Pipeline::new(raw_parameters()).unwrap();
        pipeline.process(sample(1.0, 100)).unwrap();

        assert_eq!(
            pipeline.process(sample(1.0, 50)),
            Err(FilterError::TimestampRegression {
                previous: Duration::from_millis(100),
                current: Duration::from_millis(50),
            })
        );
        assert_eq!(pipeline.history().len(&SeriesKey::new(Channel::Raw, Axis::X)), 1);
    }

    #[test]
    fn conditioning_is_applied() {
        let mut pipeline = Pipeline::new(Parameters::default()).unwrap();
        pipeline.set_conditioning(Conditioning {
            invert_axes: true,
            normalize_gravity: true,
        });

        let frame = pipeline
            .process(sample(2.0 * STANDARD_GRAVITY, 0))
            .unwrap()
            .unwrap();
        assert_relative_eq!(frame.raw, Vector3::new(-2.0, 0.0, 0.0), epsilon = 1e-6);
    }

    #[test]
    fn hiding_series_clears_them() {
        let mut pipeline = Pipeline::new(raw_parameters()).unwrap();
        for i in 0..4 {
            pipeline.process(sample(1.0, i * 10)).unwrap();
        }

        pipeline.set_display(DisplayOptions {
            gravity: false,
            axes: [true, false, true],
            ..DisplayOptions::default()
        });
        pipeline.process(sample(1.0, 40)).unwrap();

        for key in SeriesKey::all() {
            let expected = match (key.channel, key.axis) {
                (_, Axis::Y) | (Channel::Gravity(_), _) => 0,
                _ => 5,
            };
            assert_eq!(pipeline.history().len(&key), expected, "{key:?}");
        }

        // showing them again starts from an empty series
        pipeline.set_display(DisplayOptions::default());
        pipeline.process(sample(1.0, 50)).unwrap();
        let gravity_x = SeriesKey::new(Channel::Gravity(Formulation::InputWeighted), Axis::X);
        assert_eq!(pipeline.history().len(&gravity_x), 1);
    }

    #[test]
    fn formulation_toggles_apply_to_both_signals() {
        let display = DisplayOptions {
            history_weighted: false,
            ..DisplayOptions::default()
        };

        for formulation in Formulation::ALL {
            let shown = formulation == Formulation::InputWeighted;
            for channel in [
                Channel::Gravity(formulation),
                Channel::LinearAcceleration(formulation),
            ] {
                assert_eq!(display.shows(SeriesKey::new(channel, Axis::Z)), shown);
            }
        }
        assert!(display.shows(SeriesKey::new(Channel::Raw, Axis::Z)));
        assert!(display.shows(SeriesKey::new(Channel::Smoothed, Axis::Z)));
    }

    #[test]
    fn time_constant_change_keeps_state() {
        let mut pipeline = Pipeline::new(raw_parameters()).unwrap();
        for i in 0..5 {
            pipeline.process(sample(1.0, i * 10)).unwrap();
        }
        let gravity = pipeline
            .low_pass_filter(Formulation::InputWeighted)
            .gravity();

        pipeline.set_time_constant(TimeConstant::new(0.25));

        let filter = pipeline.low_pass_filter(Formulation::InputWeighted);
        assert_eq!(filter.gravity(), gravity);
        assert_relative_eq!(filter.time_constant().as_secs_f32(), 0.25);
        assert_relative_eq!(pipeline.parameters().time_constant.as_secs_f32(), 0.25);
    }

    #[test]
    fn sensor_rate_change_resets_filters() {
        let mut pipeline = Pipeline::new(raw_parameters()).unwrap();
        for i in 0..5 {
            pipeline.process(sample(1.0, 1_000 + i * 10)).unwrap();
        }

        pipeline.set_sensor_rate(SensorRate::Slow);

        for formulation in Formulation::ALL {
            let filter = pipeline.low_pass_filter(formulation);
            assert!(!filter.is_initialized());
            assert_eq!(filter.nominal_period(), Duration::from_millis(200));
        }

        // the stream may restart from an earlier clock after a reset
        assert!(pipeline.process(sample(1.0, 0)).unwrap().is_some());
        let alpha = pipeline
            .low_pass_filter(Formulation::InputWeighted)
            .last_alpha()
            .unwrap();
        assert_relative_eq!(alpha, 0.2 / 1.2, epsilon = 1e-6);
    }

    #[test]
    fn reset_keeps_history() {
        let mut pipeline = Pipeline::new(raw_parameters()).unwrap();
        for i in 0..3 {
            pipeline.process(sample(1.0, i * 10)).unwrap();
        }

        pipeline.reset();
        pipeline.reset();

        assert!(pipeline.mean_filter().is_empty());
        assert!(!pipeline.low_pass_filter(Formulation::HistoryWeighted).is_initialized());
        assert_eq!(pipeline.history().len(&SeriesKey::new(Channel::Raw, Axis::X)), 3);
    }

    #[test]
    fn history_window_can_shrink() {
        let mut pipeline = Pipeline::new(raw_parameters()).unwrap();
        for i in 0..10_u8 {
            pipeline.process(sample(f32::from(i), u64::from(i) * 10)).unwrap();
        }

        pipeline.set_history_window(4).unwrap();
        assert_eq!(
            pipeline
                .history()
                .snapshot(&SeriesKey::new(Channel::Raw, Axis::X)),
            vec![6.0, 7.0, 8.0, 9.0]
        );
        assert_eq!(pipeline.parameters().history_window, 4);
        assert_eq!(pipeline.set_history_window(0), Err(FilterError::InvalidWindowSize));
    }

    #[test]
    fn series_keys_are_unique() {
        let keys: Vec<SeriesKey> = SeriesKey::all().collect();
        let mut sorted = keys.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(keys.len(), 18);
        assert_eq!(sorted.len(), keys.len());
    }
}
