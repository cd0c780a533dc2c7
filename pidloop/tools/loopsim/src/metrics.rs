//! Step-response metrics
//!
//! A run is split into segments of constant setpoint. Each segment is scored
//! as a step from the value the plant had when the segment began to the
//! segment's setpoint.

use serde::{Deserialize, Serialize};

use crate::simulation::TickSample;

/// Fraction of the step that counts as "risen"
const RISE_FRACTION: f64 = 0.9;
/// Settling band as a fraction of the step size
const SETTLING_BAND: f64 = 0.02;
/// Settling band used when the step size is zero
const MIN_SETTLING_BAND: f64 = 1e-3;

/// Performance of one constant-setpoint segment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepMetrics {
    /// First tick of the segment
    pub start_tick: u64,
    /// Number of ticks in the segment
    pub ticks: usize,
    /// Plant value when the segment began
    pub initial: f64,
    /// Setpoint of the segment
    pub target: f64,
    /// Furthest value reached in the step direction
    pub peak: f64,
    /// Distance past the target in the step direction (never negative)
    pub overshoot: f64,
    /// Overshoot relative to the step size, in percent
    pub overshoot_percent: f64,
    /// Seconds until the value first covered 90% of the step
    pub rise_time: Option<f64>,
    /// Seconds until the value stayed inside the settling band for good
    pub settling_time: Option<f64>,
    /// Integral of absolute error over the segment
    pub iae: f64,
    /// Largest control magnitude
    pub peak_control: f64,
    /// Ticks where the output hit saturation
    pub saturated_ticks: usize,
    /// Target minus the last value
    pub final_error: f64,
    /// No NaN or infinity in value, velocity or control
    pub all_finite: bool,
}

impl StepMetrics {
    /// Score a segment
    ///
    /// `initial` is the plant value before the first sample, `dt` the time
    /// step used for the error integral. The target is the setpoint of the
    /// first sample. Returns `None` for an empty slice.
    pub fn analyze(samples: &[TickSample], initial: f64, dt: f64) -> Option<Self> {
        let (first, rest) = samples.split_first()?;
        let mut segment = Segment::start(first, initial, dt);
        for sample in rest {
            segment.push(sample);
        }
        Some(segment.finish())
    }

    /// Split a run at setpoint changes and score every segment
    ///
    /// `initial` is the plant value before the first sample.
    pub fn analyze_segments(samples: &[TickSample], initial: f64, dt: f64) -> Vec<Self> {
        let mut tracker = SegmentTracker::new(initial, dt);
        let mut segments: Vec<Self> = samples.iter().filter_map(|s| tracker.push(s)).collect();
        segments.extend(tracker.finish());
        segments
    }

    /// Settled within the band with overshoot under `max_overshoot_percent`
    pub fn is_acceptable(&self, max_overshoot_percent: f64) -> bool {
        self.all_finite
            && self.settling_time.is_some()
            && self.overshoot_percent <= max_overshoot_percent
    }
}

/// Scores segments while a run is in progress, without keeping samples
#[derive(Debug, Clone)]
pub struct SegmentTracker {
    dt: f64,
    next_initial: f64,
    current: Option<Segment>,
}

impl SegmentTracker {
    /// `initial` is the plant value before the first sample
    pub fn new(initial: f64, dt: f64) -> Self {
        Self {
            dt,
            next_initial: initial,
            current: None,
        }
    }

    /// Feed the next sample; returns the previous segment when the setpoint changed
    pub fn push(&mut self, sample: &TickSample) -> Option<StepMetrics> {
        let finished = match self.current.take() {
            Some(mut segment) if segment.target == sample.setpoint => {
                segment.push(sample);
                self.current = Some(segment);
                return None;
            }
            Some(segment) => {
                self.next_initial = segment.last_value;
                Some(segment.finish())
            }
            None => None,
        };

        self.current = Some(Segment::start(sample, self.next_initial, self.dt));
        finished
    }

    /// Score the segment still in progress
    pub fn finish(self) -> Option<StepMetrics> {
        self.current.map(Segment::finish)
    }
}

/// Running totals of one constant-setpoint segment
#[derive(Debug, Clone)]
struct Segment {
    start_tick: u64,
    start_time: f64,
    dt: f64,
    initial: f64,
    target: f64,
    step: f64,
    direction: f64,
    band: f64,
    ticks: usize,
    peak: f64,
    rise_time: Option<f64>,
    // Time since which the value has stayed inside the band
    inside_since: Option<f64>,
    iae: f64,
    peak_control: f64,
    saturated_ticks: usize,
    last_value: f64,
    all_finite: bool,
}

impl Segment {
    fn start(first: &TickSample, initial: f64, dt: f64) -> Self {
        let target = first.setpoint;
        let step = target - initial;
        let mut segment = Self {
            start_tick: first.tick,
            start_time: first.time,
            dt,
            initial,
            target,
            step,
            direction: if step < 0.0 { -1.0 } else { 1.0 },
            band: (step.abs() * SETTLING_BAND).max(MIN_SETTLING_BAND),
            ticks: 0,
            peak: initial,
            rise_time: None,
            inside_since: Some(0.0),
            iae: 0.0,
            peak_control: 0.0,
            saturated_ticks: 0,
            last_value: initial,
            all_finite: true,
        };
        segment.push(first);
        segment
    }

    fn push(&mut self, s: &TickSample) {
        let since_start = s.time - self.start_time;
        let (initial, direction) = (self.initial, self.direction);

        if (s.value - initial) * direction > (self.peak - initial) * direction {
            self.peak = s.value;
        }
        if self.rise_time.is_none()
            && self.step != 0.0
            && (s.value - initial) * direction >= RISE_FRACTION * self.step.abs()
        {
            self.rise_time = Some(since_start);
        }
        if (self.target - s.value).abs() > self.band {
            self.inside_since = None;
        } else if self.inside_since.is_none() {
            self.inside_since = Some(since_start);
        }

        self.iae += (s.setpoint - s.value).abs() * self.dt;
        self.peak_control = self.peak_control.max(s.control.abs());
        if s.saturated {
            self.saturated_ticks += 1;
        }
        self.all_finite &= s.value.is_finite() && s.velocity.is_finite() && s.control.is_finite();
        self.last_value = s.value;
        self.ticks += 1;
    }

    fn finish(self) -> StepMetrics {
        let overshoot = ((self.peak - self.target) * self.direction).max(0.0);
        let overshoot_percent = if self.step != 0.0 {
            overshoot / self.step.abs() * 100.0
        } else {
            0.0
        };

        StepMetrics {
            start_tick: self.start_tick,
            ticks: self.ticks,
            initial: self.initial,
            target: self.target,
            peak: self.peak,
            overshoot,
            overshoot_percent,
            rise_time: self.rise_time,
            settling_time: self.inside_since,
            iae: self.iae,
            peak_control: self.peak_control,
            saturated_ticks: self.saturated_ticks,
            final_error: self.target - self.last_value,
            all_finite: self.all_finite,
        }
    }
}
