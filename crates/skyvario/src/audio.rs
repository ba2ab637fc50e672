//! The vario audio feedback engine.
//!
//! Maps the latest published vertical speed onto a tone: rising beeps
//! in lift, a continuous low tone in strong sink, silence in between.
//! The engine runs on its own fixed cadence, independent of sample
//! arrival: it resamples the newest snapshot on every tick, so an
//! irregular estimator cadence never disturbs the beep rhythm.
//!
//! Every gain change goes through the output's smoothed ramp, never a
//! step, so state transitions are free of audible clicks.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::config::AudioConfig;
use crate::error::Result;
use crate::flight_data::FlightDataRx;
use crate::source::StopSignal;

/// Vertical speed at which the lift tone saturates, in m/s.
pub const MAX_LIFT: f64 = 5.0;

/// Gain target while a lift beep sounds.
pub const BEEP_GAIN: f64 = 0.3;

/// Gain target for the continuous sink tone.
pub const SINK_GAIN: f64 = 0.2;

/// Ramp applied to beep attacks and frequency retunes.
const BEEP_RAMP: Duration = Duration::from_millis(10);

/// Ramp applied to beep releases.
const RELEASE_RAMP: Duration = Duration::from_millis(20);

/// Ramp applied when the sink tone fades in.
const SINK_RAMP: Duration = Duration::from_millis(100);

/// Ramp applied to the sink tone frequency retune.
const SINK_FREQ_RAMP: Duration = Duration::from_millis(50);

/// The audible state derived from the current vertical speed.
///
/// A pure function of (vertical speed, thresholds): no memory of any
/// prior audio state is needed for correctness.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ToneState {
    /// No tone.
    Silent,
    /// Beeping lift tone.
    Lifting {
        /// Tone frequency in Hz.
        frequency: f64,
        /// Interval between beep onsets.
        cadence: Duration,
        /// Length of each beep.
        beep_duration: Duration,
    },
    /// Continuous low sink tone.
    Sinking {
        /// Tone frequency in Hz.
        frequency: f64,
    },
}

/// Classify a vertical speed against the configured thresholds.
///
/// In lift, frequency rises linearly from the base toward the maximum
/// as vertical speed approaches [`MAX_LIFT`]; cadence shortens and beep
/// duration lengthens, producing faster, higher beeping in strong lift.
#[must_use]
pub fn classify(vertical_speed: f64, audio: &AudioConfig) -> ToneState {
    if vertical_speed > audio.lift_threshold {
        let strength = (vertical_speed / MAX_LIFT).min(1.0);
        let frequency =
            audio.base_frequency + strength * (audio.max_frequency - audio.base_frequency);
        let cadence = Duration::from_millis((600.0 - strength * 500.0).round() as u64);
        let beep_duration = Duration::from_millis((100.0 + strength * 100.0).round() as u64);
        ToneState::Lifting {
            frequency,
            cadence,
            beep_duration,
        }
    } else if vertical_speed < audio.sink_threshold {
        ToneState::Sinking {
            frequency: audio.sink_frequency,
        }
    } else {
        ToneState::Silent
    }
}

/// Trait for the injected audio output capability.
///
/// Implementors wrap a continuously running oscillator/gain pipeline
/// that can be retuned at any rate. Gain targets must be approached
/// with a smoothed ramp over the given duration, never as a step.
pub trait ToneOutput: Send {
    /// Retune the oscillator frequency, ramped over `ramp`.
    fn set_frequency(&mut self, hz: f64, ramp: Duration);

    /// Ramp the output gain toward `target` over `ramp`.
    fn set_gain(&mut self, target: f64, ramp: Duration);

    /// Unsuspend the output pipeline.
    ///
    /// Some platforms create audio suspended until a user gesture;
    /// this is the operation to call from that gesture.
    ///
    /// # Errors
    ///
    /// Returns an error if the pipeline cannot be resumed.
    fn resume(&mut self) -> Result<()>;
}

/// A cloneable handle that mutes the engine.
///
/// Muting gates gain only; the oscillator and the beep clock keep
/// running, so unmuting resumes instantly with no re-initialization.
#[derive(Debug, Clone, Default)]
pub struct MuteHandle {
    muted: Arc<AtomicBool>,
}

impl MuteHandle {
    /// Create an unmuted handle.
    #[must_use]
    pub fn new(muted: bool) -> Self {
        Self {
            muted: Arc::new(AtomicBool::new(muted)),
        }
    }

    /// Set the mute state.
    pub fn set_muted(&self, muted: bool) {
        self.muted.store(muted, Ordering::SeqCst);
    }

    /// Check the mute state.
    #[must_use]
    pub fn is_muted(&self) -> bool {
        self.muted.load(Ordering::SeqCst)
    }
}

/// The audio feedback engine.
///
/// Drive it either with [`VarioAudio::run`] (a tokio task on a fixed
/// interval) or by calling [`VarioAudio::tick`] directly with an
/// explicit elapsed time, which is how the tests drive it.
pub struct VarioAudio<O: ToneOutput> {
    output: O,
    data: FlightDataRx,
    config: AudioConfig,
    mute: MuteHandle,
    /// Position inside the current beep cycle.
    cycle_pos: Duration,
    /// State the previous tick classified, for transition handling.
    previous: ToneState,
    /// Last gain target sent to the output, to avoid redundant retunes.
    sent_gain: Option<f64>,
    /// Last frequency sent to the output.
    sent_frequency: Option<f64>,
}

impl<O: ToneOutput> std::fmt::Debug for VarioAudio<O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VarioAudio")
            .field("previous", &self.previous)
            .field("cycle_pos", &self.cycle_pos)
            .field("muted", &self.mute.is_muted())
            .finish_non_exhaustive()
    }
}

impl<O: ToneOutput> VarioAudio<O> {
    /// Create an engine reading from the given snapshot channel.
    #[must_use]
    pub fn new(output: O, data: FlightDataRx, config: AudioConfig) -> Self {
        let mute = MuteHandle::new(config.muted);
        Self {
            output,
            data,
            config,
            mute,
            cycle_pos: Duration::ZERO,
            previous: ToneState::Silent,
            sent_gain: None,
            sent_frequency: None,
        }
    }

    /// A handle to mute/unmute this engine from other tasks.
    #[must_use]
    pub fn mute_handle(&self) -> MuteHandle {
        self.mute.clone()
    }

    /// Unsuspend the underlying output (user-gesture hook).
    ///
    /// # Errors
    ///
    /// Returns an error if the output pipeline cannot be resumed.
    pub fn resume(&mut self) -> Result<()> {
        self.output.resume()
    }

    /// Evaluate one engine tick after `dt` of elapsed time.
    ///
    /// Reads the latest snapshot without blocking; stale data just
    /// means the tone does not change.
    pub fn tick(&mut self, dt: Duration) {
        let vertical_speed = self.data.latest().vertical_speed;
        let state = classify(vertical_speed, &self.config);

        // The beep clock advances regardless of mute so unmuting lands
        // mid-rhythm instead of restarting it.
        match state {
            ToneState::Lifting {
                frequency,
                cadence,
                beep_duration,
            } => {
                if !matches!(self.previous, ToneState::Lifting { .. }) {
                    // Entering lift: start a fresh cycle so the first
                    // beep sounds immediately.
                    self.cycle_pos = Duration::ZERO;
                } else {
                    self.cycle_pos += dt;
                    if self.cycle_pos >= cadence {
                        self.cycle_pos = Duration::ZERO;
                    }
                }

                // Retune in place: strength changes update the pitch
                // without restarting the running envelope.
                self.set_frequency(frequency, BEEP_RAMP);
                if self.cycle_pos < beep_duration {
                    self.set_gain(BEEP_GAIN, BEEP_RAMP);
                } else {
                    self.set_gain(0.0, RELEASE_RAMP);
                }
            }
            ToneState::Sinking { frequency } => {
                self.set_frequency(frequency, SINK_FREQ_RAMP);
                self.set_gain(SINK_GAIN, SINK_RAMP);
            }
            ToneState::Silent => {
                self.set_gain(0.0, RELEASE_RAMP);
            }
        }

        self.previous = state;
    }

    /// Silence the output, ramped. Used at session stop.
    pub fn silence(&mut self) {
        self.set_gain(0.0, RELEASE_RAMP);
        self.previous = ToneState::Silent;
    }

    fn set_frequency(&mut self, hz: f64, ramp: Duration) {
        if self.sent_frequency != Some(hz) {
            self.output.set_frequency(hz, ramp);
            self.sent_frequency = Some(hz);
        }
    }

    fn set_gain(&mut self, target: f64, ramp: Duration) {
        // Mute gates the gain only; frequency and clock keep running.
        let target = if self.mute.is_muted() { 0.0 } else { target };
        if self.sent_gain != Some(target) {
            self.output.set_gain(target, ramp);
            self.sent_gain = Some(target);
        }
    }

    /// Run the engine until `stop` is signaled.
    ///
    /// Re-evaluates on a fixed interval regardless of whether a fresh
    /// snapshot exists, keeping gain ramps and beep cadences smooth.
    /// Ends with a ramped silence.
    pub async fn run(mut self, tick: Duration, stop: StopSignal) {
        info!(tick_ms = tick.as_millis() as u64, "audio engine running");
        let mut interval = tokio::time::interval(tick);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            interval.tick().await;
            if stop.should_stop() {
                break;
            }
            self.tick(tick);
        }

        self.silence();
        debug!("audio engine stopped");
    }
}
