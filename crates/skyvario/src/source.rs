//! Sensor source status and lifecycle management.
//!
//! This module defines the error and status types for sensor sources,
//! plus the handles used to tear every source down when a flight
//! session stops.

use thiserror::Error;

use crate::sample::SensorKind;

/// Errors that can occur when starting or running a sensor source.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The user declined access to this source.
    #[error("permission denied for {0}")]
    PermissionDenied(SensorKind),

    /// The hardware or platform API is absent.
    #[error("{0} is unavailable")]
    Unavailable(SensorKind),

    /// The source failed to start for another reason.
    #[error("failed to start {kind}: {message}")]
    StartFailed {
        /// The source that failed.
        kind: SensorKind,
        /// Description of what went wrong.
        message: String,
    },

    /// The source is already running.
    #[error("{0} is already running")]
    AlreadyRunning(SensorKind),

    /// The source failed after starting (revoked mid-session).
    #[error("{kind} failed: {message}")]
    Failed {
        /// The source that failed.
        kind: SensorKind,
        /// Description of what went wrong.
        message: String,
    },
}

impl SourceError {
    /// The sensor this error relates to.
    #[must_use]
    pub fn kind(&self) -> SensorKind {
        match self {
            Self::PermissionDenied(kind)
            | Self::Unavailable(kind)
            | Self::AlreadyRunning(kind)
            | Self::StartFailed { kind, .. }
            | Self::Failed { kind, .. } => *kind,
        }
    }

    /// Check if this error is a permission denial.
    #[must_use]
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, Self::PermissionDenied(_))
    }
}

/// Result type for source operations.
pub type Result<T> = std::result::Result<T, SourceError>;

/// Availability of a sensor source, as exposed to the display layer.
///
/// Permission denial and hardware absence are distinct states: the
/// first can be fixed by the pilot, the second cannot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Availability {
    /// The source has not been started yet.
    #[default]
    Prompt,
    /// The source started and is delivering readings.
    Granted,
    /// The user declined access.
    Denied,
    /// The hardware or platform API is absent.
    Unavailable,
}

impl Availability {
    /// Derive the availability from a start failure.
    #[must_use]
    pub fn from_error(err: &SourceError) -> Self {
        if err.is_permission_denied() {
            Self::Denied
        } else {
            Self::Unavailable
        }
    }
}

impl std::fmt::Display for Availability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Prompt => write!(f, "prompt"),
            Self::Granted => write!(f, "granted"),
            Self::Denied => write!(f, "denied"),
            Self::Unavailable => write!(f, "unavailable"),
        }
    }
}

/// Availability of every sensor source in a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SourceStatus {
    /// Positioning receiver.
    pub gps: Availability,
    /// Barometric pressure sensor.
    pub barometer: Availability,
    /// Accelerometer.
    pub accelerometer: Availability,
    /// Magnetic field sensor.
    pub magnetometer: Availability,
}

impl SourceStatus {
    /// Record the availability of one source.
    pub fn set(&mut self, kind: SensorKind, availability: Availability) {
        match kind {
            SensorKind::Gps => self.gps = availability,
            SensorKind::Barometer => self.barometer = availability,
            SensorKind::Accelerometer => self.accelerometer = availability,
            SensorKind::Magnetometer => self.magnetometer = availability,
        }
    }

    /// Get the availability of one source.
    #[must_use]
    pub fn get(&self, kind: SensorKind) -> Availability {
        match kind {
            SensorKind::Gps => self.gps,
            SensorKind::Barometer => self.barometer,
            SensorKind::Accelerometer => self.accelerometer,
            SensorKind::Magnetometer => self.magnetometer,
        }
    }

    /// Check if any source is delivering readings.
    #[must_use]
    pub fn any_granted(&self) -> bool {
        [
            self.gps,
            self.barometer,
            self.accelerometer,
            self.magnetometer,
        ]
        .iter()
        .any(|a| *a == Availability::Granted)
    }
}

/// A cloneable stop flag shared between a task and its controller.
#[derive(Debug, Clone, Default)]
pub struct StopSignal {
    flag: std::sync::Arc<std::sync::atomic::AtomicBool>,
}

impl StopSignal {
    /// Create a fresh, unset signal.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the signal.
    pub fn stop(&self) {
        self.flag.store(true, std::sync::atomic::Ordering::SeqCst);
    }

    /// Check if the signal has been set.
    #[must_use]
    pub fn should_stop(&self) -> bool {
        self.flag.load(std::sync::atomic::Ordering::SeqCst)
    }

    /// Clear the signal for reuse.
    pub fn reset(&self) {
        self.flag.store(false, std::sync::atomic::Ordering::SeqCst);
    }
}

/// A handle to signal a running source task to stop.
///
/// Lightweight and cloneable; the source task polls [`Self::should_stop`]
/// between readings.
#[derive(Debug, Clone)]
pub struct SourceHandle {
    kind: SensorKind,
    signal: StopSignal,
}

impl SourceHandle {
    /// Create a new source handle.
    #[must_use]
    pub fn new(kind: SensorKind) -> Self {
        Self {
            kind,
            signal: StopSignal::new(),
        }
    }

    /// The sensor this handle controls.
    #[must_use]
    pub fn kind(&self) -> SensorKind {
        self.kind
    }

    /// Signal the source to stop.
    pub fn stop(&self) {
        self.signal.stop();
    }

    /// Check if the stop signal has been sent.
    #[must_use]
    pub fn should_stop(&self) -> bool {
        self.signal.should_stop()
    }

    /// Reset the stop signal for reuse in a new session.
    pub fn reset(&self) {
        self.signal.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_error_kind() {
        let err = SourceError::PermissionDenied(SensorKind::Gps);
        assert_eq!(err.kind(), SensorKind::Gps);

        let err = SourceError::StartFailed {
            kind: SensorKind::Barometer,
            message: "bus error".to_string(),
        };
        assert_eq!(err.kind(), SensorKind::Barometer);
    }

    #[test]
    fn test_source_error_display() {
        let err = SourceError::PermissionDenied(SensorKind::Gps);
        assert_eq!(err.to_string(), "permission denied for gps");

        let err = SourceError::Unavailable(SensorKind::Magnetometer);
        assert_eq!(err.to_string(), "magnetometer is unavailable");
    }

    #[test]
    fn test_availability_from_error() {
        let denied = SourceError::PermissionDenied(SensorKind::Gps);
        assert_eq!(Availability::from_error(&denied), Availability::Denied);

        let absent = SourceError::Unavailable(SensorKind::Barometer);
        assert_eq!(Availability::from_error(&absent), Availability::Unavailable);
    }

    #[test]
    fn test_availability_display() {
        assert_eq!(Availability::Prompt.to_string(), "prompt");
        assert_eq!(Availability::Granted.to_string(), "granted");
        assert_eq!(Availability::Denied.to_string(), "denied");
        assert_eq!(Availability::Unavailable.to_string(), "unavailable");
    }

    #[test]
    fn test_source_status_default() {
        let status = SourceStatus::default();
        assert_eq!(status.gps, Availability::Prompt);
        assert_eq!(status.barometer, Availability::Prompt);
        assert!(!status.any_granted());
    }

    #[test]
    fn test_source_status_set_get() {
        let mut status = SourceStatus::default();
        status.set(SensorKind::Barometer, Availability::Granted);
        status.set(SensorKind::Gps, Availability::Denied);

        assert_eq!(status.get(SensorKind::Barometer), Availability::Granted);
        assert_eq!(status.get(SensorKind::Gps), Availability::Denied);
        assert_eq!(status.get(SensorKind::Magnetometer), Availability::Prompt);
        assert!(status.any_granted());
    }

    #[test]
    fn test_source_handle_stop() {
        let handle = SourceHandle::new(SensorKind::Barometer);
        assert_eq!(handle.kind(), SensorKind::Barometer);
        assert!(!handle.should_stop());

        handle.stop();
        assert!(handle.should_stop());

        handle.reset();
        assert!(!handle.should_stop());
    }

    #[test]
    fn test_source_handle_clone_shares_signal() {
        let handle1 = SourceHandle::new(SensorKind::Gps);
        let handle2 = handle1.clone();

        handle1.stop();
        assert!(handle2.should_stop());
    }
}
