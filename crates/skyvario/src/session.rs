//! Flight session orchestration.
//!
//! A `FlightSession` owns the sensor sources, the estimator, and the
//! ingest task that routes samples between them. Sessions follow a
//! strict lifecycle: construct, `start`, run, `stop`. Starting creates
//! a fresh estimator so no fusion state leaks between flights.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::FilterConfig;
use crate::error::{Error, Result};
use crate::estimator::Estimator;
use crate::flight_data::{channel, FlightDataRx};
use crate::sample::{InertialSample, Sample, SampleSource, SensorKind, SourceEvent};
use crate::source::{Availability, SourceStatus};
use crate::track::Flight;

/// Capacity of the sample event channel.
///
/// Sized for a few hundred milliseconds of backlog at the fastest
/// source rate; the ingest task is cheap enough that this never fills
/// in practice.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// One flight session: sensor sources, estimator, and ingest routing.
pub struct FlightSession {
    sources: Vec<Box<dyn SampleSource>>,
    estimator: Arc<Mutex<Estimator>>,
    status: Arc<Mutex<SourceStatus>>,
    data: FlightDataRx,
    event_tx: Option<mpsc::Sender<SourceEvent>>,
    ingest_task: Option<tokio::task::JoinHandle<()>>,
    start_time: Option<DateTime<Utc>>,
}

impl std::fmt::Debug for FlightSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlightSession")
            .field("sources", &self.sources.len())
            .field("running", &self.is_running())
            .field("start_time", &self.start_time)
            .finish_non_exhaustive()
    }
}

impl FlightSession {
    /// Create a session over the given sensor sources.
    ///
    /// The estimator and its snapshot channel are created immediately
    /// so consumers can subscribe before the session starts.
    #[must_use]
    pub fn new(filter: &FilterConfig, sources: Vec<Box<dyn SampleSource>>) -> Self {
        let (tx, rx) = channel();
        Self {
            sources,
            estimator: Arc::new(Mutex::new(Estimator::new(filter, tx))),
            status: Arc::new(Mutex::new(SourceStatus::default())),
            data: rx,
            event_tx: None,
            ingest_task: None,
            start_time: None,
        }
    }

    /// A reader for the published flight data snapshot.
    #[must_use]
    pub fn data(&self) -> FlightDataRx {
        self.data.clone()
    }

    /// Current availability of every source.
    ///
    /// # Errors
    ///
    /// Returns an internal error if the status lock is poisoned.
    pub fn status(&self) -> Result<SourceStatus> {
        self.status
            .lock()
            .map(|s| *s)
            .map_err(|_| Error::internal("source status lock poisoned"))
    }

    /// Check if the session has started and not yet stopped.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.ingest_task.is_some()
    }

    /// Start the session: spawn the ingest task and start every source.
    ///
    /// A source that fails to start is recorded in the status (denied
    /// or unavailable) and the session continues without it; the
    /// estimator degrades gracefully. Starting with zero working
    /// sources is allowed.
    ///
    /// # Errors
    ///
    /// Returns an error if the session is already running or a lock is
    /// poisoned.
    pub async fn start(&mut self) -> Result<()> {
        if self.is_running() {
            return Err(Error::internal("session already running"));
        }

        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        self.ingest_task = Some(tokio::spawn(ingest_loop(
            rx,
            Arc::clone(&self.estimator),
            Arc::clone(&self.status),
        )));

        for source in &mut self.sources {
            let kind = source.kind();
            match source.start(tx.clone()).await {
                Ok(()) => {
                    debug!(source = source.name(), "source started");
                    Self::set_availability(&self.status, kind, Availability::Granted)?;
                }
                Err(err) => {
                    warn!(source = source.name(), %err, "source failed to start");
                    Self::set_availability(&self.status, kind, Availability::from_error(&err))?;
                }
            }
        }

        self.event_tx = Some(tx);
        self.start_time = Some(Utc::now());
        info!(sources = self.sources.len(), "flight session started");
        Ok(())
    }

    /// Stop the session and return the flight's time bounds.
    ///
    /// Stops every source, drains the ingest task, and returns a
    /// [`Flight`] with an empty track; the caller attaches whatever
    /// the track recorder collected.
    ///
    /// # Errors
    ///
    /// Returns an error if the session was never started.
    pub async fn stop(&mut self) -> Result<Flight> {
        let start_time = self
            .start_time
            .take()
            .ok_or_else(|| Error::internal("session was never started"))?;

        for source in &mut self.sources {
            source.stop();
        }

        // Dropping the sender ends the ingest loop once the channel
        // drains.
        self.event_tx = None;
        if let Some(task) = self.ingest_task.take() {
            if let Err(err) = task.await {
                warn!(%err, "ingest task ended abnormally");
            }
        }

        let end_time = Utc::now();
        info!("flight session stopped");
        Ok(Flight::new(start_time, end_time, Vec::new()))
    }

    /// Re-zero the AGL altitude so it reads `value` right now.
    ///
    /// # Errors
    ///
    /// Returns an internal error if the estimator lock is poisoned.
    pub fn calibrate_agl(&self, value: f64) -> Result<()> {
        self.lock_estimator()?.calibrate_agl(value);
        Ok(())
    }

    /// Calibrate the pressure model against a known MSL altitude.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CalibrationUnavailable`] if no GPS altitude or
    /// pressure reading has arrived yet.
    pub fn calibrate_msl(&self, known_msl: f64) -> Result<()> {
        self.lock_estimator()?.calibrate_msl(known_msl)
    }

    fn lock_estimator(&self) -> Result<std::sync::MutexGuard<'_, Estimator>> {
        self.estimator
            .lock()
            .map_err(|_| Error::internal("estimator lock poisoned"))
    }

    fn set_availability(
        status: &Mutex<SourceStatus>,
        kind: SensorKind,
        availability: Availability,
    ) -> Result<()> {
        status
            .lock()
            .map_err(|_| Error::internal("source status lock poisoned"))?
            .set(kind, availability);
        Ok(())
    }
}

/// Route source events into the estimator until the channel closes.
///
/// Barometric readings are fused with the freshest accelerometer
/// reading seen so far; a baro sample arriving before any inertial
/// sample is dropped. Position and magnetic readings pass straight
/// through. A `Failed` event marks the source unavailable, and a dead
/// magnetometer additionally clears the published heading.
async fn ingest_loop(
    mut rx: mpsc::Receiver<SourceEvent>,
    estimator: Arc<Mutex<Estimator>>,
    status: Arc<Mutex<SourceStatus>>,
) {
    let mut latest_inertial: Option<InertialSample> = None;

    while let Some(event) = rx.recv().await {
        let Ok(mut est) = estimator.lock() else {
            warn!("estimator lock poisoned, ingest stopping");
            return;
        };

        match event {
            SourceEvent::Reading(Sample::Inertial(sample)) => {
                latest_inertial = Some(sample);
            }
            SourceEvent::Reading(Sample::Baro(sample)) => {
                if let Some(inertial) = latest_inertial {
                    est.ingest_baro_inertial(sample, inertial);
                } else {
                    debug!("baro sample before first inertial sample, dropped");
                }
            }
            SourceEvent::Reading(Sample::Position(sample)) => {
                est.ingest_position(sample);
            }
            SourceEvent::Reading(Sample::Magnetic(sample)) => {
                est.ingest_magnetic(sample);
            }
            SourceEvent::Failed { kind, message } => {
                warn!(%kind, %message, "source failed mid-session");
                if let Ok(mut s) = status.lock() {
                    s.set(kind, Availability::Unavailable);
                }
                if kind == SensorKind::Magnetometer {
                    est.clear_heading();
                }
            }
        }
    }

    debug!("ingest loop ended");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::{BaroSample, MagneticSample, PositionSample};
    use crate::source::SourceError;

    /// A source that delivers a fixed script of samples on start.
    struct ScriptedSource {
        kind: SensorKind,
        script: Vec<Sample>,
        running: bool,
    }

    impl ScriptedSource {
        fn new(kind: SensorKind, script: Vec<Sample>) -> Self {
            Self {
                kind,
                script,
                running: false,
            }
        }
    }

    #[async_trait::async_trait]
    impl SampleSource for ScriptedSource {
        fn name(&self) -> &'static str {
            "scripted"
        }

        fn kind(&self) -> SensorKind {
            self.kind
        }

        async fn start(
            &mut self,
            sender: mpsc::Sender<SourceEvent>,
        ) -> std::result::Result<(), SourceError> {
            for sample in self.script.drain(..) {
                sender
                    .send(SourceEvent::Reading(sample))
                    .await
                    .map_err(|e| SourceError::Failed {
                        kind: self.kind,
                        message: e.to_string(),
                    })?;
            }
            self.running = true;
            Ok(())
        }

        fn stop(&mut self) {
            self.running = false;
        }

        fn is_running(&self) -> bool {
            self.running
        }
    }

    /// A source that always fails to start.
    struct DeniedSource(SensorKind);

    #[async_trait::async_trait]
    impl SampleSource for DeniedSource {
        fn name(&self) -> &'static str {
            "denied"
        }

        fn kind(&self) -> SensorKind {
            self.0
        }

        async fn start(
            &mut self,
            _sender: mpsc::Sender<SourceEvent>,
        ) -> std::result::Result<(), SourceError> {
            Err(SourceError::PermissionDenied(self.0))
        }

        fn stop(&mut self) {}

        fn is_running(&self) -> bool {
            false
        }
    }

    fn ts(millis: i64) -> DateTime<Utc> {
        chrono::TimeZone::timestamp_millis_opt(&Utc, 1_700_000_000_000 + millis)
            .single()
            .expect("valid timestamp")
    }

    fn baro(pressure_hpa: f64, t: i64) -> Sample {
        Sample::Baro(BaroSample {
            pressure_hpa,
            timestamp: ts(t),
        })
    }

    fn inertial(az: f64, t: i64) -> Sample {
        Sample::Inertial(InertialSample {
            ax: 0.0,
            ay: 0.0,
            az,
            timestamp: ts(t),
        })
    }

    async fn settle() {
        // Let the ingest task drain the channel.
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }

    #[tokio::test]
    async fn test_session_lifecycle() {
        crate::logging::init_test_logging();
        let mut session = FlightSession::new(&FilterConfig::default(), Vec::new());
        assert!(!session.is_running());

        session.start().await.unwrap();
        assert!(session.is_running());

        let flight = session.stop().await.unwrap();
        assert!(!session.is_running());
        assert!(flight.start_time <= flight.end_time);
        assert!(flight.track.is_empty());
    }

    #[tokio::test]
    async fn test_stop_without_start_fails() {
        let mut session = FlightSession::new(&FilterConfig::default(), Vec::new());
        assert!(session.stop().await.is_err());
    }

    #[tokio::test]
    async fn test_double_start_fails() {
        let mut session = FlightSession::new(&FilterConfig::default(), Vec::new());
        session.start().await.unwrap();
        assert!(session.start().await.is_err());
        session.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_samples_flow_into_snapshot() {
        crate::logging::init_test_logging();
        let sources: Vec<Box<dyn SampleSource>> = vec![Box::new(ScriptedSource::new(
            SensorKind::Barometer,
            vec![
                inertial(0.0, 0),
                baro(1013.25, 0),
                baro(1012.0, 1000),
            ],
        ))];

        let mut session = FlightSession::new(&FilterConfig::default(), sources);
        let data = session.data();
        session.start().await.unwrap();
        settle().await;

        // Falling pressure reads as climb.
        assert!(data.latest().vertical_speed > 0.0);
        session.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_baro_before_inertial_is_dropped() {
        let sources: Vec<Box<dyn SampleSource>> = vec![Box::new(ScriptedSource::new(
            SensorKind::Barometer,
            vec![baro(1013.25, 0), baro(1000.0, 1000)],
        ))];

        let mut session = FlightSession::new(&FilterConfig::default(), sources);
        let data = session.data();
        session.start().await.unwrap();
        settle().await;

        // No inertial samples ever arrived, so no fusion ran.
        assert_eq!(data.latest(), crate::flight_data::FlightData::default());
        session.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_denied_source_is_nonfatal() {
        let sources: Vec<Box<dyn SampleSource>> = vec![
            Box::new(DeniedSource(SensorKind::Gps)),
            Box::new(ScriptedSource::new(
                SensorKind::Barometer,
                vec![inertial(0.0, 0), baro(1013.25, 0)],
            )),
        ];

        let mut session = FlightSession::new(&FilterConfig::default(), sources);
        session.start().await.unwrap();

        let status = session.status().unwrap();
        assert_eq!(status.gps, Availability::Denied);
        assert_eq!(status.barometer, Availability::Granted);
        session.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_position_and_magnetic_routing() {
        let sources: Vec<Box<dyn SampleSource>> = vec![Box::new(ScriptedSource::new(
            SensorKind::Gps,
            vec![
                Sample::Position(PositionSample {
                    lat: 46.5,
                    lon: 7.9,
                    altitude_msl: Some(1800.0),
                    ground_speed: Some(9.0),
                    timestamp: ts(0),
                }),
                Sample::Magnetic(MagneticSample {
                    x: 0.0,
                    y: 1.0,
                    timestamp: ts(0),
                }),
            ],
        ))];

        let mut session = FlightSession::new(&FilterConfig::default(), sources);
        let data = session.data();
        session.start().await.unwrap();
        settle().await;

        let snapshot = data.latest();
        assert_eq!(snapshot.lat, Some(46.5));
        assert_eq!(snapshot.altitude_msl, 1800.0);
        assert_eq!(snapshot.heading, Some(90.0));
        session.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_magnetometer_failure_clears_heading() {
        let mut session = FlightSession::new(&FilterConfig::default(), Vec::new());
        let data = session.data();
        session.start().await.unwrap();

        let tx = session.event_tx.clone().unwrap();
        tx.send(SourceEvent::Reading(Sample::Magnetic(MagneticSample {
            x: 1.0,
            y: 0.0,
            timestamp: ts(0),
        })))
        .await
        .unwrap();
        settle().await;
        assert_eq!(data.latest().heading, Some(0.0));

        tx.send(SourceEvent::Failed {
            kind: SensorKind::Magnetometer,
            message: "sensor removed".to_string(),
        })
        .await
        .unwrap();
        drop(tx);
        settle().await;

        assert_eq!(data.latest().heading, None);
        assert_eq!(
            session.status().unwrap().magnetometer,
            Availability::Unavailable
        );
        session.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_calibration_through_session() {
        let sources: Vec<Box<dyn SampleSource>> = vec![Box::new(ScriptedSource::new(
            SensorKind::Barometer,
            vec![
                inertial(0.0, 0),
                baro(1013.25, 0),
                baro(950.0, 1000),
            ],
        ))];

        let mut session = FlightSession::new(&FilterConfig::default(), sources);
        let data = session.data();
        session.start().await.unwrap();
        settle().await;

        assert!(data.latest().altitude_agl > 0.0);
        session.calibrate_agl(0.0).unwrap();
        assert_eq!(data.latest().altitude_agl, 0.0);

        // No GPS altitude yet: MSL calibration must refuse.
        let err = session.calibrate_msl(1000.0).unwrap_err();
        assert!(err.is_calibration_unavailable());
        session.stop().await.unwrap();
    }
}
