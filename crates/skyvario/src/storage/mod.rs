//! Storage layer for skyvario.
//!
//! This module provides `SQLite`-based persistent storage for recorded
//! flights, including listing, retrieval, and deletion.

pub mod migrations;
pub mod schema;

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::track::{Flight, TrackPoint};

/// Persistent flight log.
///
/// Each flight is stored as one row: its time bounds, point count,
/// and the full track serialized as JSON.
#[derive(Debug)]
pub struct FlightLog {
    /// Path to the database file.
    path: PathBuf,
    /// Database connection.
    conn: Connection,
}

impl FlightLog {
    /// Open or create a flight log database at the given path.
    ///
    /// Creates the parent directories and database file if they don't exist.
    /// Initializes the schema if this is a new database.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or schema
    /// initialization fails.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        debug!("Opening flight log at {}", path.display());
        let conn = Connection::open(&path).map_err(|source| Error::DatabaseOpen {
            path: path.clone(),
            source,
        })?;

        // WAL mode for better concurrent read performance
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;

        migrations::initialize_schema(&conn)?;

        info!("Flight log opened at {}", path.display());
        Ok(Self { path, conn })
    }

    /// Create an in-memory flight log for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|source| Error::DatabaseOpen {
            path: PathBuf::from(":memory:"),
            source,
        })?;

        migrations::initialize_schema(&conn)?;

        Ok(Self {
            path: PathBuf::from(":memory:"),
            conn,
        })
    }

    /// Get the path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Insert a flight and return its assigned ID.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the database operation fails.
    pub fn insert(&self, flight: &Flight) -> Result<i64> {
        let track_json = serde_json::to_string(&flight.track)?;
        let point_count = i64::try_from(flight.track.len()).unwrap_or(i64::MAX);

        self.conn.execute(
            r"
            INSERT INTO flights (start_time, end_time, point_count, track)
            VALUES (?1, ?2, ?3, ?4)
            ",
            params![
                flight.start_time.to_rfc3339(),
                flight.end_time.to_rfc3339(),
                point_count,
                track_json,
            ],
        )?;

        let id = self.conn.last_insert_rowid();
        debug!("Inserted flight with id {}", id);
        Ok(id)
    }

    /// Get a flight by its ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn get(&self, id: i64) -> Result<Option<Flight>> {
        let row = self
            .conn
            .query_row(
                r"
                SELECT id, start_time, end_time, track
                FROM flights WHERE id = ?1
                ",
                [id],
                Self::row_to_raw,
            )
            .optional()?;

        match row {
            Some(raw) => Ok(Some(Self::raw_to_flight(raw)?)),
            None => Ok(None),
        }
    }

    /// Get the most recent flights, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn list_recent(&self, limit: usize) -> Result<Vec<Flight>> {
        let mut stmt = self.conn.prepare(
            r"
            SELECT id, start_time, end_time, track
            FROM flights ORDER BY start_time DESC LIMIT ?1
            ",
        )?;

        let limit_i64 = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = stmt
            .query_map([limit_i64], Self::row_to_raw)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        rows.into_iter().map(Self::raw_to_flight).collect()
    }

    /// Count total flights in the log.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn count(&self) -> Result<i64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM flights", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Delete a flight by ID.
    ///
    /// Returns `true` if a flight was deleted, `false` if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn delete(&self, id: i64) -> Result<bool> {
        let affected = self.conn.execute("DELETE FROM flights WHERE id = ?1", [id])?;
        Ok(affected > 0)
    }

    /// Read the raw columns of a flight row.
    fn row_to_raw(row: &rusqlite::Row) -> rusqlite::Result<(i64, String, String, String)> {
        Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
    }

    /// Deserialize a raw flight row.
    fn raw_to_flight(raw: (i64, String, String, String)) -> Result<Flight> {
        let (id, start_str, end_str, track_json) = raw;
        let track: Vec<TrackPoint> = serde_json::from_str(&track_json)?;

        Ok(Flight {
            id: Some(id),
            start_time: parse_timestamp(&start_str),
            end_time: parse_timestamp(&end_str),
            track,
        })
    }
}

/// Parse a stored RFC 3339 timestamp, falling back to now on corruption.
fn parse_timestamp(value: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value).map_or_else(|_| Utc::now(), |dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn create_test_log() -> FlightLog {
        FlightLog::open_in_memory().expect("failed to create test flight log")
    }

    fn ts(seconds: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + seconds, 0).unwrap()
    }

    fn create_test_flight(offset: i64) -> Flight {
        let start = ts(offset);
        let track = vec![
            TrackPoint {
                lat: 46.5,
                lon: 7.9,
                altitude_msl: 1500.0,
                time: start,
                vertical_speed: 0.8,
            },
            TrackPoint {
                lat: 46.501,
                lon: 7.901,
                altitude_msl: 1502.0,
                time: start + chrono::Duration::seconds(1),
                vertical_speed: 1.4,
            },
        ];
        Flight::new(start, start + chrono::Duration::seconds(1), track)
    }

    #[test]
    fn test_open_in_memory() {
        let log = FlightLog::open_in_memory();
        assert!(log.is_ok());
    }

    #[test]
    fn test_insert_and_get() {
        let log = create_test_log();
        let flight = create_test_flight(0);

        let id = log.insert(&flight).unwrap();
        let retrieved = log.get(id).unwrap().expect("flight should exist");

        assert_eq!(retrieved.id, Some(id));
        assert_eq!(retrieved.start_time, flight.start_time);
        assert_eq!(retrieved.end_time, flight.end_time);
        assert_eq!(retrieved.track, flight.track);
    }

    #[test]
    fn test_get_nonexistent() {
        let log = create_test_log();
        let result = log.get(99999).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_list_recent_newest_first() {
        let log = create_test_log();

        for i in 0..5 {
            log.insert(&create_test_flight(i * 3600)).unwrap();
        }

        let recent = log.list_recent(3).unwrap();
        assert_eq!(recent.len(), 3);
        for pair in recent.windows(2) {
            assert!(pair[0].start_time >= pair[1].start_time);
        }
    }

    #[test]
    fn test_count() {
        let log = create_test_log();
        assert_eq!(log.count().unwrap(), 0);

        log.insert(&create_test_flight(0)).unwrap();
        log.insert(&create_test_flight(100)).unwrap();

        assert_eq!(log.count().unwrap(), 2);
    }

    #[test]
    fn test_delete() {
        let log = create_test_log();
        let id = log.insert(&create_test_flight(0)).unwrap();

        assert!(log.get(id).unwrap().is_some());
        assert!(log.delete(id).unwrap());
        assert!(log.get(id).unwrap().is_none());
    }

    #[test]
    fn test_delete_nonexistent() {
        let log = create_test_log();
        assert!(!log.delete(99999).unwrap());
    }

    #[test]
    fn test_empty_track_round_trips() {
        let log = create_test_log();
        let flight = Flight::new(ts(0), ts(60), Vec::new());

        let id = log.insert(&flight).unwrap();
        let retrieved = log.get(id).unwrap().unwrap();

        assert!(retrieved.track.is_empty());
    }

    #[test]
    fn test_open_file_based() {
        let temp_dir = std::env::temp_dir();
        let db_path = temp_dir.join(format!("skyvario_test_{}.db", std::process::id()));

        let log = FlightLog::open(&db_path).unwrap();
        log.insert(&create_test_flight(0)).unwrap();
        assert_eq!(log.count().unwrap(), 1);
        assert_eq!(log.path(), db_path);

        drop(log);
        let _ = std::fs::remove_file(&db_path);
        let _ = std::fs::remove_file(db_path.with_extension("db-wal"));
        let _ = std::fs::remove_file(db_path.with_extension("db-shm"));
    }

    #[test]
    fn test_open_creates_parent_dirs() {
        let temp_dir = std::env::temp_dir();
        let nested_path = temp_dir.join(format!(
            "skyvario_test_{}/nested/flights.db",
            std::process::id()
        ));

        if let Some(parent) = nested_path.parent() {
            let _ = std::fs::remove_dir_all(parent);
        }

        let log = FlightLog::open(&nested_path).unwrap();
        assert!(nested_path.exists());

        drop(log);
        if let Some(parent) = nested_path.parent() {
            let _ = std::fs::remove_dir_all(parent.parent().unwrap());
        }
    }
}
