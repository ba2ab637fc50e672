//! Database schema definitions for the flight log.

/// SQL statements that create the base schema.
///
/// All statements use `IF NOT EXISTS` so they are safe to run against
/// an existing database.
pub const SCHEMA_STATEMENTS: &[&str] = &[
    // Metadata table for schema versioning
    "CREATE TABLE IF NOT EXISTS metadata (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL
    )",
    // Flights table: one row per recorded flight, track stored as JSON
    "CREATE TABLE IF NOT EXISTS flights (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        start_time TEXT NOT NULL,
        end_time TEXT NOT NULL,
        point_count INTEGER NOT NULL,
        track TEXT NOT NULL
    )",
    // Index for listing flights newest first
    "CREATE INDEX IF NOT EXISTS idx_flights_start_time ON flights(start_time DESC)",
];
