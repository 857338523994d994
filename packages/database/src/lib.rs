#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! `PostGIS` access for the OSM geocoder.
//!
//! Uses `switchy_database` raw parameterized queries (`query_raw_params()`)
//! for the spatial SQL, a small [`sql::SqlBuilder`] to assemble those
//! queries without interpolating values, and a bounded
//! [`pool::ConnectionPool`] so concurrent requests never share a
//! connection.

pub mod db;
pub mod pool;
pub mod queries;
pub mod sql;

/// Errors that can occur during database operations.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// Database query error.
    #[error("Database error: {0}")]
    Database(#[from] switchy_database::DatabaseError),

    /// Opening a connection failed.
    #[error("Connection error: {message}")]
    Connection {
        /// Description of what went wrong.
        message: String,
    },

    /// Data conversion error.
    #[error("Data conversion error: {message}")]
    Conversion {
        /// Description of what went wrong.
        message: String,
    },

    /// A pool was created without any connections.
    #[error("Connection pool must hold at least one connection")]
    EmptyPool,

    /// The pool no longer hands out connections.
    #[error("Connection pool is closed")]
    PoolClosed,
}
