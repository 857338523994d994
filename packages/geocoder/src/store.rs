//! Query execution seam between the resolvers and the database.

use async_trait::async_trait;
use osm_geocoder_database::DbError;
use osm_geocoder_database::db::PostgisPool;
use osm_geocoder_database::queries;
use osm_geocoder_models::{Candidate, NearbyMatch};
use switchy_database::Database;

use crate::ring::RingQuery;
use crate::strategy::SearchQuery;

/// Executes geocoder statements.
#[async_trait]
pub trait AddressStore: Send + Sync {
    /// Runs a forward search, returning rows in statement order.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the statement fails.
    async fn search(&self, query: &SearchQuery) -> Result<Vec<Candidate>, DbError>;

    /// Runs a ring query, returning the raw (ungrouped) rows nearest first.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the statement fails.
    async fn nearby(&self, query: &RingQuery) -> Result<Vec<NearbyMatch>, DbError>;
}

/// [`AddressStore`] running against a pool of `PostGIS` connections.
///
/// Each call checks out one connection for the duration of the statement.
/// A statement abandoned by its caller (deadline expiry) takes its
/// connection with it, so the next caller never queues behind it.
pub struct PostgisStore {
    pool: PostgisPool,
}

impl PostgisStore {
    /// Wraps an open pool.
    #[must_use]
    pub const fn new(pool: PostgisPool) -> Self {
        Self { pool }
    }

    /// The underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &PostgisPool {
        &self.pool
    }
}

#[async_trait]
impl AddressStore for PostgisStore {
    async fn search(&self, query: &SearchQuery) -> Result<Vec<Candidate>, DbError> {
        let conn = self.pool.acquire().await?;
        let db: &dyn Database = &**conn;
        conn.track(queries::fetch_candidates(db, &query.sql, query.has_center()))
            .await
    }

    async fn nearby(&self, query: &RingQuery) -> Result<Vec<NearbyMatch>, DbError> {
        let conn = self.pool.acquire().await?;
        let db: &dyn Database = &**conn;
        conn.track(queries::fetch_nearby(db, &query.sql)).await
    }
}
