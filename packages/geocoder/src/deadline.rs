//! Per-request deadlines.
//!
//! A [`Deadline`] is chosen by the caller and threaded through the parser
//! call and every database call of one request, so a single slow step
//! cannot hold the request open indefinitely.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;

/// The instant by which a request must finish, or no limit at all.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Deadline(Option<Instant>);

/// Returned when a deadline passes before the guarded work completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Deadline exceeded")]
pub struct DeadlineExceeded;

impl Deadline {
    /// A deadline that never expires.
    #[must_use]
    pub const fn none() -> Self {
        Self(None)
    }

    /// A deadline `timeout` from now.
    #[must_use]
    pub fn after(timeout: Duration) -> Self {
        Self(Some(Instant::now() + timeout))
    }

    /// A deadline at a fixed instant.
    #[must_use]
    pub const fn at(instant: Instant) -> Self {
        Self(Some(instant))
    }

    /// Time left before expiry, `None` if unbounded.
    #[must_use]
    pub fn remaining(&self) -> Option<Duration> {
        self.0
            .map(|instant| instant.saturating_duration_since(Instant::now()))
    }

    /// Whether the deadline has already passed.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.0.is_some_and(|instant| Instant::now() >= instant)
    }

    /// Runs `future` to completion or until the deadline passes.
    ///
    /// # Errors
    ///
    /// Returns [`DeadlineExceeded`] if the deadline passes first.
    pub async fn run<F: Future>(self, future: F) -> Result<F::Output, DeadlineExceeded> {
        match self.0 {
            Some(instant) => tokio::time::timeout_at(instant, future)
                .await
                .map_err(|_| DeadlineExceeded),
            None => Ok(future.await),
        }
    }
}
