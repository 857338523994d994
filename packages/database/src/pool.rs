//! Bounded connection pool with scoped checkout.
//!
//! A [`ConnectionPool`] owns a fixed number of connection slots. Callers
//! borrow one with [`ConnectionPool::acquire`], which waits until a slot is
//! free, and hand it back by dropping the returned [`PooledConnection`]. The
//! slot is released on every exit path, including `?` propagation,
//! cancellation and panics unwinding through the caller.
//!
//! Statements run through [`PooledConnection::track`]. If the tracking
//! future is dropped before the statement finishes (a caller deadline fired,
//! say), the server may still be executing it, so the connection is closed
//! instead of checked in. The next checkout of that slot opens a fresh
//! connection with the pool's connector.

use std::future::Future;
use std::ops::Deref;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use tokio::sync::{Semaphore, SemaphorePermit};

use crate::DbError;

type ConnectFuture<C> = Pin<Box<dyn Future<Output = Result<C, DbError>> + Send>>;
type Connector<C> = Box<dyn Fn() -> ConnectFuture<C> + Send + Sync>;

/// A fixed-size pool of connections of type `C`.
pub struct ConnectionPool<C> {
    idle: Mutex<Vec<C>>,
    permits: Semaphore,
    connect: Connector<C>,
    size: usize,
}

impl<C> ConnectionPool<C> {
    /// Creates a pool owning the given connections.
    ///
    /// `connect` opens a replacement whenever a slot has no idle connection,
    /// which happens after a connection was discarded mid-statement.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::EmptyPool`] if `connections` is empty.
    pub fn new<F, Fut>(connections: Vec<C>, connect: F) -> Result<Self, DbError>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<C, DbError>> + Send + 'static,
    {
        if connections.is_empty() {
            return Err(DbError::EmptyPool);
        }

        let size = connections.len();

        Ok(Self {
            idle: Mutex::new(connections),
            permits: Semaphore::new(size),
            connect: Box::new(move || -> ConnectFuture<C> { Box::pin(connect()) }),
            size,
        })
    }

    /// Total number of connection slots.
    #[must_use]
    pub const fn size(&self) -> usize {
        self.size
    }

    /// Number of slots not currently checked out.
    #[must_use]
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    /// Number of open connections waiting in the pool.
    ///
    /// Lower than [`available`](Self::available) while discarded slots
    /// wait to be reconnected.
    #[must_use]
    pub fn idle(&self) -> usize {
        self.idle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Checks out a connection, waiting until a slot is free.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::PoolClosed`] if the pool has been closed, or the
    /// connector's error if a discarded slot cannot be reopened. The slot
    /// stays usable and is retried on the next checkout.
    pub async fn acquire(&self) -> Result<PooledConnection<'_, C>, DbError> {
        let permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| DbError::PoolClosed)?;

        let idle = self
            .idle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop();

        let conn = match idle {
            Some(conn) => conn,
            None => {
                log::debug!("Reopening discarded pooled connection");
                (self.connect)().await?
            }
        };

        log::trace!(
            "Checked out pooled connection ({} of {} free)",
            self.available(),
            self.size
        );

        Ok(PooledConnection {
            conn: Some(conn),
            pool: self,
            in_flight: AtomicBool::new(false),
            _permit: permit,
        })
    }

    /// Stops handing out connections. Pending and future
    /// [`acquire`](Self::acquire) calls fail with [`DbError::PoolClosed`].
    pub fn close(&self) {
        self.permits.close();
    }

    fn check_in(&self, conn: C) {
        self.idle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(conn);
    }
}

/// A connection borrowed from a [`ConnectionPool`].
///
/// Dereferences to the underlying connection and returns it to the pool
/// when dropped, unless a [`track`](Self::track)ed statement was abandoned.
pub struct PooledConnection<'a, C> {
    conn: Option<C>,
    pool: &'a ConnectionPool<C>,
    in_flight: AtomicBool,
    // Released after `drop` has dealt with the connection.
    _permit: SemaphorePermit<'a>,
}

impl<C> PooledConnection<'_, C> {
    /// Awaits a statement running on this connection.
    ///
    /// If the returned future is dropped before `statement` completes, the
    /// connection is closed on release rather than reused.
    pub async fn track<F: Future>(&self, statement: F) -> F::Output {
        self.in_flight.store(true, Ordering::Release);
        let output = statement.await;
        self.in_flight.store(false, Ordering::Release);
        output
    }
}

impl<C> Deref for PooledConnection<'_, C> {
    type Target = C;

    fn deref(&self) -> &C {
        // Only `None` after `drop` has started.
        self.conn
            .as_ref()
            .unwrap_or_else(|| unreachable!("pooled connection used after release"))
    }
}

impl<C> Drop for PooledConnection<'_, C> {
    fn drop(&mut self) {
        let Some(conn) = self.conn.take() else {
            return;
        };

        if self.in_flight.load(Ordering::Acquire) {
            log::warn!("Discarding pooled connection with an abandoned statement");
            drop(conn);
        } else {
            self.pool.check_in(conn);
        }
    }
}
