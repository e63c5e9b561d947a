//! Request-scoped resources with guaranteed release.
//!
//! A [`ScopedProvider`] hands one freshly acquired resource to one handler
//! invocation and takes it back afterwards. Release lives in the `Drop` impl
//! of [`Scoped`], so it runs on every exit path: normal return, returned
//! error, panic, and a future dropped mid-flight.
//!
//! The lifecycle is strictly linear (`unacquired → acquired → released`). A
//! scope is never reused and acquisition is never retried.
//!
//! ```rust,ignore
//! let sessions = SessionProvider::new(SqliteSource::new(pool));
//! let count: i64 = sessions.provide(|conn| {
//!     conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))
//!         .map_err(ApiError::from)
//! })?;
//! ```

use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use r2d2::PooledConnection;
use r2d2_sqlite::SqliteConnectionManager;
use thiserror::Error;

use crate::DbPool;

/// The backing store could not hand out a resource.
#[derive(Debug, Clone, Error)]
#[error("resource unavailable: {reason}")]
pub struct ResourceUnavailable {
    /// Human-readable cause reported by the source.
    pub reason: String,
}

impl ResourceUnavailable {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// A factory for per-request resources.
pub trait ResourceSource: Send + Sync + 'static {
    /// The handle given to a handler.
    type Resource: Send + 'static;

    /// Error reported when giving a handle back fails.
    type ReleaseError: fmt::Display;

    /// Creates a new resource.
    fn acquire(&self) -> Result<Self::Resource, ResourceUnavailable>;

    /// Gives a resource back. Called exactly once per acquired resource.
    fn release(&self, resource: Self::Resource) -> Result<(), Self::ReleaseError>;
}

/// An acquired resource that is released when the guard is dropped.
pub struct Scoped<S: ResourceSource> {
    source: Arc<S>,
    resource: Option<S::Resource>,
}

impl<S: ResourceSource> Deref for Scoped<S> {
    type Target = S::Resource;

    fn deref(&self) -> &Self::Target {
        match &self.resource {
            Some(resource) => resource,
            None => unreachable!("scoped resource is only taken by drop"),
        }
    }
}

impl<S: ResourceSource> DerefMut for Scoped<S> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        match &mut self.resource {
            Some(resource) => resource,
            None => unreachable!("scoped resource is only taken by drop"),
        }
    }
}

impl<S: ResourceSource> Drop for Scoped<S> {
    fn drop(&mut self) {
        let Some(resource) = self.resource.take() else {
            return;
        };

        // A failed release is logged and never propagated: it must not mask
        // whatever the handler already returned.
        match self.source.release(resource) {
            Ok(()) => tracing::trace!("scoped resource released"),
            Err(e) => tracing::warn!(error = %e, "failed to release scoped resource"),
        }
    }
}

impl<S: ResourceSource> fmt::Debug for Scoped<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scoped")
            .field("held", &self.resource.is_some())
            .finish()
    }
}

/// Supplies request-scoped resources from a [`ResourceSource`].
///
/// Cloning is cheap and clones share the same source.
pub struct ScopedProvider<S> {
    source: Arc<S>,
}

impl<S> Clone for ScopedProvider<S> {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
        }
    }
}

impl<S: ResourceSource> ScopedProvider<S> {
    pub fn new(source: S) -> Self {
        Self {
            source: Arc::new(source),
        }
    }

    /// The underlying source.
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Acquires a resource wrapped in a guard that releases it on drop.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceUnavailable`] if the source cannot produce one.
    pub fn acquire(&self) -> Result<Scoped<S>, ResourceUnavailable> {
        let resource = self.source.acquire()?;
        Ok(Scoped {
            source: Arc::clone(&self.source),
            resource: Some(resource),
        })
    }

    /// Runs `handler` with a freshly acquired resource and releases it before
    /// returning.
    ///
    /// If acquisition fails the handler never runs. The handler's result,
    /// success or error, is returned unchanged after the release.
    pub fn provide<T, E, F>(&self, handler: F) -> Result<T, E>
    where
        F: FnOnce(&mut S::Resource) -> Result<T, E>,
        E: From<ResourceUnavailable>,
    {
        let mut scope = self.acquire()?;
        let outcome = handler(&mut *scope);
        drop(scope);
        outcome
    }
}

/// [`ResourceSource`] backed by the SQLite connection pool.
///
/// Release rolls back any transaction the handler left open, then returns
/// the connection to the pool.
#[derive(Clone)]
pub struct SqliteSource {
    pool: DbPool,
}

impl SqliteSource {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

impl ResourceSource for SqliteSource {
    type Resource = PooledConnection<SqliteConnectionManager>;
    type ReleaseError = rusqlite::Error;

    fn acquire(&self) -> Result<Self::Resource, ResourceUnavailable> {
        let conn = self.pool.get().map_err(|e| {
            tracing::warn!(error = %e, "database session unavailable");
            ResourceUnavailable::new(e.to_string())
        })?;

        // A failed release rollback returns the connection to the pool with
        // its transaction still open. Clear it before anyone else sees it.
        if !conn.is_autocommit() {
            tracing::warn!("pooled connection has a stale transaction, rolling back");
            conn.execute_batch("ROLLBACK").map_err(|e| {
                tracing::error!(error = %e, "stale transaction could not be rolled back");
                ResourceUnavailable::new(format!("stale transaction: {}", e))
            })?;
        }

        Ok(conn)
    }

    fn release(&self, conn: Self::Resource) -> Result<(), Self::ReleaseError> {
        if !conn.is_autocommit() {
            tracing::debug!("rolling back transaction left open by handler");
            conn.execute_batch("ROLLBACK")?;
        }
        Ok(())
    }
}

/// Request-scoped database sessions.
pub type SessionProvider = ScopedProvider<SqliteSource>;
