//! Database layer for Atelier.
//!
//! Provides SQLite connection pooling (via `r2d2`), embedded SQL migrations,
//! and request-scoped sessions. Handlers never touch the pool directly: they
//! receive a connection through [`SessionProvider`], which guarantees the
//! connection goes back to the pool exactly once, whatever the handler does.
//!
//! # Design decisions
//!
//! - **SQLite with WAL mode**: no external database process required.
//! - **`r2d2` connection pool**: bounded connection reuse with an acquire
//!   timeout, so an exhausted pool surfaces as [`ResourceUnavailable`]
//!   instead of a hung request.
//! - **Embedded migrations**: SQL files are compiled into the binary via
//!   `include_str!`.

mod migrations;
mod pool;
pub mod session;

pub use migrations::{run_migrations, MigrationError};
pub use pool::{create_pool, DbPool, DbRuntimeSettings, PoolError};
pub use session::{
    ResourceSource, ResourceUnavailable, Scoped, ScopedProvider, SessionProvider, SqliteSource,
};
