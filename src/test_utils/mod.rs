//! Helpers for tests and demos that need a real backend.

use std::sync::LazyLock;
use tokio::runtime::Runtime;

/// One tokio runtime backing every blocking helper, so repeated setup calls
/// from the same test binary reuse it.
pub(crate) static SHARED_RUNTIME: LazyLock<Runtime> =
    LazyLock::new(|| Runtime::new().expect("failed to start tokio runtime"));

/// Embedded `PostgreSQL` provisioning
pub mod postgres;

pub use postgres::{PostgresFixture, shutdown_embedded_postgres, start_embedded_postgres};
