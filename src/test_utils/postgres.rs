use postgresql_embedded::PostgreSQL;

use super::SHARED_RUNTIME;
use crate::config::BackendConfig;
use crate::connection::{DatabaseExecutor, DbConnection};
use crate::types::BackendKind;

/// A running embedded `PostgreSQL` server plus a config pointing at it.
pub struct PostgresFixture {
    pub server: PostgreSQL,
    /// Ready-to-register config carrying the embedded server's credentials.
    pub config: BackendConfig,
}

/// Start an embedded `PostgreSQL` server and create `schema` on it.
///
/// Synchronous on purpose: callers run it at the top of a `#[test]` before
/// entering their own runtime.
///
/// # Errors
/// Returns an error if the server cannot be set up or started, if the
/// database cannot be created, or if the post-start connectivity check fails.
pub fn start_embedded_postgres(
    schema: &str,
) -> Result<PostgresFixture, Box<dyn std::error::Error>> {
    SHARED_RUNTIME.block_on(async {
        let mut server = PostgreSQL::default();

        // Bundled binaries, so no download races between parallel tests.
        server.setup().await?;
        server.start().await?;
        server.create_database(schema).await?;

        let settings = server.settings();
        let config = BackendConfig::new(BackendKind::Postgres, settings.host.clone(), schema)
            .with_port(settings.port)
            .with_credentials(settings.username.clone(), settings.password.clone());

        println!("embedded postgres for {schema} on port {}", settings.port);

        // Connectivity check through the crate's own dialer.
        let mut conn = DbConnection::connect(config.clone()).await;
        conn.query("SELECT 1", &[]).await?;

        Ok(PostgresFixture { server, config })
    })
}

/// Stop a previously started embedded server. Shutdown failures are ignored;
/// the instance dies with the process anyway.
pub fn shutdown_embedded_postgres(fixture: PostgresFixture) {
    let PostgresFixture { server, .. } = fixture;
    SHARED_RUNTIME.block_on(async move {
        let _ = server.stop().await;
    });
}
