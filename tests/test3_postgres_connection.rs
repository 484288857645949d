#![cfg(feature = "test-utils-postgres")]

use std::time::Duration;

use sql_broker::prelude::*;
use sql_broker::test_utils::{shutdown_embedded_postgres, start_embedded_postgres};
use tokio::runtime::Runtime;

async fn backend_pid(db: &mut DbConnection) -> Result<i64, Box<dyn std::error::Error>> {
    let row = db
        .get("SELECT pg_backend_pid()", &[])
        .await?
        .ok_or("no pid row")?;
    let pid = row
        .get_by_index(0)
        .and_then(SqlValue::as_int)
        .ok_or("pid is not an integer")?;
    Ok(pid)
}

#[test]
fn test3_connection_reuse_and_recycling() -> Result<(), Box<dyn std::error::Error>> {
    let embedded = start_embedded_postgres("conn_reuse")?;

    let rt = Runtime::new()?;
    rt.block_on(async {
        let schema = embedded.config.schema.clone();
        let mut registry = ConnectionRegistry::with_configs([embedded.config.clone()]);

        // The cached session survives across lookups: same backend pid.
        let first_pid = backend_pid(registry.connection(None).await?).await?;
        let second_pid = backend_pid(registry.connection(Some(schema.as_str())).await?).await?;
        assert_eq!(first_pid, second_pid);

        // A fresh connection is its own session and never enters the cache.
        let mut fresh = registry.fresh_connection(None).await?;
        assert_ne!(backend_pid(&mut fresh).await?, first_pid);
        assert!(registry.is_cached(&schema));
        fresh.close();

        // close() drops the cached session; the next lookup dials a new one.
        assert!(registry.close(&schema));
        let redialed_pid = backend_pid(registry.connection(None).await?).await?;
        assert_ne!(redialed_pid, first_pid);

        // A connection idle past its cutoff is replaced on next use.
        let mut short_lived = DbConnection::connect(
            embedded
                .config
                .clone()
                .with_max_idle(Duration::from_millis(50)),
        )
        .await;
        let before = backend_pid(&mut short_lived).await?;
        tokio::time::sleep(Duration::from_millis(200)).await;
        let after = backend_pid(&mut short_lived).await?;
        assert_ne!(before, after);
        short_lived.close();

        // Unknown schemas and ambiguous defaults are refused.
        assert!(matches!(
            registry.connection(Some("zeta")).await.unwrap_err(),
            DbError::Config(_)
        ));
        registry
            .register(BackendConfig::new(BackendKind::Postgres, "127.0.0.1", "other").with_port(1));
        assert!(matches!(
            registry.connection(None).await.unwrap_err(),
            DbError::AmbiguousSchema(2)
        ));

        Ok::<(), Box<dyn std::error::Error>>(())
    })?;

    shutdown_embedded_postgres(embedded);
    Ok(())
}
