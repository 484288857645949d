#![cfg(feature = "test-utils-postgres")]

use sql_broker::prelude::*;
use sql_broker::test_utils::{shutdown_embedded_postgres, start_embedded_postgres};
use tokio::runtime::Runtime;

#[test]
fn test1_ledger_lifecycle() -> Result<(), Box<dyn std::error::Error>> {
    let embedded = start_embedded_postgres("ledger_lifecycle")?;

    let rt = Runtime::new()?;
    rt.block_on(async {
        let mut registry = ConnectionRegistry::with_configs([embedded.config.clone()]);
        let db = registry.connection(None).await?;

        SqlDiff::create_table(db).await?;
        // Safe to repeat on every startup.
        SqlDiff::create_table(db).await?;

        let first = SqlDiff::record(db, "diff010_widgets.sql").await?;
        assert!(first.is_some());
        assert_eq!(SqlDiff::record(db, "diff010_widgets.sql").await?, None);

        SqlDiff::record(db, "diff005_seed.sql").await?;
        SqlDiff::record(db, "diff020_backfill.sql").await?;

        // Ordered by the numeric token in the name, not by insertion order.
        let pending = SqlDiff::scan_unapplied(db).await?;
        let names: Vec<&str> = pending.iter().map(|d| d.sql_diff_name.as_str()).collect();
        assert_eq!(
            names,
            [
                "diff005_seed.sql",
                "diff010_widgets.sql",
                "diff020_backfill.sql"
            ]
        );
        assert!(pending.iter().all(|d| d.applied_dttm.is_none()));
        assert!(pending.iter().all(|d| d.sql_diff_id > 0));

        assert_eq!(SqlDiff::mark_applied(db, "diff005_seed.sql").await?, 1);
        assert_eq!(SqlDiff::mark_applied(db, "diff999_missing.sql").await?, 0);

        let seed = SqlDiff::get_by_name(db, "diff005_seed.sql")
            .await?
            .ok_or("diff005 vanished after mark_applied")?;
        assert!(seed.applied_dttm.is_some());

        assert_eq!(SqlDiff::scan_unapplied(db).await?.len(), 2);
        assert_eq!(SqlDiff::scan(db).await?.len(), 3);

        Ok::<(), Box<dyn std::error::Error>>(())
    })?;

    shutdown_embedded_postgres(embedded);
    Ok(())
}
