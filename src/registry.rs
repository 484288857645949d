use std::collections::HashMap;
use std::collections::hash_map::Entry;

use tracing::debug;

use crate::config::BackendConfig;
use crate::connection::DbConnection;
use crate::error::DbError;

/// Per-context cache of [`DbConnection`]s, keyed by schema name.
///
/// Each execution context (request handler, worker task) owns its own
/// registry, so no connection is ever shared between contexts and no
/// locking is involved. Dropping the registry closes every cached
/// connection.
///
/// ```rust,no_run
/// use sql_broker::prelude::*;
///
/// # async fn demo(config: BackendConfig) -> Result<(), DbError> {
/// let mut registry = ConnectionRegistry::new();
/// registry.register(config);
/// let db = registry.connection(None).await?;
/// let rows = db.query("SELECT * FROM widgets WHERE quantity > ?", &[SqlValue::Int(0)]).await?;
/// # let _ = rows;
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct ConnectionRegistry {
    configs: HashMap<String, BackendConfig>,
    live: HashMap<String, DbConnection>,
}

impl ConnectionRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with `configs`.
    pub fn with_configs(configs: impl IntoIterator<Item = BackendConfig>) -> Self {
        let mut registry = Self::new();
        for config in configs {
            registry.register(config);
        }
        registry
    }

    /// Register (or replace) the configuration for a schema. Replacing a
    /// schema drops its cached connection so the new settings take effect
    /// on next use.
    pub fn register(&mut self, config: BackendConfig) {
        let schema = config.schema.clone();
        if self.live.remove(&schema).is_some() {
            debug!(schema = %schema, "dropped cached connection for re-registered schema");
        }
        self.configs.insert(schema, config);
    }

    /// Names of every registered schema, in no particular order.
    pub fn schemas(&self) -> impl Iterator<Item = &str> {
        self.configs.keys().map(String::as_str)
    }

    /// Whether a cached connection currently exists for `schema`.
    #[must_use]
    pub fn is_cached(&self, schema: &str) -> bool {
        self.live.contains_key(schema)
    }

    /// The cached connection for `schema`, dialing and caching one on first
    /// use. Passing `None` is allowed only while exactly one schema is
    /// registered.
    ///
    /// A returned connection may still be disconnected under the covers
    /// (the dial is retried per statement); this call only fails on
    /// resolution problems.
    ///
    /// # Errors
    ///
    /// [`DbError::AmbiguousSchema`] when `schema` is `None` and the
    /// registry holds anything other than exactly one config;
    /// [`DbError::Config`] when the named schema is not registered.
    pub async fn connection(&mut self, schema: Option<&str>) -> Result<&mut DbConnection, DbError> {
        let schema = self.resolve(schema)?;
        match self.live.entry(schema) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(slot) => {
                let config = self
                    .configs
                    .get(slot.key())
                    .cloned()
                    .ok_or_else(|| config_missing(slot.key()))?;
                debug!(schema = %slot.key(), "dialing and caching new connection");
                let conn = DbConnection::connect(config).await;
                Ok(slot.insert(conn))
            }
        }
    }

    /// A new connection that bypasses and never enters the cache. The
    /// caller owns it outright; dropping it closes it.
    ///
    /// # Errors
    ///
    /// Same resolution errors as [`ConnectionRegistry::connection`].
    pub async fn fresh_connection(&self, schema: Option<&str>) -> Result<DbConnection, DbError> {
        let schema = self.resolve(schema)?;
        let config = self
            .configs
            .get(&schema)
            .cloned()
            .ok_or_else(|| config_missing(&schema))?;
        debug!(schema = %schema, "dialing uncached connection");
        Ok(DbConnection::connect(config).await)
    }

    /// Drop the cached connection for `schema`, if any. The config stays
    /// registered; the next [`ConnectionRegistry::connection`] call redials.
    pub fn close(&mut self, schema: &str) -> bool {
        let closed = self.live.remove(schema).is_some();
        if closed {
            debug!(schema = %schema, "closed cached connection");
        }
        closed
    }

    /// Drop every cached connection. Configs stay registered.
    pub fn close_all(&mut self) {
        if !self.live.is_empty() {
            debug!(count = self.live.len(), "closing all cached connections");
            self.live.clear();
        }
    }

    fn resolve(&self, schema: Option<&str>) -> Result<String, DbError> {
        match schema {
            Some(name) => {
                if self.configs.contains_key(name) {
                    Ok(name.to_string())
                } else {
                    Err(config_missing(name))
                }
            }
            None => {
                let mut names = self.configs.keys();
                match (names.next(), names.next()) {
                    (Some(only), None) => Ok(only.clone()),
                    _ => Err(DbError::AmbiguousSchema(self.configs.len())),
                }
            }
        }
    }
}

fn config_missing(schema: &str) -> DbError {
    DbError::Config(format!("no configuration registered for schema {schema}"))
}

#[cfg(all(test, feature = "postgres"))]
mod tests {
    use super::*;
    use crate::types::BackendKind;

    // Nothing listens on port 1, so dials fail fast and tests stay local.
    fn config_for(schema: &str) -> BackendConfig {
        BackendConfig::new(BackendKind::Postgres, "127.0.0.1", schema).with_port(1)
    }

    #[tokio::test]
    async fn default_schema_resolves_when_unambiguous() {
        let mut registry = ConnectionRegistry::with_configs([config_for("alpha")]);
        let conn = registry.connection(None).await.unwrap();
        assert_eq!(conn.schema(), "alpha");
    }

    #[tokio::test]
    async fn default_schema_refused_with_two_registered() {
        let mut registry =
            ConnectionRegistry::with_configs([config_for("alpha"), config_for("beta")]);
        let err = registry.connection(None).await.unwrap_err();
        assert!(matches!(err, DbError::AmbiguousSchema(2)));
    }

    #[tokio::test]
    async fn default_schema_refused_when_empty() {
        let mut registry = ConnectionRegistry::new();
        let err = registry.connection(None).await.unwrap_err();
        assert!(matches!(err, DbError::AmbiguousSchema(0)));
    }

    #[tokio::test]
    async fn unknown_schema_is_a_config_error() {
        let mut registry = ConnectionRegistry::with_configs([config_for("alpha")]);
        let err = registry.connection(Some("zeta")).await.unwrap_err();
        assert!(matches!(err, DbError::Config(_)));
        assert!(err.to_string().contains("zeta"));
    }

    #[tokio::test]
    async fn connections_are_cached_per_schema() {
        let mut registry = ConnectionRegistry::with_configs([config_for("alpha")]);
        let first = std::ptr::from_ref(registry.connection(Some("alpha")).await.unwrap()).addr();
        let second = std::ptr::from_ref(registry.connection(Some("alpha")).await.unwrap()).addr();
        assert_eq!(first, second);
        assert!(registry.is_cached("alpha"));
    }

    #[tokio::test]
    async fn registries_do_not_share_connections() {
        let mut first_registry = ConnectionRegistry::with_configs([config_for("alpha")]);
        let mut second_registry = ConnectionRegistry::with_configs([config_for("alpha")]);
        let first = std::ptr::from_ref(first_registry.connection(None).await.unwrap()).addr();
        let second = std::ptr::from_ref(second_registry.connection(None).await.unwrap()).addr();
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn fresh_connections_bypass_the_cache() {
        let registry = ConnectionRegistry::with_configs([config_for("alpha")]);
        let conn = registry.fresh_connection(None).await.unwrap();
        assert_eq!(conn.schema(), "alpha");
        assert!(!registry.is_cached("alpha"));
    }

    #[tokio::test]
    async fn close_drops_only_the_cached_connection() {
        let mut registry = ConnectionRegistry::with_configs([config_for("alpha")]);
        registry.connection(None).await.unwrap();
        assert!(registry.close("alpha"));
        assert!(!registry.is_cached("alpha"));
        assert!(!registry.close("alpha"));
        // Config survives; the schema can be dialed again.
        assert!(registry.connection(None).await.is_ok());
    }

    #[tokio::test]
    async fn re_registering_drops_the_cached_connection() {
        let mut registry = ConnectionRegistry::with_configs([config_for("alpha")]);
        registry.connection(None).await.unwrap();
        registry.register(config_for("alpha").with_port(2));
        assert!(!registry.is_cached("alpha"));
    }
}
