// Providers - Pluggable genesis, database and metrics sources of the node
use super::metrics::NodeMetrics;
use crate::config::{InstrumentationConfig, NodeConfig};
use crate::genesis::{GenesisDoc, GenesisError};
use crate::storage::{DatabaseError, MemDb};
use crate::types::ChainId;
use std::sync::Arc;

/// Loads the genesis document the node starts from
pub type GenesisDocProvider = fn(&NodeConfig) -> Result<GenesisDoc, GenesisError>;

/// Opens the database named `id` for the node
pub type DbProvider = fn(&DbContext) -> Result<MemDb, DatabaseError>;

/// Builds the metrics of a chain
pub type MetricsProvider = fn(&InstrumentationConfig, &ChainId) -> Arc<NodeMetrics>;

/// Arguments handed to a [`DbProvider`]
#[derive(Debug, Clone, Copy)]
pub struct DbContext<'a> {
    pub id: &'a str,
    pub config: &'a NodeConfig,
}

/// Reads the genesis file of `config`
pub fn default_genesis_doc_provider(config: &NodeConfig) -> Result<GenesisDoc, GenesisError> {
    GenesisDoc::from_file(&config.genesis_file())
}

/// Fresh in-memory database per id
pub fn default_db_provider(_ctx: &DbContext) -> Result<MemDb, DatabaseError> {
    Ok(MemDb::new())
}

/// Counting metrics when instrumentation is enabled, no-op otherwise
pub fn default_metrics_provider(config: &InstrumentationConfig, chain_id: &ChainId) -> Arc<NodeMetrics> {
    if config.enabled {
        Arc::new(NodeMetrics::new(config.namespace.clone(), chain_id.clone(), true))
    } else {
        Arc::new(NodeMetrics::nop(chain_id.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_metrics_follow_instrumentation() {
        let mut config = NodeConfig::test_config();
        let chain_id = ChainId::new("p");
        assert!(default_metrics_provider(&config.instrumentation, &chain_id).is_enabled());

        config.instrumentation.enabled = false;
        assert!(!default_metrics_provider(&config.instrumentation, &chain_id).is_enabled());
    }

    #[test]
    fn test_default_db_provider_is_fresh() {
        let config = NodeConfig::test_config();
        let ctx = DbContext {
            id: "blockstore",
            config: &config,
        };
        let a = default_db_provider(&ctx).unwrap();
        a.put(b"k", b"v").unwrap();
        let b = default_db_provider(&ctx).unwrap();
        assert!(b.is_empty());
    }
}
