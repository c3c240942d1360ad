//! Dialect strategy factory
//!
//! Resolves a dialect identifier to a shared [`DdlStrategy`]. Registered
//! strategies are consulted first, then the built-in ones. Each resolved
//! strategy is cached per dialect for the lifetime of the factory.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::debug;

use crate::config::GeneratorConfig;
use crate::error::{DdlError, Result};
use crate::sql::dialect::{
    DdlStrategy, DmStrategy, H2Strategy, MySqlStrategy, OracleStrategy, PostgresStrategy,
    TdengineStrategy,
};
use crate::sql::typemap::TypeRule;
use crate::types::{Dialect, Field};

/// Dialects with a built-in strategy
pub const BUILTIN_DIALECTS: [Dialect; 6] = [
    Dialect::Mysql,
    Dialect::Postgresql,
    Dialect::Oracle,
    Dialect::H2,
    Dialect::Dm,
    Dialect::Tdengine,
];

/// Resolves and caches dialect strategies
pub struct StrategyFactory {
    config: GeneratorConfig,
    registered: Vec<Arc<dyn DdlStrategy>>,
    type_rules: HashMap<Dialect, Vec<Arc<dyn TypeRule>>>,
    cache: RwLock<HashMap<Dialect, Arc<dyn DdlStrategy>>>,
}

impl StrategyFactory {
    /// Factory with built-in strategies only
    pub fn new(config: GeneratorConfig) -> Self {
        Self::builder(config).build()
    }

    pub fn builder(config: GeneratorConfig) -> StrategyFactoryBuilder {
        StrategyFactoryBuilder {
            config,
            registered: Vec::new(),
            type_rules: HashMap::new(),
        }
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Resolve a dialect name, case-insensitively
    pub fn resolve(&self, dialect: &str) -> Result<Arc<dyn DdlStrategy>> {
        self.strategy(dialect.parse()?)
    }

    /// Resolve a dialect, building and caching its strategy on first use
    pub fn strategy(&self, dialect: Dialect) -> Result<Arc<dyn DdlStrategy>> {
        if let Some(strategy) = self
            .cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&dialect)
        {
            return Ok(Arc::clone(strategy));
        }

        let strategy = self
            .registered
            .iter()
            .find(|s| s.supports(dialect))
            .cloned()
            .or_else(|| self.builtin(dialect))
            .ok_or_else(|| DdlError::unsupported_dialect(dialect.as_str()))?;

        debug!(%dialect, "Caching DDL strategy");
        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        Ok(Arc::clone(cache.entry(dialect).or_insert(strategy)))
    }

    /// Dialects this factory can serve, in identifier order
    pub fn supported_dialects(&self) -> Vec<Dialect> {
        Dialect::ALL
            .into_iter()
            .filter(|d| {
                BUILTIN_DIALECTS.contains(d) || self.registered.iter().any(|s| s.supports(*d))
            })
            .collect()
    }

    fn builtin(&self, dialect: Dialect) -> Option<Arc<dyn DdlStrategy>> {
        let config = self.config.clone();
        let rules = self.type_rules.get(&dialect).cloned().unwrap_or_default();
        let strategy: Arc<dyn DdlStrategy> = match dialect {
            Dialect::Mysql => Arc::new(MySqlStrategy::with_rules(config, rules)),
            Dialect::Postgresql => Arc::new(PostgresStrategy::with_rules(config, rules)),
            Dialect::Oracle => Arc::new(OracleStrategy::with_rules(config, rules)),
            Dialect::H2 => Arc::new(H2Strategy::with_rules(config, rules)),
            Dialect::Dm => Arc::new(DmStrategy::with_rules(config, rules)),
            Dialect::Tdengine => Arc::new(TdengineStrategy::with_rules(config, rules)),
            Dialect::Sqlserver | Dialect::Sqlite => return None,
        };
        Some(strategy)
    }
}

impl Default for StrategyFactory {
    fn default() -> Self {
        Self::new(GeneratorConfig::default())
    }
}

/// Builder for StrategyFactory
pub struct StrategyFactoryBuilder {
    config: GeneratorConfig,
    registered: Vec<Arc<dyn DdlStrategy>>,
    type_rules: HashMap<Dialect, Vec<Arc<dyn TypeRule>>>,
}

impl StrategyFactoryBuilder {
    /// Register an external strategy; it takes precedence over built-ins
    pub fn register(mut self, strategy: Arc<dyn DdlStrategy>) -> Self {
        debug!(dialect = %strategy.dialect(), "Registering DDL strategy");
        self.registered.push(strategy);
        self
    }

    /// Add a custom type rule to a built-in dialect's mapping chain
    pub fn type_rule<F>(mut self, dialect: Dialect, rule: F) -> Self
    where
        F: Fn(&Field) -> Option<String> + Send + Sync + 'static,
    {
        self.type_rules
            .entry(dialect)
            .or_default()
            .push(Arc::new(rule));
        self
    }

    pub fn build(self) -> StrategyFactory {
        StrategyFactory {
            config: self.config,
            registered: self.registered,
            type_rules: self.type_rules,
            cache: RwLock::new(HashMap::new()),
        }
    }
}
