use std::collections::HashMap;
use std::sync::Arc;

use quarry_api::entity::{EntityMetadataProvider, TypeDiscovery};
use quarry_api::error::CollaboratorError;
use quarry_api::filter::Filter;

use crate::config::{FilterConfig, QuarryConfig};
use crate::conversion::ConversionEngine;
use crate::criteria::CriteriaFilter;
use crate::error::EngineError;
use crate::registry::FilterRegistry;

type FilterFactory = Box<dyn Fn(&FilterConfig) -> Result<Box<dyn Filter>, CollaboratorError> + Send + Sync>;

/// Named filter factories referenced by `[[filters]]` entries.
#[derive(Default)]
pub struct FilterCatalog {
    factories: HashMap<String, FilterFactory>,
}

impl std::fmt::Debug for FilterCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<_> = self.factories.keys().collect();
        names.sort();
        f.debug_struct("FilterCatalog").field("factories", &names).finish()
    }
}

impl FilterCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog with the built-in `criteria` factory.
    pub fn standard(conversion: Arc<ConversionEngine>) -> Self {
        let mut catalog = Self::new();
        catalog.register("criteria", move |config| {
            let source = config
                .source
                .as_deref()
                .ok_or_else(|| CollaboratorError::config("criteria filter requires 'source'"))?;
            let filter: Box<dyn Filter> = Box::new(CriteriaFilter::new(&config.kind, source, conversion.clone()));
            Ok(filter)
        });
        catalog
    }

    /// Register a factory. A later registration under the same name wins.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn(&FilterConfig) -> Result<Box<dyn Filter>, CollaboratorError> + Send + Sync + 'static,
    {
        self.factories.insert(name.into(), Box::new(factory));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Build one prototype from its configuration entry.
    pub fn build(&self, config: &FilterConfig) -> Result<Box<dyn Filter>, EngineError> {
        let ctx = format!("filter '{}'", config.kind);
        let name = config.factory_name();
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| EngineError::Config(format!("{ctx}: unknown filter factory '{name}'")))?;
        let filter = factory(config).map_err(|e| EngineError::Collaborator(e).with_context(&ctx))?;
        if filter.kind() != config.kind {
            tracing::warn!(
                configured = %config.kind,
                actual = filter.kind(),
                factory = name,
                "filter factory produced a different kind"
            );
        }
        Ok(filter)
    }
}

/// Build and initialize a registry from a parsed configuration.
///
/// 1. Namespaces are taken as configured.
/// 2. Every `[[filters]]` entry is built through `catalog`, in order.
/// 3. `set_filters()` then `initialize()`.
pub fn bootstrap(
    config: &QuarryConfig,
    catalog: &FilterCatalog,
    discovery: Arc<dyn TypeDiscovery>,
    metadata: Arc<dyn EntityMetadataProvider>,
) -> Result<FilterRegistry, EngineError> {
    let mut registry = FilterRegistry::new(discovery, metadata);
    registry.set_namespaces(config.namespaces.clone());

    let mut prototypes = Vec::with_capacity(config.filters.len());
    for filter_cfg in &config.filters {
        let filter = catalog.build(filter_cfg)?;
        tracing::info!(kind = %filter_cfg.kind, factory = filter_cfg.factory_name(), "created filter prototype");
        prototypes.push(filter);
    }

    registry.set_filters(prototypes)?;
    registry.initialize()?;
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use quarry_api::entity::{ColumnDetail, EntityDetail, SourceKind};
    use quarry_api::sql::SqlType;

    use super::*;
    use crate::catalog::{EntityCatalog, TypeCatalog};
    use crate::criteria::SqlParams;
    use crate::registry::RegistryState;

    const CONFIG: &str = r#"
namespaces = ["app.model"]

[[filters]]
kind = "customers"
factory = "criteria"
source = "app.model.Customer"
"#;

    fn collaborators() -> (Arc<TypeCatalog>, Arc<EntityCatalog>) {
        let detail = EntityDetail::new(SourceKind::new("app.model.Customer"), "customers")
            .column(ColumnDetail::new("id", "id", SqlType::Integer))
            .column(ColumnDetail::new("name", "name", SqlType::VarChar));
        (
            Arc::new(TypeCatalog::new().with("app.model.Customer")),
            Arc::new(EntityCatalog::new().with(detail)),
        )
    }

    #[test]
    fn bootstraps_criteria_filters_from_config() {
        let config = QuarryConfig::parse(CONFIG).unwrap();
        let conversion = Arc::new(ConversionEngine::from_config(&config.conversion));
        let (types, entities) = collaborators();

        let registry = bootstrap(&config, &FilterCatalog::standard(conversion), types, entities).unwrap();
        assert_eq!(registry.state(), RegistryState::Initialized);
        assert_eq!(registry.filter_kinds(), ["customers"]);

        let mut filter = registry.new_filter_as::<CriteriaFilter>("customers").unwrap();
        filter.eq("id", "7").unwrap();
        let mut params = SqlParams::default();
        assert_eq!(filter.to_sql(&mut params), "id = ?");
        assert_eq!(params.values, vec![quarry_api::value::Value::I32(7)]);
    }

    #[test]
    fn unknown_factory_is_a_config_error() {
        let config = QuarryConfig::parse(
            r#"
[[filters]]
kind = "geo"
"#,
        )
        .unwrap();
        let (types, entities) = collaborators();

        let err = bootstrap(&config, &FilterCatalog::new(), types, entities).unwrap_err();
        assert!(matches!(err, EngineError::Config(ref m) if m.contains("unknown filter factory 'geo'")));
    }

    #[test]
    fn factory_errors_carry_the_filter_kind() {
        let config = QuarryConfig::parse(
            r#"
[[filters]]
kind = "loose"
factory = "criteria"
"#,
        )
        .unwrap();
        let catalog = FilterCatalog::standard(Arc::new(ConversionEngine::default()));
        let (types, entities) = collaborators();

        let err = bootstrap(&config, &catalog, types, entities).unwrap_err();
        assert!(err.to_string().contains("filter 'loose': criteria filter requires 'source'"));
    }

    #[test]
    fn custom_factories_are_used_by_name() {
        let conversion = Arc::new(ConversionEngine::default());
        let mut catalog = FilterCatalog::new();
        catalog.register("by_name", move |cfg| {
            let filter: Box<dyn Filter> =
                Box::new(CriteriaFilter::new(&cfg.kind, "app.model.Customer", conversion.clone()));
            Ok(filter)
        });
        assert!(catalog.contains("by_name"));

        let cfg = FilterConfig {
            kind: "people".into(),
            factory: Some("by_name".into()),
            source: None,
            options: None,
        };
        assert_eq!(catalog.build(&cfg).unwrap().kind(), "people");
    }
}
