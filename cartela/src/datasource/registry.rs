use std::collections::BTreeMap;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

use ahash::AHashMap;
use log::debug;

use super::{Datasource, DatasourceError};

/// Plugin parameters: name/value pairs as they appear in a map definition.
pub type Parameters = BTreeMap<String, String>;

/// Function creating a datasource from its parameters.
pub type DatasourceFactory =
    Box<dyn Fn(&Parameters) -> Result<Arc<dyn Datasource>, DatasourceError> + Send + Sync>;

/// Set of datasource plugins known to a renderer, keyed by plugin name.
///
/// A layer referring to a plugin that is not registered is skipped with a warning.
#[derive(Default)]
pub struct DatasourceRegistry {
    factories: AHashMap<String, DatasourceFactory>,
}

impl Debug for DatasourceRegistry {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatasourceRegistry")
            .field("plugins", &self.plugin_names())
            .finish()
    }
}

impl DatasourceRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a plugin, replacing any previous plugin with the same name.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        factory: impl Fn(&Parameters) -> Result<Arc<dyn Datasource>, DatasourceError>
            + Send
            + Sync
            + 'static,
    ) {
        let name = name.into();
        debug!("Registering datasource plugin {name}");
        self.factories.insert(name, Box::new(factory));
    }

    /// Builder-style version of [`DatasourceRegistry::register`].
    pub fn with_plugin(
        mut self,
        name: impl Into<String>,
        factory: impl Fn(&Parameters) -> Result<Arc<dyn Datasource>, DatasourceError>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        self.register(name, factory);
        self
    }

    /// Returns true if a plugin with the name is registered.
    pub fn is_registered(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Names of all registered plugins in alphabetical order.
    pub fn plugin_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Creates a datasource with the named plugin.
    pub fn create(
        &self,
        name: &str,
        parameters: &Parameters,
    ) -> Result<Arc<dyn Datasource>, DatasourceError> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| DatasourceError::UnknownPlugin(name.to_string()))?;
        factory(parameters)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datasource::MemoryDatasource;
    use crate::feature::Feature;
    use assert_matches::assert_matches;
    use cartela_types::Point2d;

    fn registry() -> DatasourceRegistry {
        DatasourceRegistry::new().with_plugin("points", |params: &Parameters| {
            let count: i64 = params
                .get("count")
                .ok_or_else(|| DatasourceError::InvalidParameters("count is required".into()))?
                .parse()
                .map_err(|_| DatasourceError::InvalidParameters("count is not a number".into()))?;
            let features = (0..count)
                .map(|i| Feature::new(i).with_geometry(Point2d::new(i as f64, 0.0)))
                .collect();
            Ok(Arc::new(MemoryDatasource::new(features)) as Arc<dyn Datasource>)
        })
    }

    #[test]
    fn create_registered_plugin() {
        let registry = registry();
        let params = Parameters::from([("count".to_string(), "3".to_string())]);
        let ds = registry.create("points", &params).unwrap();
        assert_eq!(ds.all_features().unwrap().count(), 3);
        assert_eq!(registry.plugin_names(), vec!["points"]);
    }

    #[test]
    fn unknown_plugin_and_bad_parameters() {
        let registry = registry();
        assert_matches!(
            registry.create("postgis", &Parameters::new()).err(),
            Some(DatasourceError::UnknownPlugin(name)) if name == "postgis"
        );
        assert_matches!(
            registry.create("points", &Parameters::new()).err(),
            Some(DatasourceError::InvalidParameters(_))
        );
    }
}
