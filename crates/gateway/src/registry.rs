use std::collections::BTreeMap;

use hookrelay_relay::RelayPlugin;

/// Registry of all loaded destination plugins, keyed by plugin id.
#[derive(Default)]
pub struct PluginRegistry {
    plugins: BTreeMap<String, Box<dyn RelayPlugin>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a plugin, replacing any plugin with the same id.
    pub fn register(&mut self, plugin: Box<dyn RelayPlugin>) {
        self.plugins.insert(plugin.id().to_ascii_lowercase(), plugin);
    }

    /// Look a plugin up by id, ignoring ASCII case.
    pub fn get(&self, id: &str) -> Option<&dyn RelayPlugin> {
        self.plugins
            .get(&id.to_ascii_lowercase())
            .map(|p| p.as_ref())
    }

    pub fn list(&self) -> Vec<&str> {
        self.plugins.keys().map(|s| s.as_str()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn RelayPlugin> {
        self.plugins.values().map(|p| p.as_ref())
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}
