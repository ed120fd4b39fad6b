//! Plugin catalog metadata.

use serde::{Deserialize, Serialize};

use crate::format::PluginFormat;

/// One catalog entry describing an installed plugin.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PluginInfo {
    pub format: PluginFormat,
    pub plugin_id: String,
    pub display_name: String,
    #[serde(default)]
    pub vendor: String,
}

impl PluginInfo {
    pub fn new(
        format: PluginFormat,
        plugin_id: impl Into<String>,
        display_name: impl Into<String>,
    ) -> Self {
        Self {
            format,
            plugin_id: plugin_id.into(),
            display_name: display_name.into(),
            vendor: String::new(),
        }
    }

    pub fn vendor(mut self, vendor: impl Into<String>) -> Self {
        self.vendor = vendor.into();
        self
    }
}

/// The set of plugins known to the hosting layer.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PluginCatalog {
    plugins: Vec<PluginInfo>,
}

impl PluginCatalog {
    pub fn new(plugins: Vec<PluginInfo>) -> Self {
        Self { plugins }
    }

    pub fn plugins(&self) -> &[PluginInfo] {
        &self.plugins
    }

    pub fn add(&mut self, info: PluginInfo) {
        self.plugins.push(info);
    }

    pub fn find(&self, format: PluginFormat, plugin_id: &str) -> Option<&PluginInfo> {
        self.plugins
            .iter()
            .find(|p| p.format == format && p.plugin_id == plugin_id)
    }

    /// Display name for a plugin, falling back to its id when the catalog
    /// has no entry.
    pub fn display_name_for(&self, format: PluginFormat, plugin_id: &str) -> String {
        match self.find(format, plugin_id) {
            Some(info) => info.display_name.clone(),
            None => {
                tracing::debug!(%format, plugin_id, "plugin not in catalog, using id as name");
                plugin_id.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_and_display_name() {
        let catalog = PluginCatalog::new(vec![
            PluginInfo::new(PluginFormat::Clap, "org.surge.xt", "Surge XT"),
            PluginInfo::new(PluginFormat::Vst3, "com.example.verb", "Example Verb"),
        ]);

        assert!(catalog.find(PluginFormat::Clap, "org.surge.xt").is_some());
        assert!(catalog.find(PluginFormat::Lv2, "org.surge.xt").is_none());
        assert_eq!(
            catalog.display_name_for(PluginFormat::Vst3, "com.example.verb"),
            "Example Verb"
        );
        assert_eq!(
            catalog.display_name_for(PluginFormat::Vst3, "com.example.unknown"),
            "com.example.unknown"
        );
    }
}
