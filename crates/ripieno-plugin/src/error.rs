//! Error types for the plugin hosting boundary.

use thiserror::Error;

use crate::format::PluginFormat;

#[derive(Error, Debug)]
pub enum HostError {
    #[error("Plugin not found in catalog: {format} {plugin_id}")]
    NotFound {
        format: PluginFormat,
        plugin_id: String,
    },

    #[error("Instantiation failed: {0}")]
    Instantiation(String),

    #[error("Plugin scan failed: {0}")]
    Scan(String),

    #[error("Processing failed: {0}")]
    Process(String),

    #[error("Failed to save plugin state: {0}")]
    StateSave(String),

    #[error("Failed to restore plugin state: {0}")]
    StateRestore(String),

    #[error("Plugin UI error: {0}")]
    Ui(String),
}

pub type Result<T> = std::result::Result<T, HostError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = HostError::NotFound {
            format: PluginFormat::Vst3,
            plugin_id: "com.example.verb".into(),
        };
        assert!(err.to_string().contains("VST3"));
        assert!(err.to_string().contains("com.example.verb"));

        let err = HostError::Instantiation("backend said no".into());
        assert!(err.to_string().contains("backend said no"));
    }
}
