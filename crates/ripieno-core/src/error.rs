//! Error types for the sequencing/routing engine.

use thiserror::Error;

use ripieno_plugin::PluginFormat;

use crate::InstanceId;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid track index: {0}")]
    InvalidTrackIndex(usize),

    #[error("Plugin not found in catalog: {format} {plugin_id}")]
    PluginNotFound {
        format: PluginFormat,
        plugin_id: String,
    },

    #[error("Instantiation failed: {0}")]
    Instantiation(String),

    #[error("Unresolved route target: {0}")]
    UnresolvedRouteTarget(i32),

    #[error("All 16 function-block groups are in use")]
    GroupExhausted,

    #[error("Instance {0} is not configured or already torn down")]
    AlreadyInvalidState(InstanceId),

    #[error("Track topology mismatch: {tracks} tracks vs {contexts} process contexts")]
    TopologyMismatch { tracks: usize, contexts: usize },

    #[error("Plugin instance {instance} failed while processing: {message}")]
    PluginProcess {
        instance: InstanceId,
        message: String,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
