//! Supported plugin formats.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A plugin packaging format. Purely descriptive data; the capability
/// traits are format-agnostic.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PluginFormat {
    Vst3,
    Lv2,
    Au,
    Clap,
}

impl PluginFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            PluginFormat::Vst3 => "VST3",
            PluginFormat::Lv2 => "LV2",
            PluginFormat::Au => "AU",
            PluginFormat::Clap => "CLAP",
        }
    }
}

impl fmt::Display for PluginFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PluginFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "VST3" => Ok(PluginFormat::Vst3),
            "LV2" => Ok(PluginFormat::Lv2),
            "AU" => Ok(PluginFormat::Au),
            "CLAP" => Ok(PluginFormat::Clap),
            other => Err(format!("unknown plugin format: {other}")),
        }
    }
}
