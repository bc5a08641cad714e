use std::path::PathBuf;

use serde::Deserialize;

/// Static file serving for paths no route matched
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StaticFilesConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Directory files are served from
    #[serde(default = "default_dir")]
    pub dir: PathBuf,
}

impl Default for StaticFilesConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: default_dir(),
        }
    }
}

const fn default_enabled() -> bool {
    true
}

fn default_dir() -> PathBuf {
    PathBuf::from("uploads")
}
