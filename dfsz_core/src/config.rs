use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::codec::CodecKind;
use crate::index::INDEX_CAPACITY;
use crate::policy::DEFAULT_CHUNK_SIZE;

/// How the compressed file is moved into the source's place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SwapMode {
    /// Atomic replace when the filesystem offers it, delete-then-rename otherwise.
    #[default]
    Auto,
    /// Always delete the source, then rename. Leaves a window with no file.
    DeleteThenRename,
}

impl fmt::Display for SwapMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SwapMode::Auto => "auto",
            SwapMode::DeleteThenRename => "delete-then-rename",
        })
    }
}

impl FromStr for SwapMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "auto" => Ok(SwapMode::Auto),
            "delete-then-rename" => Ok(SwapMode::DeleteThenRename),
            other => Err(format!(
                "unknown swap mode '{other}' (expected auto or delete-then-rename)"
            )),
        }
    }
}

/// Settings for a [`Replacer`](crate::replace::Replacer) (loaded from dfsz.toml).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplaceConfig {
    /// Chunk size used when the caller gives none and the file is small (1 MiB).
    pub default_chunk_size: u64,
    /// Maximum position-index entries (5000).
    pub index_capacity: usize,
    /// Codec used when the caller names none.
    pub default_codec: CodecKind,
    /// Directory holding in-flight compressed files. Must be on the same
    /// volume as the files being compressed.
    pub temp_dir: String,
    pub swap_mode: SwapMode,
}

impl Default for ReplaceConfig {
    fn default() -> Self {
        Self {
            default_chunk_size: DEFAULT_CHUNK_SIZE,
            index_capacity: INDEX_CAPACITY,
            default_codec: CodecKind::default(),
            temp_dir: "/tmp/dfsz".to_string(),
            swap_mode: SwapMode::default(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("reading config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parsing config: {0}")]
    Parse(#[from] toml::de::Error),
}

impl ReplaceConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }
}
