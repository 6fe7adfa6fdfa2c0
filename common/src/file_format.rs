//! Config file format detection and (de)serialization.

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum FileFormatError {
    #[error("Failed to get file extension for {0:?}")]
    MissingFileExtension(PathBuf),
    #[error("Unsupported file extension for file: {0:?}")]
    UnsupportedFileExtension(PathBuf),
}

#[derive(Debug, thiserror::Error)]
pub enum SerdeFormatError {
    #[error(transparent)]
    Format(#[from] FileFormatError),
    #[error("Failed to read {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("YAML serialization failed")]
    Yaml(#[from] serde_yml::Error),
    #[error("JSON serialization failed")]
    Json(#[from] serde_json::Error),
}

pub type SerdeFormatResult<T> = Result<T, SerdeFormatError>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SerdeFormat {
    Yaml,
    Json,
}

impl SerdeFormat {
    pub fn from_path(path: &Path) -> Result<Self, FileFormatError> {
        let ext = path
            .extension()
            .and_then(|os_str| os_str.to_str())
            .ok_or_else(|| FileFormatError::MissingFileExtension(path.to_path_buf()))?;

        if ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml") {
            Ok(Self::Yaml)
        } else if ext.eq_ignore_ascii_case("json") {
            Ok(Self::Json)
        } else {
            Err(FileFormatError::UnsupportedFileExtension(path.to_path_buf()))
        }
    }

    pub fn serialize<T: Serialize>(self, value: &T) -> SerdeFormatResult<String> {
        match self {
            Self::Yaml => Ok(serde_yml::to_string(value)?),
            Self::Json => Ok(serde_json::to_string_pretty(value)?),
        }
    }

    pub fn deserialize<T: DeserializeOwned>(self, text: &str) -> SerdeFormatResult<T> {
        match self {
            Self::Yaml => Ok(serde_yml::from_str(text)?),
            Self::Json => Ok(serde_json::from_str(text)?),
        }
    }
}

/// Read a config file, picking the format from its extension.
pub fn load_config<T: DeserializeOwned>(path: &Path) -> SerdeFormatResult<T> {
    let format = SerdeFormat::from_path(path)?;
    let text = std::fs::read_to_string(path).map_err(|source| SerdeFormatError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    format.deserialize(&text)
}
