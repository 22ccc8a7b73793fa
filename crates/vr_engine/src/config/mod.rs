//! Engine settings files
//!
//! Every settings struct in [`crate::core::config`] implements [`Config`] and
//! can be read from or written to a `.toml` or `.ron` file. Missing tables and
//! fields fall back to their defaults, so a file only lists what it changes.

use std::path::Path;

pub use serde::{Deserialize, Serialize};

/// Encoding of a settings file, picked from its extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// `.toml`
    Toml,
    /// `.ron`
    Ron,
}

impl ConfigFormat {
    /// Format matching the extension of `path`
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Ok(Self::Toml),
            Some("ron") => Ok(Self::Ron),
            _ => Err(ConfigError::UnsupportedFormat(path.display().to_string())),
        }
    }
}

/// Settings that round-trip through a file on disk
pub trait Config: Serialize + for<'de> Deserialize<'de> + Default {
    /// Parse settings text
    fn parse(contents: &str, format: ConfigFormat) -> Result<Self, ConfigError> {
        match format {
            ConfigFormat::Toml => toml::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string())),
            ConfigFormat::Ron => ron::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string())),
        }
    }

    /// Encode settings as text
    fn encode(&self, format: ConfigFormat) -> Result<String, ConfigError> {
        match format {
            ConfigFormat::Toml => {
                toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))
            }
            ConfigFormat::Ron => ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
                .map_err(|e| ConfigError::Serialize(e.to_string())),
        }
    }

    /// Read settings from a `.toml` or `.ron` file
    fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let format = ConfigFormat::from_path(path)?;
        log::debug!("Loading settings from {}", path.display());
        Self::parse(&std::fs::read_to_string(path)?, format)
    }

    /// Write settings to a `.toml` or `.ron` file
    fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let contents = self.encode(ConfigFormat::from_path(path)?)?;
        std::fs::write(path, contents)?;
        Ok(())
    }
}

/// Failure to read, write or accept a settings file
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// The file could not be read or written
    #[error("settings file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// The text is not valid settings
    #[error("malformed settings: {0}")]
    Parse(String),

    /// The settings could not be encoded
    #[error("could not encode settings: {0}")]
    Serialize(String),

    /// The path has neither a `.toml` nor a `.ron` extension
    #[error("settings file must end in .toml or .ron: {0}")]
    UnsupportedFormat(String),

    /// A value parsed but is out of range
    #[error("invalid setting: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_extension() {
        assert_eq!(ConfigFormat::from_path(Path::new("stereo.toml")).unwrap(), ConfigFormat::Toml);
        assert_eq!(ConfigFormat::from_path(Path::new("dir/stereo.ron")).unwrap(), ConfigFormat::Ron);
        assert!(matches!(
            ConfigFormat::from_path(Path::new("stereo")),
            Err(ConfigError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let path = std::env::temp_dir().join("vr_engine_missing_settings.toml");
        let err = crate::core::config::SceneSettings::load_from_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
