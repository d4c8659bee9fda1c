//! Layered configuration loading
//!
//! Sources are applied in order, later ones overriding earlier ones:
//! struct defaults (`#[serde(default)]`), the TOML sources given by the
//! caller, then environment variables named `<PREFIX>__SECTION__KEY`.

use std::path::PathBuf;

use ::config::{Config, Environment, File, FileFormat};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::errors::Result;

/// A configuration source handed to [`load_config`]
#[derive(Debug, Clone)]
pub enum ConfigSource {
    /// TOML file on disk; missing files are an error
    File(PathBuf),
    /// Inline TOML text
    Toml(String),
}

/// Load a configuration value of type `T`.
///
/// `env_prefix` of `None` disables the environment layer.
pub fn load_config<T: DeserializeOwned>(sources: &[ConfigSource], env_prefix: Option<&str>) -> Result<T> {
    let mut builder = Config::builder();

    for source in sources {
        builder = match source {
            ConfigSource::File(path) => {
                debug!("Loading configuration file {}", path.display());
                builder.add_source(File::from(path.as_path()).format(FileFormat::Toml).required(true))
            }
            ConfigSource::Toml(text) => builder.add_source(File::from_str(text, FileFormat::Toml)),
        };
    }

    if let Some(prefix) = env_prefix {
        builder = builder.add_source(
            Environment::with_prefix(prefix)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );
    }

    Ok(builder.build()?.try_deserialize()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::io::Write;

    #[derive(Debug, Deserialize, PartialEq)]
    #[serde(default)]
    struct Sample {
        name: String,
        retries: u32,
        nested: Nested,
    }

    #[derive(Debug, Deserialize, PartialEq)]
    #[serde(default)]
    struct Nested {
        enabled: bool,
    }

    impl Default for Sample {
        fn default() -> Self {
            Self { name: "default".into(), retries: 3, nested: Nested::default() }
        }
    }

    impl Default for Nested {
        fn default() -> Self {
            Self { enabled: true }
        }
    }

    #[test]
    fn empty_sources_yield_defaults() {
        let sample: Sample = load_config(&[], None).unwrap();
        assert_eq!(sample, Sample::default());
    }

    #[test]
    fn inline_toml_overrides_defaults() {
        let sample: Sample = load_config(
            &[ConfigSource::Toml("retries = 7\n[nested]\nenabled = false\n".into())],
            None,
        )
        .unwrap();
        assert_eq!(sample.name, "default");
        assert_eq!(sample.retries, 7);
        assert!(!sample.nested.enabled);
    }

    #[test]
    fn later_sources_win() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "name = \"from-file\"\nretries = 1").unwrap();

        let sample: Sample = load_config(
            &[
                ConfigSource::File(file.path().to_path_buf()),
                ConfigSource::Toml("retries = 9".into()),
            ],
            None,
        )
        .unwrap();
        assert_eq!(sample.name, "from-file");
        assert_eq!(sample.retries, 9);
    }

    #[test]
    fn missing_file_is_an_error() {
        let result: Result<Sample> =
            load_config(&[ConfigSource::File(PathBuf::from("/definitely/not/here.toml"))], None);
        assert!(result.is_err());
    }
}
