//! Credential and base URL resolution
//!
//! Each value is taken from the first source that has it: an explicit
//! override, the environment, the `[ThingFabric]` section of `~/.tf`, and for
//! the URL only, a built-in default.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::ConfigError;
use crate::request::Credentials;

pub const ACCESS_KEY_ENV: &str = "TF_ACCESS_KEY";
pub const SECRET_KEY_ENV: &str = "TF_SECRET_KEY";
pub const URL_ENV: &str = "TF_URL";

pub const CONFIG_FILE_NAME: &str = ".tf";
pub const CONFIG_SECTION: &str = "ThingFabric";
pub const DEFAULT_URL: &str = "https://q.thingfabric.com/r/";

/// Values given explicitly, e.g. by an embedding program.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
    pub url: Option<String>,
}

/// Resolved startup configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub credentials: Credentials,
    pub url: String,
}

impl Config {
    /// Resolve against the process environment and `~/.tf`.
    pub fn resolve(overrides: ConfigOverrides) -> Result<Self, ConfigError> {
        let section = match default_config_path() {
            Some(path) => read_config_section(&path)?,
            None => None,
        };
        Self::resolve_with(overrides, |key| std::env::var(key).ok(), section.as_ref())
    }

    /// Resolve with an injected environment lookup and config section.
    pub fn resolve_with<F>(
        overrides: ConfigOverrides,
        env: F,
        section: Option<&HashMap<String, String>>,
    ) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |explicit: Option<String>, env_key: &str, file_key: &str| {
            explicit
                .or_else(|| env(env_key))
                .or_else(|| section.and_then(|s| s.get(file_key).cloned()))
        };

        let access_key = lookup(overrides.access_key, ACCESS_KEY_ENV, "access_key").ok_or(
            ConfigError::InvalidCredentials {
                missing: "access_key",
            },
        )?;
        let secret_key = lookup(overrides.secret_key, SECRET_KEY_ENV, "secret_key").ok_or(
            ConfigError::InvalidCredentials {
                missing: "secret_key",
            },
        )?;
        let url = lookup(overrides.url, URL_ENV, "url").unwrap_or_else(|| DEFAULT_URL.to_string());

        debug!(%url, "resolved configuration");
        Ok(Self {
            credentials: Credentials::new(access_key, secret_key),
            url,
        })
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(CONFIG_FILE_NAME))
}

/// Read the `[ThingFabric]` section of an INI file. A missing file is not an
/// error; it just contributes nothing.
pub fn read_config_section(path: &Path) -> Result<Option<HashMap<String, String>>, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(text) => Ok(parse_ini_section(&text, CONFIG_SECTION)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(ConfigError::FileRead {
            path: path.display().to_string(),
            reason: e.to_string(),
        }),
    }
}

/// Extract one section of INI text. Keys are lowercased; `=` and `:` both
/// separate keys from values; `#` and `;` start comment lines.
pub fn parse_ini_section(text: &str, section: &str) -> Option<HashMap<String, String>> {
    let mut found = None;
    let mut in_section = false;

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }
        if let Some(name) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
            in_section = name.trim() == section;
            if in_section {
                found.get_or_insert_with(HashMap::new);
            }
            continue;
        }
        if !in_section {
            continue;
        }
        let Some(split) = line.find(|c: char| c == '=' || c == ':') else {
            continue;
        };
        let (key, value) = line.split_at(split);
        if let Some(entries) = found.as_mut() {
            entries.insert(key.trim().to_lowercase(), value[1..].trim().to_string());
        }
    }

    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const CONFIG_TEXT: &str = "\
# ThingFabric credentials
[other]
access_key = wrong

[ThingFabric]
access_key = file-access
Secret_Key: file-secret
; url = commented-out
";

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn parse_ini_section_reads_only_named_section() {
        let section = parse_ini_section(CONFIG_TEXT, "ThingFabric").unwrap();
        assert_eq!(section.get("access_key").unwrap(), "file-access");
        assert_eq!(section.get("secret_key").unwrap(), "file-secret");
        assert!(!section.contains_key("url"));
    }

    #[test]
    fn parse_ini_section_missing_section_is_none() {
        assert!(parse_ini_section("[other]\na = b\n", "ThingFabric").is_none());
    }

    #[test]
    fn parse_ini_section_keeps_separators_in_value() {
        let section = parse_ini_section("[ThingFabric]\nurl = http://host:8080/r/\n", "ThingFabric")
            .unwrap();
        assert_eq!(section.get("url").unwrap(), "http://host:8080/r/");
    }

    #[test]
    fn resolve_prefers_override_then_env_then_file() {
        let section = parse_ini_section(CONFIG_TEXT, CONFIG_SECTION);
        let env = |key: &str| (key == SECRET_KEY_ENV).then(|| "env-secret".to_string());
        let overrides = ConfigOverrides {
            access_key: Some("explicit-access".into()),
            ..Default::default()
        };

        let config = Config::resolve_with(overrides, env, section.as_ref()).unwrap();
        assert_eq!(config.credentials.access_key, "explicit-access");
        assert_eq!(config.credentials.secret_key, "env-secret");
        assert_eq!(config.url, DEFAULT_URL);
    }

    #[test]
    fn resolve_uses_file_values() {
        let section = parse_ini_section(CONFIG_TEXT, CONFIG_SECTION);
        let config =
            Config::resolve_with(ConfigOverrides::default(), no_env, section.as_ref()).unwrap();
        assert_eq!(
            config.credentials,
            Credentials::new("file-access", "file-secret")
        );
    }

    #[test]
    fn resolve_env_url_beats_default() {
        let env = |key: &str| match key {
            ACCESS_KEY_ENV => Some("a".to_string()),
            SECRET_KEY_ENV => Some("s".to_string()),
            URL_ENV => Some("http://localhost/r/".to_string()),
            _ => None,
        };
        let config = Config::resolve_with(ConfigOverrides::default(), env, None).unwrap();
        assert_eq!(config.url, "http://localhost/r/");
    }

    #[test]
    fn resolve_without_credentials_fails() {
        let err = Config::resolve_with(ConfigOverrides::default(), no_env, None).unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidCredentials {
                missing: "access_key"
            }
        );
    }

    #[test]
    fn resolve_without_secret_fails() {
        let overrides = ConfigOverrides {
            access_key: Some("a".into()),
            ..Default::default()
        };
        let err = Config::resolve_with(overrides, no_env, None).unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidCredentials {
                missing: "secret_key"
            }
        );
    }

    #[test]
    fn read_config_section_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(CONFIG_TEXT.as_bytes()).unwrap();

        let section = read_config_section(file.path()).unwrap().unwrap();
        assert_eq!(section.get("access_key").unwrap(), "file-access");
    }

    #[test]
    fn read_config_section_unreadable_file_reports_reason() {
        // A directory exists but cannot be read as text.
        let dir = tempfile::tempdir().unwrap();
        let err = read_config_section(dir.path()).unwrap_err();

        let ConfigError::FileRead { path, reason } = &err else {
            panic!("unexpected error: {err:?}");
        };
        assert!(!reason.is_empty());
        let message = err.to_string();
        assert!(message.contains(path.as_str()));
        assert!(message.ends_with(reason.as_str()));
    }

    #[test]
    fn read_config_section_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let section = read_config_section(&dir.path().join("absent")).unwrap();
        assert!(section.is_none());
    }
}
