use anyhow::{Context, Result};
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::Path;

pub const DEFAULT_BINARY: &str = "up";

/// One layer of plugin settings, as found in a YAML descriptor or collected
/// from flags and `PLUGIN_*` variables.
#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    #[serde(default)]
    pub access_key: Option<String>,

    #[serde(default)]
    pub secret_key: Option<String>,

    #[serde(default)]
    pub stage: Vec<String>,

    #[serde(default)]
    pub binary: Option<String>,
}

impl Settings {
    /// Fill anything this layer leaves unset from `lower`.
    pub fn or(self, lower: Settings) -> Settings {
        Settings {
            access_key: non_empty(self.access_key).or(lower.access_key),
            secret_key: non_empty(self.secret_key).or(lower.secret_key),
            stage: if self.stage.is_empty() {
                lower.stage
            } else {
                self.stage
            },
            binary: non_empty(self.binary).or(lower.binary),
        }
    }
}

fn non_empty(v: Option<String>) -> Option<String> {
    v.filter(|s| !s.is_empty())
}

/// Resolved plugin configuration.
#[derive(Clone, PartialEq, Eq)]
pub struct Config {
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
    pub stages: Vec<String>,
    pub binary: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            access_key: None,
            secret_key: None,
            stages: Vec::new(),
            binary: DEFAULT_BINARY.to_string(),
        }
    }
}

impl From<Settings> for Config {
    fn from(s: Settings) -> Self {
        Self {
            access_key: non_empty(s.access_key),
            secret_key: non_empty(s.secret_key),
            stages: s
                .stage
                .iter()
                .map(|st| st.trim())
                .filter(|st| !st.is_empty())
                .map(str::to_string)
                .collect(),
            binary: non_empty(s.binary.map(|b| b.trim().to_string()))
                .unwrap_or_else(|| DEFAULT_BINARY.to_string()),
        }
    }
}

// Keys stay out of logs and panic messages.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |v: &Option<String>| v.as_ref().map(|_| "<redacted>");
        f.debug_struct("Config")
            .field("access_key", &redact(&self.access_key))
            .field("secret_key", &redact(&self.secret_key))
            .field("stages", &self.stages)
            .field("binary", &self.binary)
            .finish()
    }
}

pub fn load_yaml<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T> {
    let data = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    serde_yaml::from_str(&data).with_context(|| format!("parse yaml {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(v: &str) -> Option<String> {
        Some(v.to_string())
    }

    #[test]
    fn load_descriptor_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("up.yaml");
        std::fs::write(
            &path,
            r#"access_key: AK
secret_key: SK
stage:
  - staging
  - production
"#,
        )
        .unwrap();

        let loaded: Settings = load_yaml(&path).unwrap();
        let cfg = Config::from(loaded);
        assert_eq!(cfg.access_key, s("AK"));
        assert_eq!(cfg.secret_key, s("SK"));
        assert_eq!(cfg.stages, vec!["staging", "production"]);
        assert_eq!(cfg.binary, "up");
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("up.yaml");
        std::fs::write(&path, "stages: [prod]\n").unwrap();

        let err = load_yaml::<Settings>(&path).unwrap_err();
        assert!(format!("{err:#}").contains("parse yaml"));
    }

    #[test]
    fn upper_layer_wins_and_empty_falls_through() {
        let upper = Settings {
            access_key: s(""),
            secret_key: s("cli-secret"),
            stage: vec![],
            binary: None,
        };
        let lower = Settings {
            access_key: s("file-key"),
            secret_key: s("file-secret"),
            stage: vec!["staging".into()],
            binary: s("/opt/up"),
        };

        let merged = upper.or(lower);
        assert_eq!(merged.access_key, s("file-key"));
        assert_eq!(merged.secret_key, s("cli-secret"));
        assert_eq!(merged.stage, vec!["staging"]);
        assert_eq!(merged.binary, s("/opt/up"));
    }

    #[test]
    fn blank_values_are_unset() {
        let cfg = Config::from(Settings {
            access_key: s(""),
            secret_key: None,
            stage: vec![" staging ".into(), "".into(), "  ".into(), "production".into()],
            binary: s("  "),
        });
        assert_eq!(cfg.access_key, None);
        assert_eq!(cfg.secret_key, None);
        assert_eq!(cfg.stages, vec!["staging", "production"]);
        assert_eq!(cfg.binary, DEFAULT_BINARY);
    }

    #[test]
    fn debug_hides_keys() {
        let cfg = Config {
            access_key: s("AKIAEXAMPLE"),
            secret_key: s("topsecret"),
            ..Config::default()
        };
        let out = format!("{cfg:?}");
        assert!(!out.contains("AKIAEXAMPLE"));
        assert!(!out.contains("topsecret"));
        assert!(out.contains("<redacted>"));
    }
}
