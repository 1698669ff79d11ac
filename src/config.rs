use anyhow::Context;
use serde::{Deserialize, Serialize};

use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct Config {
    #[serde(default)]
    pub read: ReadOptions,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub tracing: TracingConfig,
}

/// What to do with journal cells that don't parse.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum AmountPolicy {
    /// Refuse the whole journal on the first bad row.
    #[default]
    Strict,
    /// Bad amounts count as zero, bad dates as undated, unusable rows are
    /// skipped. Everything is logged.
    Lenient,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct ReadOptions {
    #[serde(default)]
    pub amounts: AmountPolicy,
    #[serde(default = "default_date_formats")]
    pub date_formats: Vec<String>,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            amounts: AmountPolicy::default(),
            date_formats: default_date_formats(),
        }
    }
}

fn default_date_formats() -> Vec<String> {
    ["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y"]
        .into_iter()
        .map(String::from)
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct OutputConfig {
    pub directory: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("."),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct TracingConfig {
    pub filter: String,
    pub json: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            json: false,
        }
    }
}

impl Config {
    pub fn load_config(path: Option<impl AsRef<Path>>) -> anyhow::Result<Self> {
        match path {
            Some(config_path) => {
                let config_file = std::fs::read_to_string(config_path)
                    .context("Couldn't read config file")?;
                Self::from_yaml(&config_file)
            }
            None => Ok(Config::default()),
        }
    }

    pub fn from_yaml(yaml: &str) -> anyhow::Result<Self> {
        serde_yaml::from_str(yaml).context("Couldn't parse config file")
    }
}

#[cfg(test)]
mod tests {
    use super::{AmountPolicy, Config};
    use std::path::PathBuf;

    #[test]
    fn empty_sections_use_defaults() {
        let config = Config::from_yaml("read:\n  amounts: lenient\n").unwrap();
        assert_eq!(config.read.amounts, AmountPolicy::Lenient);
        assert_eq!(config.read.date_formats[0], "%Y-%m-%d");
        assert_eq!(config.output.directory, PathBuf::from("."));
        assert_eq!(config.tracing.filter, "info");
    }

    #[test]
    fn full_config() {
        let config = Config::from_yaml(
            "\
read:
  amounts: strict
  date_formats: ['%m/%d/%Y']
output:
  directory: reports
tracing:
  filter: debug
  json: true
",
        )
        .unwrap();
        assert_eq!(config.read.amounts, AmountPolicy::Strict);
        assert_eq!(config.read.date_formats, ["%m/%d/%Y"]);
        assert_eq!(config.output.directory, PathBuf::from("reports"));
        assert!(config.tracing.json);
    }

    #[test]
    fn unknown_policy_is_rejected() {
        assert!(Config::from_yaml("read:\n  amounts: sloppy\n").is_err());
    }

    #[test]
    fn no_file_means_defaults() {
        let config = Config::load_config(None::<PathBuf>).unwrap();
        assert_eq!(config.read.amounts, AmountPolicy::Strict);
    }
}
