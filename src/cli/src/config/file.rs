use serde::{Deserialize, Serialize};

#[derive(Default, Debug, Clone, Serialize, Deserialize)]
pub(crate) struct Snmp {
  pub(crate) timeout: Option<u32>,
}

#[derive(Default, Debug, Clone, Serialize, Deserialize)]
pub(crate) struct Scrape {
  pub(crate) board_min: Option<u8>,
  pub(crate) board_max: Option<u8>,
  pub(crate) pon_min: Option<u8>,
  pub(crate) pon_max: Option<u8>,
  pub(crate) workers: Option<usize>,
  pub(crate) deadline: Option<u32>,
  pub(crate) timezone: Option<chrono_tz::Tz>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum LogLevel {
  Trace,
  Debug,
  Info,
  Warn,
  Error,
}

#[derive(Default, Debug, Clone, Serialize, Deserialize)]
pub(crate) struct Values {
  pub(crate) log_level: Option<LogLevel>,
  pub(crate) scrape_interval: Option<u32>,
  #[serde(default)]
  pub(crate) snmp: Snmp,
  #[serde(default)]
  pub(crate) scrape: Scrape,
}

#[derive(Debug, thiserror::Error)]
pub(crate) enum ParseError {
  #[error("Failed reading config file")]
  Read(#[from] std::io::Error),

  #[error("Config file is missing an extension")]
  MissingExtension,

  #[error("Config file has invalid extension")]
  InvalidExtension,

  #[error("Failed deserializing config from yaml")]
  DeserializetionYaml(#[from] serde_yaml::Error),

  #[error("Failed deserializing config from toml")]
  DeserializetionToml(#[from] toml::de::Error),

  #[error("Failed deserializing config from json")]
  DeserializetionJson(#[from] serde_json::Error),
}

pub(crate) async fn parse_async(
  location: Option<&str>,
) -> Result<Values, ParseError> {
  let location = match location {
    Some(location) => std::path::PathBuf::from(location),
    None => {
      match directories::ProjectDirs::from("com", "egret", "egret")
        .map(|project_dirs| project_dirs.config_dir().join("config.yaml"))
      {
        // Running without a config file is fine.
        Some(default) if !default.exists() => return Ok(Values::default()),
        Some(default) => default,
        None => return Ok(Values::default()),
      }
    }
  };

  let values = {
    let raw = tokio::fs::read_to_string(location.clone()).await?;
    match location.extension().and_then(|str| str.to_str()) {
      None => return Err(ParseError::MissingExtension),
      Some("yaml" | "yml") => serde_yaml::from_str::<Values>(raw.as_str())?,
      Some("toml") => toml::from_str::<Values>(raw.as_str())?,
      Some("json") => serde_json::from_str::<Values>(raw.as_str())?,
      Some(_) => return Err(ParseError::InvalidExtension),
    }
  };

  Ok(values)
}

pub(crate) fn milliseconds_to_chrono(milliseconds: u32) -> chrono::Duration {
  chrono::Duration::milliseconds(milliseconds as i64)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
  use super::*;

  #[test]
  fn deserializes_a_toml_document() {
    let values = toml::from_str::<Values>(
      r#"
        log_level = "warn"
        scrape_interval = 30000

        [snmp]
        timeout = 2000

        [scrape]
        board_max = 1
        workers = 4
        timezone = "Asia/Jakarta"
      "#,
    )
    .unwrap();

    assert!(matches!(values.log_level, Some(LogLevel::Warn)));
    assert_eq!(values.scrape_interval, Some(30_000));
    assert_eq!(values.snmp.timeout, Some(2_000));
    assert_eq!(values.scrape.board_max, Some(1));
    assert_eq!(values.scrape.workers, Some(4));
    assert_eq!(values.scrape.timezone, Some(chrono_tz::Tz::Asia__Jakarta));
  }

  #[test]
  fn missing_sections_default() {
    let values = toml::from_str::<Values>("").unwrap();
    assert!(values.log_level.is_none());
    assert!(values.snmp.timeout.is_none());
    assert!(values.scrape.deadline.is_none());
  }
}
