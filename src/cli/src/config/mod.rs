mod args;
mod env;
mod file;

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::Mutex;

#[derive(Debug, Clone)]
pub(crate) struct Snmp {
  pub(crate) host: String,
  pub(crate) port: u16,
  pub(crate) community: String,
  pub(crate) timeout: chrono::Duration,
}

#[derive(Debug, Clone)]
pub(crate) struct Scrape {
  pub(crate) board_min: u8,
  pub(crate) board_max: u8,
  pub(crate) pon_min: u8,
  pub(crate) pon_max: u8,
  pub(crate) workers: usize,
  pub(crate) deadline: chrono::Duration,
  pub(crate) timezone: chrono_tz::Tz,
}

#[derive(Debug, Clone)]
pub(crate) struct Values {
  pub(crate) snmp: Snmp,
  pub(crate) scrape: Scrape,
  pub(crate) listen: String,
  pub(crate) log_level: tracing::level_filters::LevelFilter,
  pub(crate) scrape_interval: chrono::Duration,
}

#[derive(Debug, Clone)]
struct Unparsed {
  from_args: args::Values,
  from_env: env::Values,
  from_file: file::Values,
}

#[derive(Debug, Clone)]
pub(crate) struct Manager {
  lock: Arc<Mutex<Unparsed>>,
}

#[derive(Debug, Error)]
pub(crate) enum ReadError {
  #[error("Failed reading file")]
  FileReadError(#[from] file::ParseError),

  #[error("Failed reading env")]
  EnvReadError(#[from] env::ParseError),
}

impl Manager {
  pub(crate) async fn new() -> Result<Self, ReadError> {
    let config = Self::read_async().await?;

    let config_manager = Self {
      lock: Arc::new(Mutex::new(config)),
    };

    Ok(config_manager)
  }

  pub(crate) async fn values(&self) -> Values {
    let config = self.lock.lock().await.clone();

    Self::parse(config)
  }

  #[tracing::instrument(skip(self))]
  pub(crate) async fn reload(&self) -> Values {
    let config = {
      let mut values = self.lock.lock().await;
      let from_file =
        file::parse_async(values.from_args.config.as_deref()).await;
      match from_file {
        Ok(from_file) => values.from_file = from_file,
        Err(error) => {
          tracing::error!("Failed parsing config file {}", error)
        }
      }
      values.clone()
    };

    Self::parse(config)
  }

  fn parse(config: Unparsed) -> Values {
    Values {
      log_level: config.from_file.log_level.map_or_else(
        || {
          if config.from_args.trace {
            tracing::level_filters::LevelFilter::TRACE
          } else {
            #[cfg(debug_assertions)]
            {
              tracing::level_filters::LevelFilter::DEBUG
            }
            #[cfg(not(debug_assertions))]
            {
              tracing::level_filters::LevelFilter::INFO
            }
          }
        },
        |log_level| match log_level {
          file::LogLevel::Trace => tracing::level_filters::LevelFilter::TRACE,
          file::LogLevel::Debug => tracing::level_filters::LevelFilter::DEBUG,
          file::LogLevel::Info => tracing::level_filters::LevelFilter::INFO,
          file::LogLevel::Warn => tracing::level_filters::LevelFilter::WARN,
          file::LogLevel::Error => tracing::level_filters::LevelFilter::ERROR,
        },
      ),
      scrape_interval: file::milliseconds_to_chrono(
        config.from_file.scrape_interval.unwrap_or(60_000),
      ),
      snmp: Snmp {
        host: config.from_env.snmp.host,
        port: config
          .from_env
          .snmp
          .port
          .and_then(|port| port.parse::<u16>().ok())
          .unwrap_or(161),
        community: config
          .from_env
          .snmp
          .community
          .unwrap_or_else(|| "public".to_owned()),
        timeout: file::milliseconds_to_chrono(
          config.from_file.snmp.timeout.unwrap_or(5_000),
        ),
      },
      scrape: Scrape {
        board_min: config.from_file.scrape.board_min.unwrap_or(1),
        board_max: config.from_file.scrape.board_max.unwrap_or(2),
        pon_min: config.from_file.scrape.pon_min.unwrap_or(1),
        pon_max: config.from_file.scrape.pon_max.unwrap_or(16),
        workers: config.from_file.scrape.workers.unwrap_or(10),
        deadline: file::milliseconds_to_chrono(
          config.from_file.scrape.deadline.unwrap_or(30_000),
        ),
        timezone: config
          .from_file
          .scrape
          .timezone
          .unwrap_or(chrono_tz::Tz::Asia__Jakarta),
      },
      listen: config
        .from_env
        .listen
        .unwrap_or_else(|| "0.0.0.0:8081".to_owned()),
    }
  }

  async fn read_async() -> Result<Unparsed, ReadError> {
    let from_args = args::parse();
    let from_env = env::parse()?;
    let from_file = file::parse_async(from_args.config.as_deref()).await?;

    Ok(Unparsed {
      from_args,
      from_env,
      from_file,
    })
  }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
  use super::*;

  #[test]
  fn unset_values_fall_back_to_defaults() {
    let values = Manager::parse(Unparsed {
      from_args: args::Values {
        config: None,
        trace: false,
      },
      from_env: env::Values {
        snmp: env::Snmp {
          host: "198.51.100.7".to_owned(),
          port: None,
          community: None,
        },
        listen: None,
      },
      from_file: file::Values::default(),
    });

    assert_eq!(values.snmp.host, "198.51.100.7");
    assert_eq!(values.snmp.port, 161);
    assert_eq!(values.snmp.community, "public");
    assert_eq!(values.snmp.timeout, chrono::Duration::milliseconds(5_000));
    assert_eq!(values.scrape.board_min, 1);
    assert_eq!(values.scrape.board_max, 2);
    assert_eq!(values.scrape.pon_min, 1);
    assert_eq!(values.scrape.pon_max, 16);
    assert_eq!(values.scrape.workers, 10);
    assert_eq!(
      values.scrape.deadline,
      chrono::Duration::milliseconds(30_000)
    );
    assert_eq!(values.scrape.timezone, chrono_tz::Tz::Asia__Jakarta);
    assert_eq!(values.listen, "0.0.0.0:8081");
    assert_eq!(
      values.scrape_interval,
      chrono::Duration::milliseconds(60_000)
    );
  }

  #[test]
  fn file_and_env_values_override_defaults() {
    let values = Manager::parse(Unparsed {
      from_args: args::Values {
        config: None,
        trace: false,
      },
      from_env: env::Values {
        snmp: env::Snmp {
          host: "198.51.100.7".to_owned(),
          port: Some("1161".to_owned()),
          community: Some("campus".to_owned()),
        },
        listen: Some("127.0.0.1:9000".to_owned()),
      },
      from_file: file::Values {
        log_level: Some(file::LogLevel::Warn),
        scrape_interval: Some(15_000),
        snmp: file::Snmp {
          timeout: Some(2_000),
        },
        scrape: file::Scrape {
          board_max: Some(1),
          workers: Some(4),
          ..file::Scrape::default()
        },
      },
    });

    assert_eq!(values.snmp.port, 1_161);
    assert_eq!(values.snmp.community, "campus");
    assert_eq!(values.listen, "127.0.0.1:9000");
    assert_eq!(values.scrape.board_max, 1);
    assert_eq!(values.scrape.workers, 4);
    assert_eq!(
      values.log_level,
      tracing::level_filters::LevelFilter::WARN
    );
  }
}
