#[derive(Debug, Clone)]
pub(crate) struct Snmp {
  pub(crate) host: String,
  pub(crate) port: Option<String>,
  pub(crate) community: Option<String>,
}

#[derive(Debug, Clone)]
pub(crate) struct Values {
  pub(crate) snmp: Snmp,
  pub(crate) listen: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub(crate) enum ParseError {
  #[error("Failed reading env var")]
  EnvVarRead(#[from] std::env::VarError),
}

pub(crate) fn parse() -> Result<Values, ParseError> {
  let _ = dotenv::dotenv();

  let values = Values {
    snmp: Snmp {
      host: std::env::var("EGRET_SNMP_HOST")?,
      port: std::env::var("EGRET_SNMP_PORT").ok(),
      community: std::env::var("EGRET_SNMP_COMMUNITY").ok(),
    },
    listen: std::env::var("EGRET_LISTEN").ok(),
  };

  Ok(values)
}
