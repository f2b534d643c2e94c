pub(crate) mod metrics;
pub(crate) mod olt;

use crate::*;

#[derive(Debug, thiserror::Error)]
pub(crate) enum ServiceError {
  #[error("Failed registering metric families: {0}")]
  Metrics(#[from] prometheus::Error),
}

/// All long lived services, cheap to clone and hand to processes.
#[derive(Clone)]
pub(crate) struct Container {
  olt: olt::Service<olt::Client>,
  metrics: metrics::Service,
}

impl Container {
  pub(crate) fn new(config: config::Values) -> Result<Self, ServiceError> {
    let client = olt::Client::new(
      &config.snmp.host,
      config.snmp.port,
      &config.snmp.community,
    );
    Ok(Self {
      olt: olt::Service::new(
        client,
        config.snmp.timeout,
        config.scrape.timezone,
      ),
      metrics: metrics::Service::new()?,
    })
  }

  pub(crate) fn olt(&self) -> &olt::Service<olt::Client> {
    &self.olt
  }

  pub(crate) fn metrics(&self) -> &metrics::Service {
    &self.metrics
  }
}
