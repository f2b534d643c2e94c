use futures_time::future::FutureExt;
use snmp2::AsyncSession;

use crate::service::olt::address::Oid;

/// A value read off the wire, reduced to the shapes the decoders consume.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum RawValue {
  Int(i64),
  Bytes(Vec<u8>),
  Absent,
}

/// One address paired with whatever the device returned for it.
#[derive(Debug, Clone)]
pub(crate) struct Binding {
  pub(crate) oid: Oid,
  pub(crate) value: RawValue,
}

#[derive(Debug, thiserror::Error)]
pub(crate) enum TransportError {
  #[error("Failed sending request: {0}")]
  Request(anyhow::Error),

  #[error("Request timed out: {0}")]
  Timeout(anyhow::Error),

  #[error("Invalid object identifier: {0}")]
  InvalidOid(String),
}

/// Read access to the device management tree.
#[async_trait::async_trait]
pub(crate) trait Transport: Send + Sync {
  /// Reads every binding underneath `root`, in address order.
  async fn walk(
    &self,
    root: &Oid,
    timeout: chrono::Duration,
  ) -> Result<Vec<Binding>, TransportError>;

  /// Reads the given addresses in a single request. Addresses the device
  /// does not expose are simply missing from the result.
  async fn get(
    &self,
    oids: &[Oid],
    timeout: chrono::Duration,
  ) -> Result<Vec<Binding>, TransportError>;
}

/// SNMPv2c client speaking to one device.
#[derive(Debug, Clone)]
pub(crate) struct Client {
  target: String,
  community: Vec<u8>,
}

const BULK_REPETITIONS: u32 = 32;

impl Client {
  pub(crate) fn new(host: &str, port: u16, community: &str) -> Self {
    Self {
      target: format!("{host}:{port}"),
      community: community.as_bytes().to_vec(),
    }
  }

  async fn session(&self) -> Result<AsyncSession, TransportError> {
    AsyncSession::new_v2c(self.target.as_str(), &self.community, 0)
      .await
      .map_err(|error| TransportError::Request(error.into()))
  }
}

#[async_trait::async_trait]
impl Transport for Client {
  #[tracing::instrument(skip(self))]
  async fn walk(
    &self,
    root: &Oid,
    timeout: chrono::Duration,
  ) -> Result<Vec<Binding>, TransportError> {
    let run = async {
      let mut session = self.session().await?;
      let mut bindings = Vec::new();
      let mut current = root.clone();
      loop {
        let request = to_snmp_oid(&current)?;
        let response = session
          .getbulk(&[&request], 0, BULK_REPETITIONS)
          .await
          .map_err(|error| TransportError::Request(error.into()))?;
        let before = bindings.len();
        for (oid, value) in response.varbinds {
          let oid = from_snmp_oid(&oid)?;
          if !oid.starts_with(root) {
            return Ok(bindings);
          }
          current = oid.clone();
          bindings.push(Binding {
            oid,
            value: to_raw(&value),
          });
        }
        if bindings.len() == before {
          return Ok(bindings);
        }
      }
    };

    run
      .timeout(to_futures_duration(timeout))
      .await
      .map_err(|error| TransportError::Timeout(error.into()))?
  }

  #[tracing::instrument(skip(self, oids), fields(count = oids.len()))]
  async fn get(
    &self,
    oids: &[Oid],
    timeout: chrono::Duration,
  ) -> Result<Vec<Binding>, TransportError> {
    let run = async {
      let mut session = self.session().await?;
      // A single bulk request with one non-repeater per address reads each
      // address's successor. Asking for each predecessor therefore lands on
      // the address itself when it exists; when it does not, the response
      // holds some other address and the field stays unmatched.
      let predecessors = oids
        .iter()
        .map(|oid| to_snmp_oid(&predecessor(oid)))
        .collect::<Result<Vec<_>, _>>()?;
      let request = predecessors.iter().collect::<Vec<_>>();
      let response = session
        .getbulk(&request, oids.len() as u32, 0)
        .await
        .map_err(|error| TransportError::Request(error.into()))?;
      let mut bindings = Vec::new();
      for (oid, value) in response.varbinds {
        bindings.push(Binding {
          oid: from_snmp_oid(&oid)?,
          value: to_raw(&value),
        });
      }
      Ok(bindings)
    };

    run
      .timeout(to_futures_duration(timeout))
      .await
      .map_err(|error| TransportError::Timeout(error.into()))?
  }
}

/// The address whose successor in the tree is `oid` itself.
fn predecessor(oid: &Oid) -> Oid {
  let mut arcs = oid.arcs().to_vec();
  if let Some(last) = arcs.last_mut() {
    *last = last.saturating_sub(1);
  }
  Oid::from_arcs(arcs)
}

fn to_snmp_oid(oid: &Oid) -> Result<snmp2::Oid<'static>, TransportError> {
  let arcs = oid.arcs().to_vec();
  snmp2::Oid::from(&arcs)
    .map_err(|_| TransportError::InvalidOid(oid.to_string()))
}

fn from_snmp_oid(oid: &snmp2::Oid<'_>) -> Result<Oid, TransportError> {
  let text = oid.to_string();
  let arcs = text
    .split('.')
    .map(str::parse::<u64>)
    .collect::<Result<Vec<_>, _>>()
    .map_err(|_| TransportError::InvalidOid(text.clone()))?;
  Ok(Oid::from_arcs(arcs))
}

fn to_raw(value: &snmp2::Value<'_>) -> RawValue {
  match value {
    snmp2::Value::Integer(int) => RawValue::Int(*int),
    snmp2::Value::OctetString(bytes) => RawValue::Bytes(bytes.to_vec()),
    snmp2::Value::Counter32(int) => RawValue::Int(i64::from(*int)),
    snmp2::Value::Unsigned32(int) => RawValue::Int(i64::from(*int)),
    snmp2::Value::Timeticks(int) => RawValue::Int(i64::from(*int)),
    snmp2::Value::Counter64(int) => RawValue::Int(*int as i64),
    snmp2::Value::IpAddress(octets) => {
      let dotted = format!(
        "{}.{}.{}.{}",
        octets[0], octets[1], octets[2], octets[3]
      );
      RawValue::Bytes(dotted.into_bytes())
    }
    _ => RawValue::Absent,
  }
}

fn to_futures_duration(
  duration: chrono::Duration,
) -> futures_time::time::Duration {
  futures_time::time::Duration::from_millis(
    duration.num_milliseconds().max(0) as u64,
  )
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
  use super::*;

  #[test]
  fn predecessor_decrements_the_last_arc() {
    let oid = Oid::from_arcs(vec![1, 3, 6, 10]);
    assert_eq!(predecessor(&oid), Oid::from_arcs(vec![1, 3, 6, 9]));
  }

  #[test]
  fn predecessor_saturates_at_zero() {
    let oid = Oid::from_arcs(vec![1, 3, 6, 0]);
    assert_eq!(predecessor(&oid), Oid::from_arcs(vec![1, 3, 6, 0]));
  }
}
