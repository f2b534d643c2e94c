use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{Offset, TimeZone, Utc};

use crate::service::olt::address::{self, AddressError, Oid};
use crate::service::olt::connection::{Transport, TransportError};
use crate::service::olt::decode;
use crate::service::olt::record::{
  self, DeviceRecord, DeviceSummary,
};

#[derive(Debug, thiserror::Error)]
pub(crate) enum ScanError {
  #[error("Failed resolving addresses: {0}")]
  Address(#[from] AddressError),

  #[error("Failed reading from device: {0}")]
  Transport(#[from] TransportError),
}

/// Reads device records out of one management tree.
#[derive(Debug)]
pub(crate) struct Service<T> {
  transport: Arc<T>,
  timeout: chrono::Duration,
  timezone: chrono_tz::Tz,
}

impl<T> Clone for Service<T> {
  fn clone(&self) -> Self {
    Self {
      transport: self.transport.clone(),
      timeout: self.timeout,
      timezone: self.timezone,
    }
  }
}

impl<T: Transport> Service<T> {
  pub(crate) fn new(
    transport: T,
    timeout: chrono::Duration,
    timezone: chrono_tz::Tz,
  ) -> Self {
    Self {
      transport: Arc::new(transport),
      timeout,
      timezone,
    }
  }

  /// Lists the devices present on one cell, ascending by id. Walking the
  /// name subtree is enough because every provisioned device has a name row.
  #[tracing::instrument(skip(self))]
  pub(crate) async fn discover(
    &self,
    board: u8,
    pon: u8,
  ) -> Result<Vec<DeviceSummary>, ScanError> {
    let set = address::resolve(board, pon)?;
    let bindings = self.transport.walk(&set.name, self.timeout).await?;
    let mut names = BTreeMap::new();
    for binding in bindings {
      let Some(id) = binding.oid.last() else {
        continue;
      };
      names.insert(id, decode::text(&binding.value));
    }
    Ok(
      names
        .into_iter()
        .map(|(id, name)| DeviceSummary {
          board,
          pon,
          id,
          name,
        })
        .collect(),
    )
  }

  /// Fetches the full record for one device with a single batched read.
  /// Fields the device leaves out degrade to their empty forms; only a
  /// transport failure fails the whole record.
  #[tracing::instrument(skip(self))]
  pub(crate) async fn fetch(
    &self,
    board: u8,
    pon: u8,
    id: u64,
  ) -> Result<DeviceRecord, ScanError> {
    let set = address::resolve(board, pon)?;
    let fields = FieldAddresses::new(set, id);
    let bindings = self
      .transport
      .get(&fields.ordered(), self.timeout)
      .await?;

    let mut record = DeviceRecord {
      board,
      pon,
      id,
      ..DeviceRecord::default()
    };
    for binding in &bindings {
      if binding.oid == fields.name {
        record.name = decode::text(&binding.value);
      } else if binding.oid == fields.kind {
        record.kind = decode::text(&binding.value);
      } else if binding.oid == fields.serial_number {
        record.serial_number = decode::serial_number(&binding.value);
      } else if binding.oid == fields.rx_power {
        record.rx_power = decode::power(&binding.value);
      } else if binding.oid == fields.tx_power {
        record.tx_power = decode::power(&binding.value);
      } else if binding.oid == fields.status {
        record.status = decode::status(&binding.value);
      } else if binding.oid == fields.ip_address {
        record.ip_address = decode::text(&binding.value);
      } else if binding.oid == fields.description {
        record.description = decode::text(&binding.value);
      } else if binding.oid == fields.last_online {
        record.last_online = decode::timestamp(&binding.value);
      } else if binding.oid == fields.last_offline {
        record.last_offline = decode::timestamp(&binding.value);
      } else if binding.oid == fields.last_offline_reason {
        record.last_offline_reason = decode::text(&binding.value);
      } else if binding.oid == fields.distance {
        record.distance = decode::distance(&binding.value);
      }
    }

    let now = Utc::now();
    let correction = chrono::Duration::seconds(i64::from(
      self
        .timezone
        .offset_from_utc_datetime(&now.naive_utc())
        .fix()
        .local_minus_utc(),
    ));
    record.uptime = record::uptime(&record.last_online, now, correction);
    record.last_down_duration =
      record::last_down_duration(&record.last_online, &record.last_offline);
    Ok(record)
  }
}

/// Leaf addresses for every field of one device. Matching response bindings
/// back against these keeps fields correct regardless of response order.
struct FieldAddresses {
  name: Oid,
  kind: Oid,
  serial_number: Oid,
  rx_power: Oid,
  tx_power: Oid,
  status: Oid,
  ip_address: Oid,
  description: Oid,
  last_online: Oid,
  last_offline: Oid,
  last_offline_reason: Oid,
  distance: Oid,
}

impl FieldAddresses {
  fn new(set: &address::AddressSet, id: u64) -> Self {
    Self {
      name: set.name.child(id),
      kind: set.kind.child(id),
      serial_number: set.serial_number.child(id),
      rx_power: set.rx_power.child(id).child(1),
      tx_power: set.tx_power.child(id).child(1),
      status: set.status.child(id),
      ip_address: set.ip_address.child(id).child(1),
      description: set.description.child(id),
      last_online: set.last_online.child(id),
      last_offline: set.last_offline.child(id),
      last_offline_reason: set.last_offline_reason.child(id),
      distance: set.distance.child(id),
    }
  }

  fn ordered(&self) -> Vec<Oid> {
    vec![
      self.name.clone(),
      self.kind.clone(),
      self.serial_number.clone(),
      self.rx_power.clone(),
      self.tx_power.clone(),
      self.status.clone(),
      self.ip_address.clone(),
      self.description.clone(),
      self.last_online.clone(),
      self.last_offline.clone(),
      self.last_offline_reason.clone(),
      self.distance.clone(),
    ]
  }
}
