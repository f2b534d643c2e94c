use prometheus::{
  Encoder, GaugeVec, IntGaugeVec, Opts, Registry, TextEncoder,
};

use crate::service::olt::record::{
  parse_timestamp, DeviceRecord, ScrapeResult, Status,
};

/// Exposition of the latest scrape as gauge families. Numeric families are
/// keyed by serial number alone; the mapping family carries the descriptive
/// fields so topology or naming changes never break series continuity.
#[derive(Clone)]
pub(crate) struct Service {
  registry: Registry,
  status: IntGaugeVec,
  mapping_info: IntGaugeVec,
  rx_power: GaugeVec,
  tx_power: GaugeVec,
  uptime: GaugeVec,
  last_down_duration: GaugeVec,
  last_online: GaugeVec,
  last_offline: GaugeVec,
  distance: GaugeVec,
}

const IDENTITY_LABELS: &[&str] = &["serial_number"];

const MAPPING_LABELS: &[&str] = &[
  "board",
  "pon",
  "onu_id",
  "name",
  "serial_number",
  "onu_type",
  "description",
  "offline_reason",
  "ip_address",
];

// Optical modules report sentinel readings at or above 100 dBm when the
// link is down; publishing those would wreck every power dashboard.
const POWER_CEILING_DBM: f64 = 100.0;

impl Service {
  pub(crate) fn new() -> Result<Self, prometheus::Error> {
    let registry = Registry::new();

    let status = IntGaugeVec::new(
      Opts::new("zte_onu_status", "Link status code of the ONU"),
      IDENTITY_LABELS,
    )?;
    let mapping_info = IntGaugeVec::new(
      Opts::new("zte_onu_mapping_info", "Descriptive labels of the ONU"),
      MAPPING_LABELS,
    )?;
    let rx_power = GaugeVec::new(
      Opts::new("zte_onu_rx_power_dbm", "Receive optical power in dBm"),
      IDENTITY_LABELS,
    )?;
    let tx_power = GaugeVec::new(
      Opts::new("zte_onu_tx_power_dbm", "Transmit optical power in dBm"),
      IDENTITY_LABELS,
    )?;
    let uptime = GaugeVec::new(
      Opts::new("zte_onu_uptime_seconds", "Seconds since the ONU came up"),
      IDENTITY_LABELS,
    )?;
    let last_down_duration = GaugeVec::new(
      Opts::new(
        "zte_onu_last_down_duration_seconds",
        "Length of the last outage in seconds",
      ),
      IDENTITY_LABELS,
    )?;
    let last_online = GaugeVec::new(
      Opts::new(
        "zte_onu_last_online_timestamp_seconds",
        "Unix timestamp of the last time the ONU came online",
      ),
      IDENTITY_LABELS,
    )?;
    let last_offline = GaugeVec::new(
      Opts::new(
        "zte_onu_last_offline_timestamp_seconds",
        "Unix timestamp of the last time the ONU went offline",
      ),
      IDENTITY_LABELS,
    )?;
    let distance = GaugeVec::new(
      Opts::new(
        "zte_onu_gpon_optical_distance_meters",
        "Measured fiber distance to the ONU in meters",
      ),
      IDENTITY_LABELS,
    )?;

    registry.register(Box::new(status.clone()))?;
    registry.register(Box::new(mapping_info.clone()))?;
    registry.register(Box::new(rx_power.clone()))?;
    registry.register(Box::new(tx_power.clone()))?;
    registry.register(Box::new(uptime.clone()))?;
    registry.register(Box::new(last_down_duration.clone()))?;
    registry.register(Box::new(last_online.clone()))?;
    registry.register(Box::new(last_offline.clone()))?;
    registry.register(Box::new(distance.clone()))?;

    Ok(Self {
      registry,
      status,
      mapping_info,
      rx_power,
      tx_power,
      uptime,
      last_down_duration,
      last_online,
      last_offline,
      distance,
    })
  }

  /// Replaces the published series with the given scrape. Devices absent
  /// from `records` disappear rather than lingering with stale values.
  #[tracing::instrument(skip_all, fields(records = records.len()))]
  pub(crate) fn publish(&self, records: &ScrapeResult) {
    self.status.reset();
    self.mapping_info.reset();
    self.rx_power.reset();
    self.tx_power.reset();
    self.uptime.reset();
    self.last_down_duration.reset();
    self.last_online.reset();
    self.last_offline.reset();
    self.distance.reset();

    for record in records.values() {
      self.publish_record(record);
    }
  }

  fn publish_record(&self, record: &DeviceRecord) {
    let board = record.board.to_string();
    let pon = record.pon.to_string();
    let id = record.id.to_string();
    let identity = [record.serial_number.as_str()];

    self
      .status
      .with_label_values(&identity)
      .set(record.status.code());
    self
      .mapping_info
      .with_label_values(&[
        &board,
        &pon,
        &id,
        &record.name,
        &record.serial_number,
        &record.kind,
        &record.description,
        &record.last_offline_reason,
        &record.ip_address,
      ])
      .set(1);

    if record.status == Status::Online {
      if let Some(rx) = record.rx_power.filter(|rx| *rx < POWER_CEILING_DBM)
      {
        self.rx_power.with_label_values(&identity).set(rx);
      }
      if let Some(tx) = record.tx_power.filter(|tx| *tx < POWER_CEILING_DBM)
      {
        self.tx_power.with_label_values(&identity).set(tx);
      }
    }

    self
      .uptime
      .with_label_values(&identity)
      .set(duration_seconds(&record.uptime));
    self
      .last_down_duration
      .with_label_values(&identity)
      .set(duration_seconds(&record.last_down_duration));
    self
      .last_online
      .with_label_values(&identity)
      .set(epoch_seconds(&record.last_online));
    self
      .last_offline
      .with_label_values(&identity)
      .set(epoch_seconds(&record.last_offline));

    match record.distance.parse::<f64>() {
      Ok(meters) => {
        self.distance.with_label_values(&identity).set(meters);
      }
      Err(_) if record.distance.is_empty() => {}
      Err(_) => {
        tracing::warn!(
          "Skipping unparseable distance {:?} for serial {}",
          record.distance,
          record.serial_number
        );
      }
    }
  }

  pub(crate) fn encode(&self) -> Result<String, prometheus::Error> {
    let mut buffer = Vec::new();
    TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
    Ok(String::from_utf8_lossy(&buffer).to_string())
  }
}

/// Parses "D days H hours M minutes S seconds" into seconds. Unknown or
/// empty renderings count as zero.
fn duration_seconds(text: &str) -> f64 {
  let mut total = 0.0;
  let mut parts = text.split_whitespace();
  while let (Some(amount), Some(unit)) = (parts.next(), parts.next()) {
    let Ok(amount) = amount.parse::<f64>() else {
      return 0.0;
    };
    let multiplier = match unit {
      "days" | "day" => 86_400.0,
      "hours" | "hour" => 3_600.0,
      "minutes" | "minute" => 60.0,
      "seconds" | "second" => 1.0,
      _ => return 0.0,
    };
    total += amount * multiplier;
  }
  total
}

fn epoch_seconds(text: &str) -> f64 {
  parse_timestamp(text)
    .map(|stamp| stamp.and_utc().timestamp() as f64)
    .unwrap_or(0.0)
}
