use std::collections::HashMap;

use chrono::{DateTime, NaiveDateTime, Utc};

pub(crate) const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Link state as reported by the device.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) enum Status {
  #[default]
  Unknown,
  Online,
  DyingGasp,
  Los,
  PowerOff,
}

impl Status {
  pub(crate) fn code(self) -> i64 {
    match self {
      Status::Unknown => 0,
      Status::Online => 1,
      Status::DyingGasp => 2,
      Status::Los => 3,
      Status::PowerOff => 4,
    }
  }
}

/// A device found during discovery, before its details are fetched.
#[derive(Debug, Clone)]
pub(crate) struct DeviceSummary {
  pub(crate) board: u8,
  pub(crate) pon: u8,
  pub(crate) id: u64,
  pub(crate) name: String,
}

/// The full health record for one device. String fields degrade to empty
/// when the device returns nothing usable for them.
#[derive(Debug, Clone, Default)]
pub(crate) struct DeviceRecord {
  pub(crate) board: u8,
  pub(crate) pon: u8,
  pub(crate) id: u64,
  pub(crate) name: String,
  pub(crate) kind: String,
  pub(crate) serial_number: String,
  pub(crate) rx_power: Option<f64>,
  pub(crate) tx_power: Option<f64>,
  pub(crate) status: Status,
  pub(crate) ip_address: String,
  pub(crate) description: String,
  pub(crate) last_online: String,
  pub(crate) last_offline: String,
  pub(crate) last_offline_reason: String,
  pub(crate) distance: String,
  pub(crate) uptime: String,
  pub(crate) last_down_duration: String,
}

/// Records from one collection cycle, keyed by serial number.
pub(crate) type ScrapeResult = HashMap<String, DeviceRecord>;

pub(crate) fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
  NaiveDateTime::parse_from_str(text, TIMESTAMP_FORMAT).ok()
}

pub(crate) fn format_duration(duration: chrono::Duration) -> String {
  let seconds = duration.num_seconds();
  format!(
    "{} days {} hours {} minutes {} seconds",
    seconds / 86_400,
    seconds % 86_400 / 3_600,
    seconds % 3_600 / 60,
    seconds % 60,
  )
}

/// How long the device has been up, as of `now` in UTC. The device stamps
/// its last-online time in its local clock, so `correction` shifts it back
/// to UTC before subtracting. Unparseable or future stamps yield nothing.
pub(crate) fn uptime(
  last_online: &str,
  now: DateTime<Utc>,
  correction: chrono::Duration,
) -> String {
  let Some(online) = parse_timestamp(last_online) else {
    return String::new();
  };
  let elapsed = now.naive_utc() - (online - correction);
  if elapsed < chrono::Duration::zero() {
    return String::new();
  }
  format_duration(elapsed)
}

/// The span between the last offline and last online stamps. Both stamps
/// come from the same device clock, so no correction applies.
pub(crate) fn last_down_duration(
  last_online: &str,
  last_offline: &str,
) -> String {
  let (Some(online), Some(offline)) =
    (parse_timestamp(last_online), parse_timestamp(last_offline))
  else {
    return String::new();
  };
  let downtime = online - offline;
  if downtime < chrono::Duration::zero() {
    return String::new();
  }
  format_duration(downtime)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
  use chrono::TimeZone;

  use super::*;

  #[test]
  fn status_codes() {
    assert_eq!(Status::Unknown.code(), 0);
    assert_eq!(Status::Online.code(), 1);
    assert_eq!(Status::DyingGasp.code(), 2);
    assert_eq!(Status::Los.code(), 3);
    assert_eq!(Status::PowerOff.code(), 4);
  }

  #[test]
  fn formats_durations() {
    let duration = chrono::Duration::seconds(93_784);
    assert_eq!(
      format_duration(duration),
      "1 days 2 hours 3 minutes 4 seconds"
    );
    assert_eq!(
      format_duration(chrono::Duration::zero()),
      "0 days 0 hours 0 minutes 0 seconds"
    );
  }

  #[test]
  fn uptime_applies_the_clock_correction() {
    let now = Utc.with_ymd_and_hms(2024, 5, 17, 12, 0, 0).unwrap();
    // Device clock runs seven hours ahead of UTC.
    let correction = chrono::Duration::hours(7);
    let up = uptime("2024-05-17 08:30:00", now, correction);
    assert_eq!(up, "0 days 10 hours 30 minutes 0 seconds");
  }

  #[test]
  fn uptime_omits_unparseable_or_future_stamps() {
    let now = Utc.with_ymd_and_hms(2024, 5, 17, 12, 0, 0).unwrap();
    assert_eq!(uptime("garbage", now, chrono::Duration::zero()), "");
    assert_eq!(
      uptime("2024-05-18 00:00:00", now, chrono::Duration::zero()),
      ""
    );
  }

  #[test]
  fn down_duration_between_stamps() {
    let down =
      last_down_duration("2024-05-17 08:30:00", "2024-05-17 08:00:00");
    assert_eq!(down, "0 days 0 hours 30 minutes 0 seconds");
  }

  #[test]
  fn down_duration_omits_missing_or_inverted_stamps() {
    assert_eq!(last_down_duration("", "2024-05-17 08:00:00"), "");
    assert_eq!(last_down_duration("2024-05-17 08:30:00", ""), "");
    assert_eq!(
      last_down_duration("2024-05-17 08:00:00", "2024-05-17 08:30:00"),
      ""
    );
  }
}
