use chrono::NaiveDate;

use crate::service::olt::connection::RawValue;
use crate::service::olt::record::{Status, TIMESTAMP_FORMAT};

/// Plain text field. Trailing nul padding and whitespace come off.
pub(crate) fn text(value: &RawValue) -> String {
  match value {
    RawValue::Bytes(bytes) => String::from_utf8_lossy(bytes)
      .trim_matches(|character: char| {
        character == '\0' || character.is_whitespace()
      })
      .to_string(),
    _ => String::new(),
  }
}

/// Serial numbers longer than four octets carry a four letter vendor prefix
/// followed by a binary payload rendered as uppercase hexadecimal. Shorter
/// ones are plain text.
pub(crate) fn serial_number(value: &RawValue) -> String {
  let RawValue::Bytes(bytes) = value else {
    return String::new();
  };
  if bytes.len() <= 4 {
    return text(value);
  }
  let prefix = String::from_utf8_lossy(&bytes[..4]).to_string();
  let payload = bytes[4..]
    .iter()
    .map(|byte| format!("{byte:02X}"))
    .collect::<String>();
  format!("{prefix}{payload}")
}

pub(crate) fn status(value: &RawValue) -> Status {
  match value {
    RawValue::Int(1) => Status::Online,
    RawValue::Int(2) => Status::DyingGasp,
    RawValue::Int(3) => Status::Los,
    RawValue::Int(4) => Status::PowerOff,
    other => {
      tracing::warn!("Unrecognized status value {other:?}");
      Status::Unknown
    }
  }
}

/// Optical power in dBm. The device reports raw units of 0.002 dBm offset
/// by -30 dBm; the result is rounded to two decimal places.
pub(crate) fn power(value: &RawValue) -> Option<f64> {
  match value {
    RawValue::Int(raw) => {
      let dbm = (*raw as f64) * 0.002 - 30.0;
      Some((dbm * 100.0).round() / 100.0)
    }
    _ => None,
  }
}

/// Timestamps arrive as packed octets: a big endian year followed by one
/// octet each for month, day, hour, minute and second.
pub(crate) fn timestamp(value: &RawValue) -> String {
  let RawValue::Bytes(bytes) = value else {
    return String::new();
  };
  if bytes.len() < 7 {
    return String::new();
  }
  let year = (i32::from(bytes[0]) << 8) | i32::from(bytes[1]);
  let parsed = NaiveDate::from_ymd_opt(
    year,
    u32::from(bytes[2]),
    u32::from(bytes[3]),
  )
  .and_then(|date| {
    date.and_hms_opt(
      u32::from(bytes[4]),
      u32::from(bytes[5]),
      u32::from(bytes[6]),
    )
  });
  match parsed {
    Some(stamp) => stamp.format(TIMESTAMP_FORMAT).to_string(),
    None => {
      tracing::warn!("Unrepresentable timestamp octets {bytes:?}");
      String::new()
    }
  }
}

pub(crate) fn distance(value: &RawValue) -> String {
  match value {
    RawValue::Int(meters) => meters.to_string(),
    _ => String::new(),
  }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
  use super::*;

  #[test]
  fn text_trims_nul_padding() {
    let value = RawValue::Bytes(b"office-3 \0\0".to_vec());
    assert_eq!(text(&value), "office-3");
    assert_eq!(text(&RawValue::Int(7)), "");
    assert_eq!(text(&RawValue::Absent), "");
  }

  #[test]
  fn serial_number_renders_prefix_and_hex_payload() {
    let value = RawValue::Bytes(vec![b'A', b'B', b'C', b'1', 0x23]);
    assert_eq!(serial_number(&value), "ABC123");
  }

  #[test]
  fn short_serial_number_stays_plain() {
    let value = RawValue::Bytes(b"AB1".to_vec());
    assert_eq!(serial_number(&value), "AB1");
    assert_eq!(serial_number(&RawValue::Absent), "");
  }

  #[test]
  fn serial_number_is_deterministic() {
    let value = RawValue::Bytes(vec![b'Z', b'T', b'E', b'G', 0xAB, 0x01]);
    assert_eq!(serial_number(&value), serial_number(&value));
    assert_eq!(serial_number(&value), "ZTEGAB01");
  }

  #[test]
  fn status_maps_known_codes() {
    assert_eq!(status(&RawValue::Int(1)), Status::Online);
    assert_eq!(status(&RawValue::Int(2)), Status::DyingGasp);
    assert_eq!(status(&RawValue::Int(3)), Status::Los);
    assert_eq!(status(&RawValue::Int(4)), Status::PowerOff);
    assert_eq!(status(&RawValue::Int(9)), Status::Unknown);
    assert_eq!(status(&RawValue::Absent), Status::Unknown);
  }

  #[test]
  fn power_scales_and_rounds() {
    assert_eq!(power(&RawValue::Int(7_400)), Some(-15.2));
    assert_eq!(power(&RawValue::Int(15_000)), Some(0.0));
    assert_eq!(power(&RawValue::Absent), None);
  }

  #[test]
  fn timestamp_unpacks_octets() {
    let value = RawValue::Bytes(vec![0x07, 0xE8, 5, 17, 8, 30, 0]);
    assert_eq!(timestamp(&value), "2024-05-17 08:30:00");
  }

  #[test]
  fn timestamp_rejects_malformed_octets() {
    assert_eq!(timestamp(&RawValue::Bytes(vec![0x07, 0xE8, 5])), "");
    assert_eq!(
      timestamp(&RawValue::Bytes(vec![0x07, 0xE8, 13, 40, 8, 30, 0])),
      ""
    );
    assert_eq!(timestamp(&RawValue::Int(0)), "");
  }

  #[test]
  fn distance_renders_meters() {
    assert_eq!(distance(&RawValue::Int(1_543)), "1543");
    assert_eq!(distance(&RawValue::Absent), "");
  }
}
