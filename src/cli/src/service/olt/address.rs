use std::collections::HashMap;
use std::fmt::Display;

use once_cell::sync::Lazy;

// The C320 hangs every per-ONU attribute table off one of two vendor base
// prefixes, with a per-(board, pon) interface index spliced in between the
// attribute branch and the ONU id. The indices follow no single arithmetic
// rule across boards, so they live in an explicit table.

/// One management-tree address, stored as its numeric arcs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) struct Oid(Vec<u64>);

impl Oid {
  pub(crate) fn from_arcs(arcs: Vec<u64>) -> Self {
    Self(arcs)
  }

  pub(crate) fn arcs(&self) -> &[u64] {
    &self.0
  }

  /// The address extended with one more arc.
  pub(crate) fn child(&self, arc: u64) -> Self {
    let mut arcs = self.0.clone();
    arcs.push(arc);
    Self(arcs)
  }

  pub(crate) fn last(&self) -> Option<u64> {
    self.0.last().copied()
  }

  pub(crate) fn starts_with(&self, prefix: &Oid) -> bool {
    self.0.len() >= prefix.0.len() && self.0[..prefix.0.len()] == prefix.0[..]
  }
}

impl Display for Oid {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let mut arcs = self.0.iter();
    if let Some(first) = arcs.next() {
      write!(f, "{first}")?;
    }
    for arc in arcs {
      write!(f, ".{arc}")?;
    }
    Ok(())
  }
}

/// Every per-ONU attribute subtree for one (board, pon) cell. Appending the
/// ONU id (and a trailing `.1` for rx/tx/ip) yields the leaf for one device.
#[derive(Debug, Clone)]
pub(crate) struct AddressSet {
  pub(crate) name: Oid,
  pub(crate) kind: Oid,
  pub(crate) serial_number: Oid,
  pub(crate) rx_power: Oid,
  pub(crate) tx_power: Oid,
  pub(crate) status: Oid,
  pub(crate) ip_address: Oid,
  pub(crate) description: Oid,
  pub(crate) last_online: Oid,
  pub(crate) last_offline: Oid,
  pub(crate) last_offline_reason: Oid,
  pub(crate) distance: Oid,
}

#[derive(Debug, thiserror::Error)]
pub(crate) enum AddressError {
  #[error("No address set for board {board} pon {pon}")]
  NotFound { board: u8, pon: u8 },
}

/// Resolves the address set for one (board, pon) cell.
///
/// Total over boards {1, 2} and pons 1..=16 and deterministic; anything else
/// fails instead of silently polling the wrong subtree.
pub(crate) fn resolve(
  board: u8,
  pon: u8,
) -> Result<&'static AddressSet, AddressError> {
  TABLE
    .get(&(board, pon))
    .ok_or(AddressError::NotFound { board, pon })
}

const BASE_ONU: &[u64] = &[1, 3, 6, 1, 4, 1, 3902, 1012, 3];
const BASE_IFACE: &[u64] = &[1, 3, 6, 1, 4, 1, 3902, 1082, 500];

const NAME_BRANCH: &[u64] = &[28, 1, 1, 3];
const DESCRIPTION_BRANCH: &[u64] = &[28, 1, 1, 2];
const SERIAL_NUMBER_BRANCH: &[u64] = &[28, 1, 1, 5];
const STATUS_BRANCH: &[u64] = &[28, 2, 1, 4];
const LAST_ONLINE_BRANCH: &[u64] = &[28, 2, 1, 13];
const LAST_OFFLINE_BRANCH: &[u64] = &[28, 2, 1, 14];
const OFFLINE_REASON_BRANCH: &[u64] = &[28, 2, 1, 15];
const RX_POWER_BRANCH: &[u64] = &[50, 12, 1, 1, 10];
const DISTANCE_BRANCH: &[u64] = &[50, 12, 1, 1, 18];
const TYPE_BRANCH: &[u64] = &[10, 2, 3, 3, 1, 2];
const TX_POWER_BRANCH: &[u64] = &[20, 2, 2, 2, 1, 10];
const IP_ADDRESS_BRANCH: &[u64] = &[10, 2, 3, 8, 1, 4];

/// Interface index per (board, pon). Extending the device means adding rows.
const PON_IFINDEX: &[(u8, u8, u64)] = &[
  (1, 1, 268_501_248),
  (1, 2, 268_501_504),
  (1, 3, 268_501_760),
  (1, 4, 268_502_016),
  (1, 5, 268_502_272),
  (1, 6, 268_502_528),
  (1, 7, 268_502_784),
  (1, 8, 268_503_040),
  (1, 9, 268_503_296),
  (1, 10, 268_503_552),
  (1, 11, 268_503_808),
  (1, 12, 268_504_064),
  (1, 13, 268_504_320),
  (1, 14, 268_504_576),
  (1, 15, 268_504_832),
  (1, 16, 268_505_088),
  (2, 1, 285_278_464),
  (2, 2, 285_278_720),
  (2, 3, 285_278_976),
  (2, 4, 285_279_232),
  (2, 5, 285_279_488),
  (2, 6, 285_279_744),
  (2, 7, 285_280_000),
  (2, 8, 285_280_256),
  (2, 9, 285_280_512),
  (2, 10, 285_280_768),
  (2, 11, 285_281_024),
  (2, 12, 285_281_280),
  (2, 13, 285_281_536),
  (2, 14, 285_281_792),
  (2, 15, 285_282_048),
  (2, 16, 285_282_304),
];

static TABLE: Lazy<HashMap<(u8, u8), AddressSet>> = Lazy::new(|| {
  PON_IFINDEX
    .iter()
    .map(|&(board, pon, ifindex)| ((board, pon), AddressSet::new(ifindex)))
    .collect()
});

impl AddressSet {
  fn new(ifindex: u64) -> Self {
    Self {
      name: subtree(BASE_ONU, NAME_BRANCH, ifindex),
      kind: subtree(BASE_IFACE, TYPE_BRANCH, ifindex),
      serial_number: subtree(BASE_ONU, SERIAL_NUMBER_BRANCH, ifindex),
      rx_power: subtree(BASE_ONU, RX_POWER_BRANCH, ifindex),
      tx_power: subtree(BASE_IFACE, TX_POWER_BRANCH, ifindex),
      status: subtree(BASE_ONU, STATUS_BRANCH, ifindex),
      ip_address: subtree(BASE_IFACE, IP_ADDRESS_BRANCH, ifindex),
      description: subtree(BASE_ONU, DESCRIPTION_BRANCH, ifindex),
      last_online: subtree(BASE_ONU, LAST_ONLINE_BRANCH, ifindex),
      last_offline: subtree(BASE_ONU, LAST_OFFLINE_BRANCH, ifindex),
      last_offline_reason: subtree(BASE_ONU, OFFLINE_REASON_BRANCH, ifindex),
      distance: subtree(BASE_ONU, DISTANCE_BRANCH, ifindex),
    }
  }
}

fn subtree(base: &[u64], branch: &[u64], ifindex: u64) -> Oid {
  let mut arcs = Vec::with_capacity(base.len() + branch.len() + 1);
  arcs.extend_from_slice(base);
  arcs.extend_from_slice(branch);
  arcs.push(ifindex);
  Oid(arcs)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
  use std::collections::HashSet;

  use super::*;

  #[test]
  fn resolves_every_supported_cell() {
    for board in 1..=2 {
      for pon in 1..=16 {
        assert!(resolve(board, pon).is_ok(), "board {board} pon {pon}");
      }
    }
  }

  #[test]
  fn rejects_cells_outside_the_matrix() {
    for (board, pon) in [(0, 1), (3, 1), (1, 0), (1, 17), (255, 255)] {
      assert!(matches!(
        resolve(board, pon),
        Err(AddressError::NotFound { .. })
      ));
    }
  }

  #[test]
  fn resolution_is_deterministic() {
    let first = resolve(1, 4).unwrap();
    let second = resolve(1, 4).unwrap();
    assert_eq!(first.name, second.name);
    assert_eq!(first.distance, second.distance);
  }

  #[test]
  fn every_cell_has_a_distinct_subtree() {
    let names = PON_IFINDEX
      .iter()
      .map(|&(board, pon, _)| resolve(board, pon).unwrap().name.clone())
      .collect::<HashSet<_>>();
    assert_eq!(names.len(), PON_IFINDEX.len());
  }

  #[test]
  fn oid_display_and_child() {
    let oid = Oid::from_arcs(vec![1, 3, 6]).child(42);
    assert_eq!(oid.to_string(), "1.3.6.42");
    assert_eq!(oid.last(), Some(42));
    assert!(oid.starts_with(&Oid::from_arcs(vec![1, 3, 6])));
    assert!(!oid.starts_with(&Oid::from_arcs(vec![1, 3, 7])));
  }
}
