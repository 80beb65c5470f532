//! Maps a Wi-Fi scan to a weighted-centroid position fix against the
//! anchor set, with a confidence heuristic. Grounded on the teacher's
//! accuracy-weighted measurement blending (`es_ekf::update_gps`) and its
//! `HashMap`-keyed lookup pattern for matching readings to known points.

use std::collections::HashMap;

use crate::geometry::Point2;
use crate::store_map::{normalize_bssid, StoreMapAnchor, WifiReading};

#[derive(Clone, Copy, Debug)]
pub struct WifiFix {
    pub position: Point2,
    pub matched: usize,
    pub best_rssi: f64,
}

/// Compute a weighted-centroid fix from `readings` against `anchors`.
/// Returns `None` if no reading matches a known anchor.
pub fn compute_fix(readings: &[WifiReading], anchors: &[StoreMapAnchor]) -> Option<WifiFix> {
    let anchor_by_bssid: HashMap<String, &StoreMapAnchor> = anchors
        .iter()
        .map(|a| (normalize_bssid(&a.bssid), a))
        .collect();

    let mut sum_w = 0.0;
    let mut sum_wx = 0.0;
    let mut sum_wy = 0.0;
    let mut matched = 0usize;
    let mut best_rssi = f64::NEG_INFINITY;

    for reading in readings {
        let Some(anchor) = anchor_by_bssid.get(&normalize_bssid(&reading.bssid)) else {
            continue;
        };
        matched += 1;
        if reading.level > best_rssi {
            best_rssi = reading.level;
        }
        let w = ((reading.level.clamp(-95.0, -35.0) + 100.0) / 10.0)
            .exp()
            .clamp(1.0, 400.0);
        sum_w += w;
        sum_wx += w * anchor.x;
        sum_wy += w * anchor.y;
    }

    if sum_w <= 0.0 || matched == 0 {
        return None;
    }

    Some(WifiFix {
        position: Point2::new(sum_wx / sum_w, sum_wy / sum_w),
        matched,
        best_rssi,
    })
}

/// Confidence heuristic from the best matched RSSI and match count.
/// Not claimed to be physically calibrated — pinned for determinism.
pub fn confidence(fix: &WifiFix) -> f64 {
    let base = ((fix.best_rssi + 100.0) / 55.0).clamp(0.15, 0.95);
    let bonus = (0.08 * (fix.matched as f64 - 1.0)).clamp(0.0, 0.2);
    (base + bonus).clamp(0.15, 0.98)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store_map::AnchorSource;
    use approx::assert_relative_eq;

    fn anchor(bssid: &str, x: f64, y: f64) -> StoreMapAnchor {
        StoreMapAnchor {
            bssid: bssid.to_string(),
            label: bssid.to_string(),
            x,
            y,
            floor: 1,
            source: AnchorSource::Mock,
            confidence: None,
        }
    }

    #[test]
    fn weighted_centroid_favors_stronger_signal() {
        // S3: A=(0,0) rssi=-60, B=(10,0) rssi=-80 -> x ~= 1.19
        let anchors = vec![anchor("a", 0.0, 0.0), anchor("b", 10.0, 0.0)];
        let readings = vec![
            WifiReading {
                bssid: "a".into(),
                level: -60.0,
            },
            WifiReading {
                bssid: "b".into(),
                level: -80.0,
            },
        ];
        let fix = compute_fix(&readings, &anchors).unwrap();
        assert_relative_eq!(fix.position.x, 1.19, epsilon = 0.05);
        assert_relative_eq!(fix.position.y, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn no_matching_anchor_returns_none() {
        let anchors = vec![anchor("a", 0.0, 0.0)];
        let readings = vec![WifiReading {
            bssid: "zzz".into(),
            level: -50.0,
        }];
        assert!(compute_fix(&readings, &anchors).is_none());
    }

    #[test]
    fn empty_scan_returns_none() {
        let anchors = vec![anchor("a", 0.0, 0.0)];
        assert!(compute_fix(&[], &anchors).is_none());
    }

    #[test]
    fn bssid_matching_is_case_and_whitespace_insensitive() {
        let anchors = vec![anchor("AA:BB:CC", 5.0, 5.0)];
        let readings = vec![WifiReading {
            bssid: "  aa:bb:cc  ".into(),
            level: -40.0,
        }];
        let fix = compute_fix(&readings, &anchors).unwrap();
        assert_relative_eq!(fix.position.x, 5.0, epsilon = 1e-9);
    }

    #[test]
    fn confidence_is_bounded() {
        let fix = WifiFix {
            position: Point2::new(0.0, 0.0),
            matched: 5,
            best_rssi: -35.0,
        };
        let c = confidence(&fix);
        assert!(c >= 0.15 && c <= 0.98);
    }
}
