//! Gated nearest-neighbor data association.
//!
//! Every (track, measurement) pair is scored by the distance between the
//! predicted and measured box centers, and screened by four independent
//! gates. A pair that fails any gate is ineligible regardless of its total
//! cost; a pair exactly at a gate limit stays eligible. Eligible pairs are
//! resolved greedily in ascending cost order, ties going to the lower track
//! identity.

use crate::types::Measurement;

/// Gate thresholds, each applied independently.
#[derive(Clone, Debug)]
pub struct GateConfig {
    /// Maximum center distance over all position components (also the cost).
    pub dist_threshold: f64,
    /// Maximum planar (x, y) box-center distance.
    pub center_threshold: f64,
    /// Maximum box-area ratio (larger over smaller).
    pub area_threshold: f64,
    /// Minimum aspect-ratio agreement (smaller over larger), in (0, 1].
    pub body_ratio: f64,
}

/// A gate-passing candidate pair, indices into the frame's track/measurement
/// lists.
#[derive(Clone, Debug)]
pub struct CandidatePair {
    pub track_idx: usize,
    pub meas_idx: usize,
    pub cost: f64,
}

/// One-to-one assignment for a frame.
#[derive(Clone, Debug, Default)]
pub struct Assignment {
    pub pairs: Vec<(usize, usize)>,
    /// Track indices with no matched measurement (missed detections).
    pub unmatched_tracks: Vec<usize>,
    /// Measurement indices with no matched track (track-birth candidates).
    pub unmatched_meas: Vec<usize>,
}

/// Score one (predicted track, measurement) pair. Returns `None` when any
/// gate fails; otherwise the association cost (center distance).
pub fn gated_cost(
    track_position: &[f64],
    track_size: &[f64],
    m: &Measurement,
    gates: &GateConfig,
) -> Option<f64> {
    // Center distance over the shared position components.
    let dist = euclidean(track_position, &m.position);
    if !dist.is_finite() || dist > gates.dist_threshold {
        return None;
    }

    // Planar box-center gate (x, y only).
    let center = euclidean(&track_position[..2], &m.position[..2]);
    if center > gates.center_threshold {
        return None;
    }

    // Area-ratio gate. A degenerate box never associates.
    let track_area = track_size[0] * track_size[1];
    let meas_area = m.area();
    if track_area <= 0.0 || meas_area <= 0.0 {
        return None;
    }
    let area_ratio = track_area.max(meas_area) / track_area.min(meas_area);
    if area_ratio > gates.area_threshold {
        return None;
    }

    // Aspect ("body ratio") gate: how well the two w/h ratios agree.
    let track_aspect = track_size[0] / track_size[1];
    let meas_aspect = m.aspect();
    let agreement = track_aspect.min(meas_aspect) / track_aspect.max(meas_aspect);
    if !(agreement >= gates.body_ratio) {
        return None;
    }

    Some(dist)
}

/// Resolve gate-passing pairs into a one-to-one assignment, greedily taking
/// the cheapest remaining pair. Ties break toward the lower track index
/// (tracks are enumerated in identity order).
pub fn greedy_assign(pairs: &[CandidatePair], n_tracks: usize, n_meas: usize) -> Assignment {
    let mut order: Vec<usize> = (0..pairs.len()).collect();
    order.sort_by(|&a, &b| {
        let (pa, pb) = (&pairs[a], &pairs[b]);
        pa.cost
            .total_cmp(&pb.cost)
            .then(pa.track_idx.cmp(&pb.track_idx))
            .then(pa.meas_idx.cmp(&pb.meas_idx))
    });

    let mut track_taken = vec![false; n_tracks];
    let mut meas_taken = vec![false; n_meas];
    let mut matched = Vec::new();
    for idx in order {
        let pair = &pairs[idx];
        if !track_taken[pair.track_idx] && !meas_taken[pair.meas_idx] {
            track_taken[pair.track_idx] = true;
            meas_taken[pair.meas_idx] = true;
            matched.push((pair.track_idx, pair.meas_idx));
        }
    }

    Assignment {
        pairs: matched,
        unmatched_tracks: (0..n_tracks).filter(|&t| !track_taken[t]).collect(),
        unmatched_meas: (0..n_meas).filter(|&m| !meas_taken[m]).collect(),
    }
}

fn euclidean(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn gates() -> GateConfig {
        GateConfig {
            dist_threshold: 150.0,
            center_threshold: 80.0,
            area_threshold: 3.0,
            body_ratio: 0.5,
        }
    }

    #[test]
    fn nearby_same_shape_box_passes() {
        let m = Measurement::planar(105.0, 100.0, 40.0, 80.0);
        let cost = gated_cost(&[100.0, 100.0], &[40.0, 80.0], &m, &gates());
        assert_eq!(cost, Some(5.0));
    }

    #[test]
    fn each_gate_rejects_independently() {
        let g = gates();
        let base = &[100.0, 100.0][..];
        let size = &[40.0, 80.0][..];

        // Distant box: fails the distance gates.
        let far = Measurement::planar(500.0, 500.0, 40.0, 80.0);
        assert_eq!(gated_cost(base, size, &far, &g), None);

        // Same center, triple the area.
        let big = Measurement::planar(100.0, 100.0, 70.0, 140.0);
        assert_eq!(gated_cost(base, size, &big, &g), None);

        // Same center and area, inverted aspect ratio.
        let wide = Measurement::planar(100.0, 100.0, 80.0, 40.0);
        assert_eq!(gated_cost(base, size, &wide, &g), None);
    }

    #[test]
    fn pair_exactly_at_a_threshold_stays_eligible() {
        // Center distance of exactly 80 sits on the planar-center limit.
        let m = Measurement::planar(180.0, 100.0, 40.0, 80.0);
        let cost = gated_cost(&[100.0, 100.0], &[40.0, 80.0], &m, &gates());
        assert_eq!(cost, Some(80.0));
    }

    #[test]
    fn degenerate_box_never_associates() {
        let m = Measurement::planar(100.0, 100.0, 0.0, 80.0);
        assert_eq!(gated_cost(&[100.0, 100.0], &[40.0, 80.0], &m, &gates()), None);
    }

    #[test]
    fn greedy_picks_cheapest_first() {
        let pairs = vec![
            CandidatePair { track_idx: 0, meas_idx: 0, cost: 10.0 },
            CandidatePair { track_idx: 0, meas_idx: 1, cost: 1.0 },
            CandidatePair { track_idx: 1, meas_idx: 1, cost: 2.0 },
        ];
        let a = greedy_assign(&pairs, 2, 2);
        assert_eq!(a.pairs, vec![(0, 1)]);
        // Track 1's only candidate was taken, so it coasts; measurement 0 births.
        assert_eq!(a.unmatched_tracks, vec![1]);
        assert_eq!(a.unmatched_meas, vec![0]);
    }

    #[test]
    fn cost_tie_goes_to_lower_track() {
        let pairs = vec![
            CandidatePair { track_idx: 1, meas_idx: 0, cost: 5.0 },
            CandidatePair { track_idx: 0, meas_idx: 0, cost: 5.0 },
        ];
        let a = greedy_assign(&pairs, 2, 1);
        assert_eq!(a.pairs, vec![(0, 0)]);
        assert_eq!(a.unmatched_tracks, vec![1]);
    }

    #[test]
    fn empty_frame_leaves_everything_unmatched() {
        let a = greedy_assign(&[], 3, 0);
        assert_eq!(a.pairs.len(), 0);
        assert_eq!(a.unmatched_tracks, vec![0, 1, 2]);
        assert!(a.unmatched_meas.is_empty());
    }
}
