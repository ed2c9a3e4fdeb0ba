// 📍 Coordinate Normalizer
//
// Source grid (StatsBomb): 120 x 80 units, origin at the top-left corner,
// x toward the opponent goal, y toward the bottom touchline.
//
// CDF grid: origin at the centre spot, metres on a 105 x 68 reference pitch,
// x toward the opponent goal, y toward the top touchline.
//
//   x' = (x / L_src - 0.5) * L_ref
//   y' = (0.5 - y / W_src) * W_ref
//   z' = z * L_ref / L_src

use crate::config::{PipelineConfig, PitchDimensions};
use serde::{Deserialize, Serialize};

/// Point in CDF coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizedPoint {
    pub x: f64,
    pub y: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z: Option<f64>,
    /// false when the source point overshot the pitch and was clamped
    pub in_bounds: bool,
}

/// Affine map between the source grid and the CDF grid
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordinateNormalizer {
    source: PitchDimensions,
    reference: PitchDimensions,
    tolerance: f64,
}

impl CoordinateNormalizer {
    pub fn new(source: PitchDimensions, reference: PitchDimensions, tolerance: f64) -> Self {
        CoordinateNormalizer {
            source,
            reference,
            tolerance,
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(config.source_pitch, config.reference_pitch, config.bounds_tolerance)
    }

    /// Normalize one source point.
    ///
    /// Overshoot within `tolerance` is clamped silently; beyond it the point is
    /// clamped and `in_bounds` is false. Never fails.
    pub fn normalize(&self, x: f64, y: f64, z: Option<f64>) -> NormalizedPoint {
        let overshoot = self.overshoot(x, y);
        let cx = clamp_finite(x, self.source.length);
        let cy = clamp_finite(y, self.source.width);

        NormalizedPoint {
            x: (cx / self.source.length - 0.5) * self.reference.length,
            y: (0.5 - cy / self.source.width) * self.reference.width,
            z: z.map(|h| h.max(0.0) * self.length_ratio()),
            in_bounds: overshoot <= self.tolerance,
        }
    }

    /// Normalize a `[x, y]` / `[x, y, z]` slice; `None` for anything shorter
    pub fn normalize_slice(&self, coords: &[f64]) -> Option<NormalizedPoint> {
        match coords {
            [x, y] => Some(self.normalize(*x, *y, None)),
            [x, y, z, ..] => Some(self.normalize(*x, *y, Some(*z))),
            _ => None,
        }
    }

    /// Inverse transform back to source units
    pub fn denormalize(&self, point: &NormalizedPoint) -> (f64, f64, Option<f64>) {
        let x = (point.x / self.reference.length + 0.5) * self.source.length;
        let y = (0.5 - point.y / self.reference.width) * self.source.width;
        let z = point.z.map(|h| h / self.length_ratio());
        (x, y, z)
    }

    fn length_ratio(&self) -> f64 {
        self.reference.length / self.source.length
    }

    /// Distance outside the source extent (0.0 when inside). NaN counts as infinitely far.
    fn overshoot(&self, x: f64, y: f64) -> f64 {
        if !x.is_finite() || !y.is_finite() {
            return f64::INFINITY;
        }
        let dx = (-x).max(x - self.source.length).max(0.0);
        let dy = (-y).max(y - self.source.width).max(0.0);
        dx.max(dy)
    }
}

impl Default for CoordinateNormalizer {
    fn default() -> Self {
        Self::from_config(&PipelineConfig::default())
    }
}

fn clamp_finite(value: f64, max: f64) -> f64 {
    if value.is_nan() {
        max / 2.0
    } else {
        value.clamp(0.0, max)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn test_centre_spot_maps_to_origin() {
        let n = CoordinateNormalizer::default();
        let p = n.normalize(60.0, 40.0, None);
        assert!(p.x.abs() < EPS);
        assert!(p.y.abs() < EPS);
        assert!(p.in_bounds);
    }

    #[test]
    fn test_corners_and_axis_direction() {
        let n = CoordinateNormalizer::default();

        // top-left source corner -> own goal line, top touchline
        let p = n.normalize(0.0, 0.0, None);
        assert!((p.x + 52.5).abs() < EPS);
        assert!((p.y - 34.0).abs() < EPS);

        // bottom-right source corner -> opponent goal line, bottom touchline
        let p = n.normalize(120.0, 80.0, None);
        assert!((p.x - 52.5).abs() < EPS);
        assert!((p.y + 34.0).abs() < EPS);
    }

    #[test]
    fn test_height_scaled_by_length_ratio() {
        let n = CoordinateNormalizer::default();
        let p = n.normalize(120.0, 40.0, Some(2.4));
        assert!((p.z.unwrap() - 2.4 * 105.0 / 120.0).abs() < EPS);
    }

    #[test]
    fn test_small_overshoot_clamped_silently() {
        let n = CoordinateNormalizer::default();
        let p = n.normalize(120.3, -0.2, None);
        assert!(p.in_bounds);
        assert!((p.x - 52.5).abs() < EPS);
        assert!((p.y - 34.0).abs() < EPS);
    }

    #[test]
    fn test_large_overshoot_flagged() {
        let n = CoordinateNormalizer::default();
        let p = n.normalize(125.0, 40.0, None);
        assert!(!p.in_bounds);
        assert!((p.x - 52.5).abs() < EPS);

        let p = n.normalize(f64::NAN, 40.0, None);
        assert!(!p.in_bounds);
        assert!(p.x.is_finite());
    }

    #[test]
    fn test_normalize_slice_shapes() {
        let n = CoordinateNormalizer::default();
        assert!(n.normalize_slice(&[1.0]).is_none());
        assert!(n.normalize_slice(&[1.0, 2.0]).unwrap().z.is_none());
        assert!(n.normalize_slice(&[1.0, 2.0, 0.5]).unwrap().z.is_some());
    }

    #[test]
    fn test_custom_pitch() {
        let n = CoordinateNormalizer::new(
            PitchDimensions::new(100.0, 100.0),
            PitchDimensions::new(100.0, 100.0),
            0.0,
        );
        let p = n.normalize(100.0, 0.0, None);
        assert!((p.x - 50.0).abs() < EPS);
        assert!((p.y - 50.0).abs() < EPS);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Property: normalize -> denormalize is the identity for in-bounds points
            #[test]
            fn prop_round_trip_in_bounds(
                x in 0.0f64..=120.0,
                y in 0.0f64..=80.0,
                z in proptest::option::of(0.0f64..10.0),
            ) {
                let n = CoordinateNormalizer::default();
                let p = n.normalize(x, y, z);
                prop_assert!(p.in_bounds);
                let (bx, by, bz) = n.denormalize(&p);
                prop_assert!((bx - x).abs() < 1e-9);
                prop_assert!((by - y).abs() < 1e-9);
                match (z, bz) {
                    (Some(a), Some(b)) => prop_assert!((a - b).abs() < 1e-9),
                    (None, None) => {}
                    _ => prop_assert!(false, "z presence changed"),
                }
            }

            /// Property: output always lies on the reference pitch
            #[test]
            fn prop_output_within_reference_pitch(
                x in -500.0f64..500.0,
                y in -500.0f64..500.0,
            ) {
                let n = CoordinateNormalizer::default();
                let p = n.normalize(x, y, None);
                prop_assert!(p.x.abs() <= 52.5 + 1e-9);
                prop_assert!(p.y.abs() <= 34.0 + 1e-9);
            }
        }
    }
}
