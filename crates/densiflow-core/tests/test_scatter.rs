#[allow(dead_code)]
mod common;

use approx::assert_abs_diff_eq;
use ndarray::Array2;

use densiflow_core::accumulator::FlowAccumulator;
use densiflow_core::densify::{patch_weight, scatter_patch};
use densiflow_core::error::FlowError;
use densiflow_core::params::{OptParams, WeightRule};
use densiflow_core::patch::{Footprint, PatchEstimate};

use common::{image, opt, ramp_patch};

fn assert_untouched(acc: &FlowAccumulator) {
    assert!(acc.weights().iter().all(|&w| w == 0.0));
    let (sx, sy) = acc.flow_sums();
    assert!(sx.iter().chain(sy.iter()).all(|&v| v == 0.0));
}

// ---------------------------------------------------------------------------
// Weighting rule
// ---------------------------------------------------------------------------

#[test]
fn test_additive_weight_inverts_cost_plus_floor() {
    let o = opt(4, 0.01);
    assert_abs_diff_eq!(patch_weight(0.5, &o), 1.0 / 0.51, epsilon = 1e-5);
    assert_abs_diff_eq!(patch_weight(0.0, &o), 100.0, epsilon = 1e-3);
}

#[test]
fn test_weight_uses_cost_magnitude() {
    let o = opt(4, 0.01);
    assert_eq!(patch_weight(-0.5, &o), patch_weight(0.5, &o));
}

#[test]
fn test_weight_stays_finite_as_cost_vanishes() {
    let o = opt(4, 0.01);
    let mut previous = 0.0;
    for cost in [1.0, 0.1, 1e-3, 1e-6, 1e-12, 0.0] {
        let w = patch_weight(cost, &o);
        assert!(w.is_finite());
        assert!(w >= previous, "weight must grow as cost shrinks");
        assert!(w <= 1.0 / 0.01 + 1e-3);
        previous = w;
    }
    assert_abs_diff_eq!(previous, 100.0, epsilon = 1e-3);
}

#[test]
fn test_floor_rule_clamps_small_costs() {
    let o = OptParams {
        weight_rule: WeightRule::Floor,
        ..opt(4, 0.01)
    };
    assert_abs_diff_eq!(patch_weight(0.5, &o), 2.0, epsilon = 1e-6);
    assert_abs_diff_eq!(patch_weight(0.001, &o), 100.0, epsilon = 1e-3);
    assert_abs_diff_eq!(patch_weight(0.0, &o), 100.0, epsilon = 1e-3);
}

// ---------------------------------------------------------------------------
// Footprint
// ---------------------------------------------------------------------------

#[test]
fn test_footprint_centered_on_midpoint() {
    let fp = Footprint::around((4.0, 5.0), &image(10, 10), 4);
    assert_eq!((fp.x_start, fp.x_end), (2, 6));
    assert_eq!((fp.y_start, fp.y_end), (3, 7));
    assert_eq!(fp.pixel_count(), 16);
}

#[test]
fn test_footprint_clipped_at_image_corner() {
    let fp = Footprint::around((0.0, 0.0), &image(10, 10), 4);
    assert_eq!((fp.x0, fp.y0), (-2, -2));
    assert_eq!((fp.x_start, fp.x_end), (0, 2));
    assert_eq!((fp.y_start, fp.y_end), (0, 2));
    assert_eq!(fp.patch_offset(0, 0), [2, 2]);
    assert_eq!(fp.patch_offset(1, 0), [2, 3]);
}

#[test]
fn test_footprint_clipped_at_far_edge() {
    let fp = Footprint::around((9.5, 9.0), &image(10, 10), 4);
    assert_eq!((fp.x_start, fp.x_end), (7, 10));
    assert_eq!((fp.y_start, fp.y_end), (7, 10));
    assert!(fp.contains(9, 9));
    assert!(!fp.contains(6, 9));
}

#[test]
fn test_odd_patch_size_covers_full_cost_map() {
    let fp = Footprint::around((2.0, 2.0), &image(10, 10), 3);
    assert_eq!((fp.x_start, fp.x_end), (1, 4));
    assert_eq!(fp.pixel_count(), 9);
}

// ---------------------------------------------------------------------------
// Scatter
// ---------------------------------------------------------------------------

#[test]
fn test_scatter_reads_cost_at_patch_offset() {
    let img = image(6, 6);
    let o = opt(4, 0.01);
    let acc = FlowAccumulator::new(&img).unwrap();
    let patch = ramp_patch((0.0, 0.0), (1.0, 3.0), 4, 0.0);

    scatter_patch(&patch, &img, &o, &acc).unwrap();

    // Pixel (1, 0) sits at patch row 2, col 3 -> cost 2 * 4 + 3 = 11.
    assert_abs_diff_eq!(acc.weight_at(1, 0), 1.0 / 11.01, epsilon = 1e-6);
    // Pixel (0, 1) sits at patch row 3, col 2 -> cost 14.
    assert_abs_diff_eq!(acc.weight_at(0, 1), 1.0 / 14.01, epsilon = 1e-6);
    let (sx, sy) = acc.flow_sum_at(1, 0);
    assert_abs_diff_eq!(sx, 1.0 / 11.01, epsilon = 1e-6);
    assert_abs_diff_eq!(sy, 3.0 / 11.01, epsilon = 1e-6);
    // Outside the clipped footprint.
    assert_eq!(acc.weight_at(2, 0), 0.0);
    assert_eq!(acc.weight_at(0, 2), 0.0);
}

#[test]
fn test_scatter_adds_on_top_of_existing_votes() {
    let img = image(4, 4);
    let o = opt(2, 0.5);
    let acc = FlowAccumulator::new(&img).unwrap();
    let patch = PatchEstimate::uniform((1.0, 1.0), (1.0, 0.0), 2, 0.5);

    scatter_patch(&patch, &img, &o, &acc).unwrap();
    scatter_patch(&patch, &img, &o, &acc).unwrap();

    assert_abs_diff_eq!(acc.weight_at(0, 0), 2.0, epsilon = 1e-6);
    assert_abs_diff_eq!(acc.flow_sum_at(1, 1).0, 2.0, epsilon = 1e-6);
}

#[test]
fn test_invalid_patch_is_skipped() {
    let img = image(4, 4);
    let o = opt(2, 0.01);
    let acc = FlowAccumulator::new(&img).unwrap();
    let patch = PatchEstimate::uniform((1.0, 1.0), (2.0, -1.0), 2, 0.0).invalidated();

    scatter_patch(&patch, &img, &o, &acc).unwrap();
    assert_untouched(&acc);
}

#[test]
fn test_invalid_patch_contents_are_not_inspected() {
    let img = image(4, 4);
    let o = opt(2, 0.01);
    let acc = FlowAccumulator::new(&img).unwrap();
    let patch = PatchEstimate::uniform((100.0, -3.0), (2.0, -1.0), 5, f32::NAN).invalidated();

    assert!(scatter_patch(&patch, &img, &o, &acc).is_ok());
    assert_untouched(&acc);
}

#[test]
fn test_midpoint_out_of_range_rejected_before_writes() {
    let img = image(4, 4);
    let o = opt(2, 0.01);
    let acc = FlowAccumulator::new(&img).unwrap();

    for midpoint in [(4.0, 1.0), (1.0, 4.5), (-0.5, 1.0), (f32::NAN, 1.0), (1.0, f32::INFINITY)] {
        let patch = PatchEstimate::uniform(midpoint, (1.0, 1.0), 2, 0.0);
        let err = scatter_patch(&patch, &img, &o, &acc).unwrap_err();
        assert!(
            matches!(err, FlowError::MidpointOutOfRange { .. }),
            "midpoint {midpoint:?}: {err}"
        );
    }
    assert_untouched(&acc);
}

#[test]
fn test_midpoint_on_last_pixel_accepted() {
    let img = image(4, 4);
    let o = opt(2, 0.01);
    let acc = FlowAccumulator::new(&img).unwrap();
    let patch = PatchEstimate::uniform((3.9, 3.0), (1.0, 1.0), 2, 0.0);

    scatter_patch(&patch, &img, &o, &acc).unwrap();
    assert!(acc.weight_at(3, 3) > 0.0);
    assert!(acc.weight_at(2, 2) > 0.0);
}

#[test]
fn test_zero_patch_size_rejected() {
    let img = image(4, 4);
    let o = opt(0, 0.01);
    let acc = FlowAccumulator::new(&img).unwrap();
    let patch = PatchEstimate::new((1.0, 1.0), (1.0, 1.0), Array2::zeros((0, 0)));

    let err = scatter_patch(&patch, &img, &o, &acc).unwrap_err();
    assert!(matches!(err, FlowError::InvalidPatchSize(0)));
}

#[test]
fn test_non_positive_min_err_val_rejected() {
    let img = image(4, 4);
    let acc = FlowAccumulator::new(&img).unwrap();
    let patch = PatchEstimate::uniform((1.0, 1.0), (1.0, 1.0), 2, 0.0);

    for min_err_val in [0.0, -1.0, f32::NAN] {
        let err = scatter_patch(&patch, &img, &opt(2, min_err_val), &acc).unwrap_err();
        assert!(matches!(err, FlowError::InvalidMinErrVal(_)));
    }
    assert_untouched(&acc);
}

#[test]
fn test_cost_map_shape_mismatch_rejected() {
    let img = image(8, 8);
    let o = opt(4, 0.01);
    let acc = FlowAccumulator::new(&img).unwrap();
    let patch = PatchEstimate::new((4.0, 4.0), (1.0, 1.0), Array2::zeros((4, 3)));

    let err = scatter_patch(&patch, &img, &o, &acc).unwrap_err();
    assert!(matches!(
        err,
        FlowError::CostMapShape {
            rows: 4,
            cols: 3,
            expected: 4
        }
    ));
    assert_untouched(&acc);
}

#[test]
fn test_non_finite_cost_rejected() {
    let img = image(8, 8);
    let o = opt(4, 0.01);
    let acc = FlowAccumulator::new(&img).unwrap();
    let mut cost = Array2::zeros((4, 4));
    cost[[3, 1]] = f32::INFINITY;
    let patch = PatchEstimate::new((4.0, 4.0), (1.0, 1.0), cost);

    let err = scatter_patch(&patch, &img, &o, &acc).unwrap_err();
    assert!(matches!(err, FlowError::NonFiniteCost { row: 3, col: 1 }));
    assert_untouched(&acc);
}

#[test]
fn test_accumulator_dimension_mismatch_rejected() {
    let acc = FlowAccumulator::new(&image(4, 4)).unwrap();
    let patch = PatchEstimate::uniform((1.0, 1.0), (1.0, 1.0), 2, 0.0);

    let err = scatter_patch(&patch, &image(8, 4), &opt(2, 0.01), &acc).unwrap_err();
    assert!(matches!(
        err,
        FlowError::DimensionMismatch {
            width: 8,
            actual_width: 4,
            ..
        }
    ));
    assert_untouched(&acc);
}

#[test]
fn test_min_err_val_with_overflowing_reciprocal_rejected() {
    let img = image(4, 4);
    let acc = FlowAccumulator::new(&img).unwrap();
    let patch = PatchEstimate::uniform((1.0, 1.0), (1.0, 1.0), 2, 0.0);

    let err = scatter_patch(&patch, &img, &opt(2, 1e-39), &acc).unwrap_err();
    assert!(matches!(err, FlowError::InvalidMinErrVal(_)));
    assert_untouched(&acc);
}

#[test]
fn test_cost_overflowing_weight_denominator_rejected() {
    let img = image(8, 8);
    let o = opt(4, 1e38);
    let acc = FlowAccumulator::new(&img).unwrap();
    let mut cost = Array2::zeros((4, 4));
    cost[[1, 2]] = -f32::MAX;
    let patch = PatchEstimate::new((4.0, 4.0), (1.0, 1.0), cost);

    let err = scatter_patch(&patch, &img, &o, &acc).unwrap_err();
    assert!(matches!(err, FlowError::CostOutOfRange { row: 1, col: 2, .. }));
    assert_untouched(&acc);
}

#[test]
fn test_large_finite_cost_still_votes() {
    let img = image(8, 8);
    let o = opt(4, 0.01);
    let acc = FlowAccumulator::new(&img).unwrap();
    let patch = PatchEstimate::uniform((4.0, 4.0), (1.0, 1.0), 4, 1e30);

    scatter_patch(&patch, &img, &o, &acc).unwrap();
    let w = acc.weight_at(4, 4);
    assert!(w > 0.0 && w.is_finite());
}

#[test]
fn test_non_finite_flow_rejected() {
    let img = image(8, 8);
    let o = opt(4, 0.01);
    let acc = FlowAccumulator::new(&img).unwrap();

    for flow in [(f32::NAN, 0.0), (0.0, f32::INFINITY), (f32::NEG_INFINITY, 1.0)] {
        let patch = PatchEstimate::uniform((4.0, 4.0), flow, 4, 0.0);
        let err = scatter_patch(&patch, &img, &o, &acc).unwrap_err();
        assert!(matches!(err, FlowError::NonFiniteFlow { .. }), "flow {flow:?}: {err}");
    }
    assert_untouched(&acc);
}

#[test]
fn test_invalid_patch_with_non_finite_flow_is_skipped() {
    let img = image(8, 8);
    let acc = FlowAccumulator::new(&img).unwrap();
    let patch = PatchEstimate::uniform((4.0, 4.0), (f32::NAN, 0.0), 4, 0.0).invalidated();

    scatter_patch(&patch, &img, &opt(4, 0.01), &acc).unwrap();
    assert_untouched(&acc);
}
