mod common;

use common::{empty_grid, fill_box};
use microstructure_connectivity::connectivity::{
    ComponentLabeler, PeriodicBoundaryMerger, PhaseMask,
};
use microstructure_connectivity::{
    PhaseEntry, VoxelGrid, analyze_connectivity, analyze_phase, render_text_report,
};

#[test]
fn scenario_a_phase_fills_grid() {
    let grid = VoxelGrid::filled([10, 10, 10], [1.0; 3], 1).unwrap();
    let result = analyze_phase(&grid, 1).unwrap();
    assert_eq!(result.total_components, 1);
    assert!(result.percolates_x && result.percolates_y && result.percolates_z);
    assert!(result.fully_percolated);
    assert_eq!(result.percolation_ratio, 1.0);
    assert_eq!(result.total_phase_volume, 1000.0);
    assert_eq!(result.component_percolation.len(), 1);
    assert!(result.component_percolation[0].axes.all());
}

#[test]
fn scenario_b_two_isolated_cubes() {
    let mut grid = empty_grid([10, 10, 10]);
    fill_box(&mut grid, [1, 1, 1], [3, 3, 3], 2);
    fill_box(&mut grid, [6, 6, 6], [8, 8, 8], 2);
    let result = analyze_phase(&grid, 2).unwrap();
    assert_eq!(result.total_components, 2);
    assert_eq!(result.component_volumes, vec![8.0, 8.0]);
    assert!(!result.percolates_x && !result.percolates_y && !result.percolates_z);
    assert!(!result.fully_percolated);
    assert_eq!(result.percolation_ratio, 0.5);
    assert!(result.component_percolation.is_empty());
}

#[test]
fn scenario_c_opposite_x_slices_merge_through_wrap() {
    let mut grid = empty_grid([10, 10, 10]);
    fill_box(&mut grid, [0, 0, 0], [1, 10, 10], 3);
    fill_box(&mut grid, [9, 0, 0], [10, 10, 10], 3);

    let labeled = ComponentLabeler::new()
        .label(&PhaseMask::new(&grid, 3))
        .unwrap();
    assert_eq!(labeled.count(), 2);

    let result = analyze_phase(&grid, 3).unwrap();
    assert_eq!(result.total_components, 1);
    assert!(result.percolates_x);
    // 每个切片本身覆盖整个 y/z 范围，因此 y、z 方向同样贯通
    assert!(result.percolates_y && result.percolates_z);
}

#[test]
fn scenario_c_with_partial_slices_percolates_only_in_x() {
    // 两个切片只占据 y、z 的内部区域，不接触 y/z 端面
    let mut grid = empty_grid([10, 10, 10]);
    fill_box(&mut grid, [0, 2, 2], [1, 8, 8], 3);
    fill_box(&mut grid, [9, 2, 2], [10, 8, 8], 3);
    let result = analyze_phase(&grid, 3).unwrap();
    assert_eq!(result.total_components, 1);
    assert!(result.percolates_x);
    assert!(!result.percolates_y && !result.percolates_z);
    assert!(!result.fully_percolated);
    assert_eq!(result.component_percolation.len(), 1);
    let c = &result.component_percolation[0];
    assert!(c.axes.x && !c.axes.y && !c.axes.z);
}

#[test]
fn absent_phase_yields_zeroed_result() {
    let grid = VoxelGrid::filled([4, 4, 4], [1.0; 3], 1).unwrap();
    let result = analyze_phase(&grid, 5).unwrap();
    assert_eq!(result.total_components, 0);
    assert_eq!(result.total_phase_volume, 0.0);
    assert_eq!(result.percolation_ratio, 0.0);
    assert!(!result.percolates_x && !result.percolates_y && !result.percolates_z);
    assert!(result.component_volumes.is_empty());
}

#[test]
fn repeated_analysis_is_identical() {
    let mut grid = empty_grid([12, 9, 7]);
    fill_box(&mut grid, [0, 0, 0], [12, 1, 1], 1);
    fill_box(&mut grid, [3, 4, 2], [5, 6, 7], 1);
    grid.set(11, 8, 6, 1);
    let first = analyze_phase(&grid, 1).unwrap();
    let second = analyze_phase(&grid, 1).unwrap();
    assert_eq!(first, second);
}

#[test]
fn merge_never_increases_component_count() {
    let mut grid = empty_grid([8, 8, 8]);
    for i in 0..8 {
        grid.set(0, i, (i * 3) % 8, 4);
        grid.set(7, i, (i * 3) % 8, 4);
        grid.set(i, 0, (i * 5) % 8, 4);
    }
    let labeled = ComponentLabeler::new()
        .label(&PhaseMask::new(&grid, 4))
        .unwrap();
    let before = labeled.count();
    let merged = PeriodicBoundaryMerger::new().merge(labeled);
    assert!(merged.count() <= before);
    assert_eq!(merged.voxel_counts.iter().sum::<u64>(), grid.voxel_count(4));
}

#[test]
fn whole_grid_report_covers_each_phase() {
    let mut grid = VoxelGrid::filled([6, 6, 6], [0.5, 0.5, 0.5], 0).unwrap();
    fill_box(&mut grid, [0, 0, 0], [6, 6, 2], 1);
    fill_box(&mut grid, [2, 2, 3], [4, 4, 5], 2);
    grid.set(5, 5, 5, 7);

    let report = analyze_connectivity(&grid).unwrap();
    assert_eq!(report.phase_ids(), vec![1, 2, 7]);
    assert!(report.is_complete());

    let slab = report.result(1).unwrap();
    assert!(slab.percolates_x && slab.percolates_y && !slab.percolates_z);
    assert_eq!(slab.total_phase_volume, 72.0 * 0.125);

    assert!(matches!(report.get(2), Some(PhaseEntry::Completed(_))));
    assert!(report.get(0).is_none());

    let text = render_text_report(&report);
    assert_eq!(text.matches("\nPhase ").count(), 3);
    assert!(text.contains("Percolates Z: no"));
}
