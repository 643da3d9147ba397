use log::debug;
use serde::Serialize;

use crate::config::AnalysisLimits;
use crate::connectivity::labeling::ComponentLabeler;
use crate::connectivity::mask::PhaseMask;
use crate::connectivity::percolation::{AxisFlags, PercolationAnalyzer};
use crate::connectivity::periodic::{MergedComponents, PeriodicBoundaryMerger};
use crate::error::AnalysisError;
use crate::utils::voxel_grid::{BACKGROUND_PHASE, PhaseId, VoxelGrid};

/// 单个逾渗组件
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComponentPercolation {
    /// 组件在 `component_volumes` 中的序号（从 1 开始，1 为最大组件）
    pub component: usize,
    pub volume: f64,
    #[serde(flatten)]
    pub axes: AxisFlags,
}

/// 单相连通性分析结果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhaseConnectivityResult {
    pub phase: PhaseId,
    pub name: Option<String>,
    pub voxel_count: u64,
    pub total_components: usize,
    /// 各组件体积（物理单位³），降序
    pub component_volumes: Vec<f64>,
    pub largest_component_volume: f64,
    pub total_phase_volume: f64,
    /// 最大组件体积 / 该相总体积
    pub percolation_ratio: f64,
    pub percolates_x: bool,
    pub percolates_y: bool,
    pub percolates_z: bool,
    pub fully_percolated: bool,
    pub component_percolation: Vec<ComponentPercolation>,
}

impl PhaseConnectivityResult {
    /// 该相不存在于网格中时的全零结果
    pub fn empty(phase: PhaseId) -> Self {
        Self {
            phase,
            name: None,
            voxel_count: 0,
            total_components: 0,
            component_volumes: Vec::new(),
            largest_component_volume: 0.0,
            total_phase_volume: 0.0,
            percolation_ratio: 0.0,
            percolates_x: false,
            percolates_y: false,
            percolates_z: false,
            fully_percolated: false,
            component_percolation: Vec::new(),
        }
    }

    pub fn percolation_flags(&self) -> AxisFlags {
        AxisFlags {
            x: self.percolates_x,
            y: self.percolates_y,
            z: self.percolates_z,
        }
    }
}

/// 单相连通性分析器：掩码 → 标记 → 周期合并 → 逾渗判断 → 体积统计
#[derive(Debug, Clone, Copy, Default)]
pub struct PhaseConnectivityAnalyzer {
    limits: AnalysisLimits,
}

impl PhaseConnectivityAnalyzer {
    pub fn new(limits: AnalysisLimits) -> Self {
        Self { limits }
    }

    pub fn analyze(
        &self,
        grid: &VoxelGrid,
        phase: PhaseId,
    ) -> Result<PhaseConnectivityResult, AnalysisError> {
        let merged = merged_components(grid, phase, self.limits)?;
        if merged.count() == 0 {
            return Ok(PhaseConnectivityResult::empty(phase));
        }
        let voxel_count = merged.voxel_counts.iter().sum::<u64>();
        let percolation = PercolationAnalyzer::new().analyze(&merged.field);

        Ok(summarize(grid, phase, voxel_count, &merged, |label| {
            percolation.components.get(&label).copied()
        }))
    }
}

/// 单相的标记与周期合并，连通性分析与标签导出共用
///
/// 拒绝背景相，并在分配标签数组之前检查体素数上限。
pub(crate) fn merged_components(
    grid: &VoxelGrid,
    phase: PhaseId,
    limits: AnalysisLimits,
) -> Result<MergedComponents, AnalysisError> {
    if phase == BACKGROUND_PHASE {
        return Err(AnalysisError::BackgroundPhase);
    }

    let mask = PhaseMask::new(grid, phase);
    let voxel_count = mask.count();
    if let Some(limit) = limits.max_phase_voxels {
        if voxel_count > limit {
            return Err(AnalysisError::ResourceLimitExceeded {
                phase,
                what: "体素数",
                actual: voxel_count,
                limit,
            });
        }
    }

    let labeled = ComponentLabeler::new()
        .with_max_components(limits.max_components)
        .label(&mask)?;
    let provisional = labeled.count();

    let merged = PeriodicBoundaryMerger::new().merge(labeled);
    debug!(
        "[连通性分析] 相 {}: {} 个体素，标记 {} 个组件，周期合并后 {} 个",
        phase,
        voxel_count,
        provisional,
        merged.count()
    );
    Ok(merged)
}

/// 返回 (标签, 体素数)，体素数降序；数量相同时按标签升序，保证输出稳定
pub(crate) fn rank_by_size(voxel_counts: &[u64]) -> Vec<(u32, u64)> {
    let mut ranked: Vec<(u32, u64)> = voxel_counts
        .iter()
        .enumerate()
        .map(|(i, &n)| (i as u32 + 1, n))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    ranked
}

/// 按体积降序整理组件并计算体积与逾渗统计
fn summarize<F>(
    grid: &VoxelGrid,
    phase: PhaseId,
    voxel_count: u64,
    merged: &MergedComponents,
    percolation_of: F,
) -> PhaseConnectivityResult
where
    F: Fn(u32) -> Option<AxisFlags>,
{
    let voxel_volume = grid.voxel_volume();
    let ranked = rank_by_size(&merged.voxel_counts);

    let component_volumes: Vec<f64> = ranked
        .iter()
        .map(|&(_, n)| n as f64 * voxel_volume)
        .collect();

    let component_percolation: Vec<ComponentPercolation> = ranked
        .iter()
        .enumerate()
        .filter_map(|(rank, &(label, n))| {
            percolation_of(label).map(|axes| ComponentPercolation {
                component: rank + 1,
                volume: n as f64 * voxel_volume,
                axes,
            })
        })
        .collect();

    let flags = component_percolation
        .iter()
        .fold(AxisFlags::default(), |acc, c| AxisFlags {
            x: acc.x || c.axes.x,
            y: acc.y || c.axes.y,
            z: acc.z || c.axes.z,
        });

    let total_phase_volume = voxel_count as f64 * voxel_volume;
    let largest_component_volume = component_volumes.first().copied().unwrap_or(0.0);
    let percolation_ratio = if total_phase_volume > 0.0 {
        largest_component_volume / total_phase_volume
    } else {
        0.0
    };

    PhaseConnectivityResult {
        phase,
        name: None,
        voxel_count,
        total_components: merged.count(),
        component_volumes,
        largest_component_volume,
        total_phase_volume,
        percolation_ratio,
        percolates_x: flags.x,
        percolates_y: flags.y,
        percolates_z: flags.z,
        fully_percolated: flags.all(),
        component_percolation,
    }
}
