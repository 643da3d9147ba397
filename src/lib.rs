//! 水泥浆体等多相材料三维体素微结构的连通性与逾渗分析。
//!
//! 对网格中每个非背景相，统计周期边界条件下的连通组件数、各组件体积，
//! 并判断该相是否沿 x/y/z 方向形成贯通路径。

pub mod app_state;
pub mod config;
pub mod connectivity;
pub mod error;
pub mod handlers;
pub mod jobs;
pub mod labels;
pub mod parsers;
pub mod routes;
pub mod utils;

pub use config::{AnalysisConfig, AnalysisLimits, BackendKind, ServerConfig};
pub use connectivity::{
    CancellationToken, ConnectivityReport, ConnectivityService, PhaseConnectivityAnalyzer,
    PhaseConnectivityResult, PhaseEntry, render_text_report,
};
pub use error::{AnalysisError, ConfigError, GridError, ParseError};
pub use utils::voxel_grid::{Axis, BACKGROUND_PHASE, PhaseId, VoxelGrid};

/// 使用默认配置分析网格中出现的全部非背景相
pub fn analyze_connectivity(grid: &VoxelGrid) -> Result<ConnectivityReport, AnalysisError> {
    let service = ConnectivityService::new(&AnalysisConfig::default())?;
    Ok(service.analyze(grid))
}

/// 使用默认（不设上限）配置分析单个相
pub fn analyze_phase(
    grid: &VoxelGrid,
    phase: PhaseId,
) -> Result<PhaseConnectivityResult, AnalysisError> {
    PhaseConnectivityAnalyzer::default().analyze(grid, phase)
}
