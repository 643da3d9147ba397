use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use log::{info, warn};
use rayon::prelude::*;

use crate::config::AnalysisConfig;
use crate::connectivity::phase::PhaseConnectivityAnalyzer;
use crate::connectivity::report::{ConnectivityReport, PhaseEntry};
use crate::error::AnalysisError;
use crate::utils::voxel_grid::{BACKGROUND_PHASE, PhaseId, VoxelGrid};

/// 协作式取消标志，可在线程间克隆共享
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// 整个网格的连通性分析服务
///
/// 每个相在有界线程池上独立分析：网格只读共享，每个任务只分配自己的
/// 标签数组与并查集。取消与截止时间只在相与相之间检查，单个相一旦开始
/// 就会运行到结束。
pub struct ConnectivityService {
    analyzer: PhaseConnectivityAnalyzer,
    pool: rayon::ThreadPool,
    deadline: Option<Duration>,
}

impl ConnectivityService {
    pub fn new(config: &AnalysisConfig) -> Result<Self, AnalysisError> {
        let threads = config.effective_worker_threads();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("connectivity-{i}"))
            .build()
            .map_err(|e| AnalysisError::WorkerPool(e.to_string()))?;

        Ok(Self {
            analyzer: PhaseConnectivityAnalyzer::new(config.limits),
            pool,
            deadline: config.deadline,
        })
    }

    pub fn worker_threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// 分析网格中出现的全部非背景相
    pub fn analyze(&self, grid: &VoxelGrid) -> ConnectivityReport {
        self.analyze_with_cancel(grid, &CancellationToken::new())
    }

    pub fn analyze_with_cancel(
        &self,
        grid: &VoxelGrid,
        token: &CancellationToken,
    ) -> ConnectivityReport {
        self.analyze_phases(grid, &grid.phases_present(), token)
    }

    /// 只分析指定的相；不存在于网格中的相得到全零结果
    pub fn analyze_phases(
        &self,
        grid: &VoxelGrid,
        phases: &[PhaseId],
        token: &CancellationToken,
    ) -> ConnectivityReport {
        let mut targets: Vec<PhaseId> = phases
            .iter()
            .copied()
            .filter(|&phase| phase != BACKGROUND_PHASE)
            .collect();
        targets.sort_unstable();
        targets.dedup();
        if phases.contains(&BACKGROUND_PHASE) {
            warn!("[连通性分析] 忽略背景相 {}", BACKGROUND_PHASE);
        }

        let started = Instant::now();
        let deadline_at = self.deadline.map(|d| started + d);
        let [nx, ny, nz] = grid.shape();
        info!(
            "[连通性分析] 开始分析 {}x{}x{} 网格的 {} 个相，工作线程 {} 个",
            nx,
            ny,
            nz,
            targets.len(),
            self.worker_threads()
        );

        let outcomes: Vec<(PhaseId, PhaseEntry)> = self.pool.install(|| {
            targets
                .par_iter()
                .map(|&phase| (phase, self.run_phase(grid, phase, token, deadline_at)))
                .collect()
        });

        let mut report = ConnectivityReport::new(grid.shape(), grid.voxel_size());
        for (phase, entry) in outcomes {
            report.insert(phase, entry);
        }

        info!(
            "[连通性分析] 完成，耗时 {}ms，{}",
            started.elapsed().as_millis(),
            if report.is_complete() {
                "全部相已完成".to_string()
            } else {
                format!("未完成的相: {:?}", report.incomplete_phases())
            }
        );
        report
    }

    fn run_phase(
        &self,
        grid: &VoxelGrid,
        phase: PhaseId,
        token: &CancellationToken,
        deadline_at: Option<Instant>,
    ) -> PhaseEntry {
        if token.is_cancelled() {
            return PhaseEntry::Cancelled;
        }
        if deadline_at.is_some_and(|at| Instant::now() >= at) {
            warn!("[连通性分析] 相 {} 未开始即已超过截止时间", phase);
            return PhaseEntry::TimedOut;
        }

        let phase_start = Instant::now();
        match self.analyzer.analyze(grid, phase) {
            Ok(result) => {
                info!(
                    "[连通性分析] 相 {}: {} 个组件，逾渗 X={} Y={} Z={}，耗时 {}ms",
                    phase,
                    result.total_components,
                    result.percolates_x,
                    result.percolates_y,
                    result.percolates_z,
                    phase_start.elapsed().as_millis()
                );
                PhaseEntry::Completed(result)
            }
            Err(err) => {
                warn!("[连通性分析] 相 {} 分析失败: {}", phase, err);
                PhaseEntry::from_error(&err)
            }
        }
    }
}
