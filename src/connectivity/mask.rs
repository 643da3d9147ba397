use crate::utils::voxel_grid::{PhaseId, VoxelGrid};

/// 单相掩码：目标相所在位置为 true
/// 只借用网格，不复制数据；每个相分析时临时构造
#[derive(Debug, Clone, Copy)]
pub struct PhaseMask<'a> {
    grid: &'a VoxelGrid,
    phase: PhaseId,
}

impl<'a> PhaseMask<'a> {
    pub fn new(grid: &'a VoxelGrid, phase: PhaseId) -> Self {
        Self { grid, phase }
    }

    pub fn phase(&self) -> PhaseId {
        self.phase
    }

    pub fn shape(&self) -> [usize; 3] {
        self.grid.shape()
    }

    #[inline]
    pub fn contains(&self, index: usize) -> bool {
        self.grid.data()[index] == self.phase
    }

    pub fn count(&self) -> u64 {
        self.grid.voxel_count(self.phase)
    }
}
