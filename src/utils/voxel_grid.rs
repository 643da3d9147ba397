use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::GridError;

/// 相编号，0 保留给背景/孔隙
pub type PhaseId = u16;

pub const BACKGROUND_PHASE: PhaseId = 0;

/// 网格坐标轴
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Axis::X => "X",
            Axis::Y => "Y",
            Axis::Z => "Z",
        }
    }
}

/// 体素网格数据结构
/// 表示三维规则网格上每个体素所属的材料相
///
/// 构造时完成校验，之后只读；分析过程中可以被多个线程同时借用。
#[derive(Debug, Clone)]
pub struct VoxelGrid {
    /// 网格维度 [nx, ny, nz]
    shape: [usize; 3],
    /// 体素物理尺寸 [dx, dy, dz]
    voxel_size: [f64; 3],
    /// 相编号数组，按 C 语言顺序存储 (x变化最快，y其次，z最慢)
    /// 索引计算: index = k * nx * ny + j * nx + i
    data: Vec<PhaseId>,
}

impl VoxelGrid {
    /// 创建新的体素网格
    pub fn new(
        shape: [usize; 3],
        voxel_size: [f64; 3],
        data: Vec<PhaseId>,
    ) -> Result<Self, GridError> {
        let total_elements = Self::checked_len(shape)?;
        if voxel_size.iter().any(|&d| !d.is_finite() || d <= 0.0) {
            return Err(GridError::InvalidVoxelSize(voxel_size));
        }

        if data.len() != total_elements {
            return Err(GridError::DataLength {
                shape,
                expected: total_elements,
                actual: data.len(),
            });
        }

        Ok(VoxelGrid {
            shape,
            voxel_size,
            data,
        })
    }

    /// 校验 shape 并返回体素总数；总数必须能用 u32 标签寻址
    ///
    /// 在按 shape 分配任何缓冲区之前调用。
    pub fn checked_len(shape: [usize; 3]) -> Result<usize, GridError> {
        if shape.iter().any(|&n| n == 0) {
            return Err(GridError::InvalidExtent(shape));
        }
        let total_elements = shape
            .iter()
            .try_fold(1usize, |acc, &n| acc.checked_mul(n))
            .ok_or(GridError::TooLarge(usize::MAX))?;
        if total_elements > u32::MAX as usize {
            return Err(GridError::TooLarge(total_elements));
        }
        Ok(total_elements)
    }

    /// 创建各向同性体素（dx = dy = dz）的网格
    pub fn isotropic(
        shape: [usize; 3],
        resolution: f64,
        data: Vec<PhaseId>,
    ) -> Result<Self, GridError> {
        Self::new(shape, [resolution; 3], data)
    }

    /// 创建填充单一相的网格，之后可用 `set` 逐个修改（主要用于构造测试数据）
    pub fn filled(
        shape: [usize; 3],
        voxel_size: [f64; 3],
        phase: PhaseId,
    ) -> Result<Self, GridError> {
        let n = Self::checked_len(shape)?;
        Self::new(shape, voxel_size, vec![phase; n])
    }

    /// 获取 shape
    pub fn shape(&self) -> [usize; 3] {
        self.shape
    }

    pub fn voxel_size(&self) -> [f64; 3] {
        self.voxel_size
    }

    /// 单个体素的物理体积 dx·dy·dz
    pub fn voxel_volume(&self) -> f64 {
        self.voxel_size[0] * self.voxel_size[1] * self.voxel_size[2]
    }

    /// 获取整个数据数组的引用
    pub fn data(&self) -> &[PhaseId] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    pub fn index(&self, x: usize, y: usize, z: usize) -> usize {
        debug_assert!(x < self.shape[0] && y < self.shape[1] && z < self.shape[2]);
        (z * self.shape[1] + y) * self.shape[0] + x
    }

    #[inline]
    pub fn phase_of(&self, x: usize, y: usize, z: usize) -> PhaseId {
        self.data[self.index(x, y, z)]
    }

    pub fn set(&mut self, x: usize, y: usize, z: usize, phase: PhaseId) {
        let idx = self.index(x, y, z);
        self.data[idx] = phase;
    }

    /// 统计每个出现过的相的体素数（按相编号排序，包含背景相）
    pub fn phase_counts(&self) -> BTreeMap<PhaseId, u64> {
        let mut counts = vec![0u64; PhaseId::MAX as usize + 1];
        for &phase in &self.data {
            counts[phase as usize] += 1;
        }
        counts
            .into_iter()
            .enumerate()
            .filter(|(_, n)| *n > 0)
            .map(|(phase, n)| (phase as PhaseId, n))
            .collect()
    }

    /// 网格中出现的所有非背景相
    pub fn phases_present(&self) -> Vec<PhaseId> {
        self.phase_counts()
            .into_keys()
            .filter(|&phase| phase != BACKGROUND_PHASE)
            .collect()
    }

    pub fn voxel_count(&self, phase: PhaseId) -> u64 {
        self.data.iter().filter(|&&p| p == phase).count() as u64
    }
}
