use crate::connectivity::mask::PhaseMask;
use crate::connectivity::union_find::UnionFind;
use crate::error::AnalysisError;

/// 与网格同形状的组件标签数组，0 表示不属于该相
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelField {
    shape: [usize; 3],
    labels: Vec<u32>,
    /// 标签取值为 1..=count
    count: usize,
}

impl LabelField {
    pub fn new(shape: [usize; 3], labels: Vec<u32>, count: usize) -> Self {
        debug_assert_eq!(labels.len(), shape.iter().product::<usize>());
        Self {
            shape,
            labels,
            count,
        }
    }

    pub fn shape(&self) -> [usize; 3] {
        self.shape
    }

    pub fn labels(&self) -> &[u32] {
        &self.labels
    }

    pub fn into_labels(self) -> Vec<u32> {
        self.labels
    }

    pub fn count(&self) -> usize {
        self.count
    }

    #[inline]
    pub fn index(&self, x: usize, y: usize, z: usize) -> usize {
        (z * self.shape[1] + y) * self.shape[0] + x
    }

    #[inline]
    pub fn label_at(&self, x: usize, y: usize, z: usize) -> u32 {
        self.labels[self.index(x, y, z)]
    }
}

/// 非周期的 6 邻接连通组件标记
///
/// 两遍扫描：第一遍按 x 最快的顺序分配临时标签，并把与 -x/-y/-z 邻居
/// 的标签等价关系记入并查集；第二遍把每个临时标签解析到根，再按首次出现
/// 顺序压缩为 1..M。相同输入总是得到相同的标签。
#[derive(Debug, Clone, Copy, Default)]
pub struct ComponentLabeler {
    max_components: Option<usize>,
}

impl ComponentLabeler {
    pub fn new() -> Self {
        Self::default()
    }

    /// 设置组件数安全上限，超出时返回 `ResourceLimitExceeded`
    pub fn with_max_components(mut self, limit: Option<usize>) -> Self {
        self.max_components = limit;
        self
    }

    pub fn label(&self, mask: &PhaseMask<'_>) -> Result<LabelField, AnalysisError> {
        let shape = mask.shape();
        let [nx, ny, nz] = shape;
        let plane = nx * ny;
        let mut labels = vec![0u32; nx * ny * nz];

        // 0 号集合占位，对应背景
        let mut uf = UnionFind::with_capacity(1024);
        uf.make_set();

        for z in 0..nz {
            for y in 0..ny {
                let row = z * plane + y * nx;
                for x in 0..nx {
                    let idx = row + x;
                    if !mask.contains(idx) {
                        continue;
                    }

                    let neighbors = [
                        (x > 0).then(|| idx - 1),
                        (y > 0).then(|| idx - nx),
                        (z > 0).then(|| idx - plane),
                    ];

                    let mut current = 0u32;
                    for neighbor in neighbors.into_iter().flatten() {
                        let label = labels[neighbor];
                        if label == 0 {
                            continue;
                        }
                        if current == 0 {
                            current = label;
                        } else if label != current {
                            uf.union(current, label);
                        }
                    }

                    if current == 0 {
                        current = uf.make_set();
                    }
                    labels[idx] = current;
                }
            }
        }

        let count = compact_labels(&mut labels, &mut uf);

        if let Some(limit) = self.max_components {
            if count > limit {
                return Err(AnalysisError::ResourceLimitExceeded {
                    phase: mask.phase(),
                    what: "连通组件数",
                    actual: count as u64,
                    limit: limit as u64,
                });
            }
        }

        Ok(LabelField::new(shape, labels, count))
    }
}

/// 将每个非零标签替换为其根，并按首次出现顺序重新编号为 1..K，返回 K
pub(crate) fn compact_labels(labels: &mut [u32], uf: &mut UnionFind) -> usize {
    let mut remap = vec![0u32; uf.len()];
    let mut next = 0u32;
    for label in labels.iter_mut() {
        if *label == 0 {
            continue;
        }
        let root = uf.find(*label) as usize;
        if remap[root] == 0 {
            next += 1;
            remap[root] = next;
        }
        *label = remap[root];
    }
    next as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::voxel_grid::VoxelGrid;

    fn grid_from(shape: [usize; 3], cells: &[(usize, usize, usize)]) -> VoxelGrid {
        let mut grid = VoxelGrid::filled(shape, [1.0; 3], 0).unwrap();
        for &(x, y, z) in cells {
            grid.set(x, y, z, 1);
        }
        grid
    }

    #[test]
    fn empty_mask_has_no_components() {
        let grid = grid_from([4, 4, 4], &[]);
        let field = ComponentLabeler::new()
            .label(&PhaseMask::new(&grid, 1))
            .unwrap();
        assert_eq!(field.count(), 0);
        assert!(field.labels().iter().all(|&l| l == 0));
    }

    #[test]
    fn diagonal_voxels_are_not_adjacent() {
        let grid = grid_from([3, 3, 3], &[(0, 0, 0), (1, 1, 0), (2, 2, 2)]);
        let field = ComponentLabeler::new()
            .label(&PhaseMask::new(&grid, 1))
            .unwrap();
        assert_eq!(field.count(), 3);
    }

    #[test]
    fn u_shape_merges_two_provisional_labels() {
        // 两条竖臂先得到不同的临时标签，顶边把它们连起来
        let grid = grid_from(
            [3, 3, 1],
            &[(0, 0, 0), (2, 0, 0), (0, 1, 0), (2, 1, 0), (0, 2, 0), (1, 2, 0), (2, 2, 0)],
        );
        let field = ComponentLabeler::new()
            .label(&PhaseMask::new(&grid, 1))
            .unwrap();
        assert_eq!(field.count(), 1);
        assert_eq!(field.label_at(0, 0, 0), field.label_at(2, 0, 0));
        assert_eq!(field.label_at(1, 1, 0), 0);
    }

    #[test]
    fn no_wraparound_during_labeling() {
        let grid = grid_from([5, 1, 1], &[(0, 0, 0), (4, 0, 0)]);
        let field = ComponentLabeler::new()
            .label(&PhaseMask::new(&grid, 1))
            .unwrap();
        assert_eq!(field.count(), 2);
        assert_eq!(field.label_at(0, 0, 0), 1);
        assert_eq!(field.label_at(4, 0, 0), 2);
    }

    #[test]
    fn component_limit_is_enforced() {
        let grid = grid_from([5, 1, 1], &[(0, 0, 0), (2, 0, 0), (4, 0, 0)]);
        let err = ComponentLabeler::new()
            .with_max_components(Some(2))
            .label(&PhaseMask::new(&grid, 1))
            .unwrap_err();
        assert!(matches!(
            err,
            AnalysisError::ResourceLimitExceeded { actual: 3, limit: 2, .. }
        ));
    }

    #[test]
    fn labeling_is_deterministic() {
        let cells: Vec<_> = (0..6)
            .flat_map(|i| [(i, (i * 7) % 6, (i * 5) % 6), ((i * 3) % 6, i, 5 - i)])
            .collect();
        let grid = grid_from([6, 6, 6], &cells);
        let mask = PhaseMask::new(&grid, 1);
        let a = ComponentLabeler::new().label(&mask).unwrap();
        let b = ComponentLabeler::new().label(&mask).unwrap();
        assert_eq!(a, b);
    }
}
