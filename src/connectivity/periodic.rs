use crate::connectivity::labeling::{LabelField, compact_labels};
use crate::connectivity::union_find::UnionFind;
use crate::utils::voxel_grid::Axis;

/// 周期边界合并后的组件
#[derive(Debug, Clone)]
pub struct MergedComponents {
    pub field: LabelField,
    /// `voxel_counts[k - 1]` 是最终组件 k 的体素数
    pub voxel_counts: Vec<u64>,
}

impl MergedComponents {
    pub fn count(&self) -> usize {
        self.field.count()
    }
}

/// 周期边界合并器
///
/// 把网格看作无限周期晶格中的一个单元：对每个轴，比较 0 面与 n-1 面在
/// 相同横向位置上的体素，二者都属于该相时合并其标签。
#[derive(Debug, Clone, Copy, Default)]
pub struct PeriodicBoundaryMerger;

impl PeriodicBoundaryMerger {
    pub fn new() -> Self {
        Self
    }

    pub fn merge(&self, field: LabelField) -> MergedComponents {
        let shape = field.shape();
        let m = field.count();
        let mut labels = field.into_labels();

        let mut uf = UnionFind::new(m + 1);
        for axis in Axis::ALL {
            for_each_face_pair(shape, axis, |low, high| {
                let (a, b) = (labels[low], labels[high]);
                if a != 0 && b != 0 {
                    uf.union(a, b);
                }
            });
        }

        let count = compact_labels(&mut labels, &mut uf);

        let mut voxel_counts = vec![0u64; count];
        for &label in &labels {
            if label != 0 {
                voxel_counts[label as usize - 1] += 1;
            }
        }

        MergedComponents {
            field: LabelField::new(shape, labels, count),
            voxel_counts,
        }
    }
}

/// 遍历某个轴上一对相对边界面的所有横向位置，回调参数为
/// (低面体素索引, 高面体素索引)
pub(crate) fn for_each_face_pair<F>(shape: [usize; 3], axis: Axis, mut f: F)
where
    F: FnMut(usize, usize),
{
    let [nx, ny, nz] = shape;
    let index = |x: usize, y: usize, z: usize| (z * ny + y) * nx + x;
    match axis {
        Axis::X => {
            for z in 0..nz {
                for y in 0..ny {
                    f(index(0, y, z), index(nx - 1, y, z));
                }
            }
        }
        Axis::Y => {
            for z in 0..nz {
                for x in 0..nx {
                    f(index(x, 0, z), index(x, ny - 1, z));
                }
            }
        }
        Axis::Z => {
            for y in 0..ny {
                for x in 0..nx {
                    f(index(x, y, 0), index(x, y, nz - 1));
                }
            }
        }
    }
}
