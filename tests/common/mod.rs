#![allow(dead_code)]

use std::collections::VecDeque;

use microstructure_connectivity::{PhaseId, VoxelGrid};

/// 空网格（全部为背景相）
pub fn empty_grid(shape: [usize; 3]) -> VoxelGrid {
    VoxelGrid::filled(shape, [1.0; 3], 0).unwrap()
}

/// 在 [x0,x1)×[y0,y1)×[z0,z1) 范围内填充相
pub fn fill_box(grid: &mut VoxelGrid, lo: [usize; 3], hi: [usize; 3], phase: PhaseId) {
    for z in lo[2]..hi[2] {
        for y in lo[1]..hi[1] {
            for x in lo[0]..hi[0] {
                grid.set(x, y, z, phase);
            }
        }
    }
}

/// 独立实现：在三维环面上做广度优先搜索（6 邻接 + 周期边界），
/// 返回每个组件的 (体素数, 是否同时接触 x/y/z 的两个端面)
pub fn torus_components(grid: &VoxelGrid, phase: PhaseId) -> Vec<(u64, [bool; 3])> {
    let [nx, ny, nz] = grid.shape();
    let mut seen = vec![false; grid.len()];
    let mut components = Vec::new();

    for start in 0..grid.len() {
        if seen[start] || grid.data()[start] != phase {
            continue;
        }
        seen[start] = true;
        let mut queue = VecDeque::from([start]);
        let mut size = 0u64;
        let mut low = [false; 3];
        let mut high = [false; 3];

        while let Some(idx) = queue.pop_front() {
            size += 1;
            let x = idx % nx;
            let y = (idx / nx) % ny;
            let z = idx / (nx * ny);
            for (axis, (c, n)) in [(x, nx), (y, ny), (z, nz)].into_iter().enumerate() {
                low[axis] |= c == 0;
                high[axis] |= c == n - 1;
            }

            let neighbors = [
                ((x + 1) % nx, y, z),
                ((x + nx - 1) % nx, y, z),
                (x, (y + 1) % ny, z),
                (x, (y + ny - 1) % ny, z),
                (x, y, (z + 1) % nz),
                (x, y, (z + nz - 1) % nz),
            ];
            for (a, b, c) in neighbors {
                let j = grid.index(a, b, c);
                if !seen[j] && grid.data()[j] == phase {
                    seen[j] = true;
                    queue.push_back(j);
                }
            }
        }

        components.push((size, [low[0] && high[0], low[1] && high[1], low[2] && high[2]]));
    }
    components
}
