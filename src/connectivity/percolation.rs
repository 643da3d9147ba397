use std::collections::BTreeMap;

use serde::Serialize;

use crate::connectivity::labeling::LabelField;
use crate::connectivity::periodic::for_each_face_pair;
use crate::utils::voxel_grid::Axis;

/// 单个组件沿三个轴的逾渗标志
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AxisFlags {
    pub x: bool,
    pub y: bool,
    pub z: bool,
}

impl AxisFlags {
    pub fn get(&self, axis: Axis) -> bool {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
            Axis::Z => self.z,
        }
    }

    pub fn set(&mut self, axis: Axis, value: bool) {
        match axis {
            Axis::X => self.x = value,
            Axis::Y => self.y = value,
            Axis::Z => self.z = value,
        }
    }

    pub fn any(&self) -> bool {
        self.x || self.y || self.z
    }

    pub fn all(&self) -> bool {
        self.x && self.y && self.z
    }
}

/// 逾渗分析结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Percolation {
    /// 每个轴上同时出现在两个相对面上的组件标签（升序）
    pub spanning: [Vec<u32>; 3],
    /// 至少沿一个轴逾渗的组件及其各轴标志
    pub components: BTreeMap<u32, AxisFlags>,
}

impl Percolation {
    pub fn percolates(&self, axis: Axis) -> bool {
        !self.spanning[axis.index()].is_empty()
    }

    pub fn flags(&self) -> AxisFlags {
        AxisFlags {
            x: self.percolates(Axis::X),
            y: self.percolates(Axis::Y),
            z: self.percolates(Axis::Z),
        }
    }

    pub fn fully_percolated(&self) -> bool {
        self.flags().all()
    }
}

/// 逾渗分析器
///
/// 必须在周期边界合并之后执行：某个轴两端面的标签集合有交集，
/// 说明同一个组件同时到达这两个面，在周期平铺下形成贯通路径。
#[derive(Debug, Clone, Copy, Default)]
pub struct PercolationAnalyzer;

impl PercolationAnalyzer {
    pub fn new() -> Self {
        Self
    }

    pub fn analyze(&self, field: &LabelField) -> Percolation {
        let labels = field.labels();
        let k = field.count();
        let mut result = Percolation::default();
        if k == 0 {
            return result;
        }

        let mut on_low = vec![false; k + 1];
        let mut on_high = vec![false; k + 1];
        for axis in Axis::ALL {
            on_low.fill(false);
            on_high.fill(false);
            for_each_face_pair(field.shape(), axis, |low, high| {
                on_low[labels[low] as usize] = true;
                on_high[labels[high] as usize] = true;
            });

            let spanning: Vec<u32> = (1..=k)
                .filter(|&label| on_low[label] && on_high[label])
                .map(|label| label as u32)
                .collect();

            for &label in &spanning {
                result
                    .components
                    .entry(label)
                    .or_default()
                    .set(axis, true);
            }
            result.spanning[axis.index()] = spanning;
        }

        result
    }
}
