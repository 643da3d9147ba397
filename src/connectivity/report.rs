use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashMap};
use std::fmt::Write as _;

use serde::Serialize;

use crate::connectivity::phase::PhaseConnectivityResult;
use crate::error::AnalysisError;
use crate::utils::voxel_grid::{Axis, PhaseId};

/// 报告中单个相的条目
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PhaseEntry {
    Completed(PhaseConnectivityResult),
    Failed { reason: String },
    Cancelled,
    TimedOut,
}

impl PhaseEntry {
    pub fn from_error(err: &AnalysisError) -> Self {
        match err {
            AnalysisError::Cancelled => PhaseEntry::Cancelled,
            AnalysisError::TimedOut => PhaseEntry::TimedOut,
            other => PhaseEntry::Failed {
                reason: other.to_string(),
            },
        }
    }

    pub fn result(&self) -> Option<&PhaseConnectivityResult> {
        match self {
            PhaseEntry::Completed(result) => Some(result),
            _ => None,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, PhaseEntry::Completed(_))
    }
}

/// 整个网格的连通性报告，按相编号排序
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConnectivityReport {
    pub shape: [usize; 3],
    pub voxel_size: [f64; 3],
    pub phases: BTreeMap<PhaseId, PhaseEntry>,
}

impl ConnectivityReport {
    pub fn new(shape: [usize; 3], voxel_size: [f64; 3]) -> Self {
        Self {
            shape,
            voxel_size,
            phases: BTreeMap::new(),
        }
    }

    /// 只追加：同一相编号已有条目时保持原条目并返回 false
    pub fn insert(&mut self, phase: PhaseId, entry: PhaseEntry) -> bool {
        match self.phases.entry(phase) {
            Entry::Vacant(slot) => {
                slot.insert(entry);
                true
            }
            Entry::Occupied(_) => false,
        }
    }

    pub fn get(&self, phase: PhaseId) -> Option<&PhaseEntry> {
        self.phases.get(&phase)
    }

    pub fn result(&self, phase: PhaseId) -> Option<&PhaseConnectivityResult> {
        self.get(phase).and_then(PhaseEntry::result)
    }

    pub fn phase_ids(&self) -> Vec<PhaseId> {
        self.phases.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.phases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.phases.is_empty()
    }

    /// 所有条目都已完成（没有失败、取消或超时）
    pub fn is_complete(&self) -> bool {
        self.phases.values().all(PhaseEntry::is_completed)
    }

    /// 为已完成的结果附加相名称
    pub fn apply_phase_names(&mut self, names: &HashMap<PhaseId, String>) {
        for (phase, entry) in self.phases.iter_mut() {
            if let (PhaseEntry::Completed(result), Some(name)) = (entry, names.get(phase)) {
                result.name = Some(name.clone());
            }
        }
    }

    pub fn incomplete_phases(&self) -> Vec<PhaseId> {
        self.phases
            .iter()
            .filter(|(_, entry)| !entry.is_completed())
            .map(|(&phase, _)| phase)
            .collect()
    }
}

/// 将报告渲染为纯文本，每个相一个区块，供下游工具读取
pub fn render_text_report(report: &ConnectivityReport) -> String {
    let mut out = String::new();
    let [nx, ny, nz] = report.shape;
    let [dx, dy, dz] = report.voxel_size;
    let _ = writeln!(out, "Connectivity report");
    let _ = writeln!(out, "Grid: {nx} x {ny} x {nz}");
    let _ = writeln!(out, "Voxel size: {dx} x {dy} x {dz}");

    for (phase, entry) in &report.phases {
        out.push('\n');
        match entry {
            PhaseEntry::Completed(result) => render_phase(&mut out, result),
            PhaseEntry::Failed { reason } => {
                let _ = writeln!(out, "Phase {phase}");
                let _ = writeln!(out, "  Status: failed ({reason})");
            }
            PhaseEntry::Cancelled => {
                let _ = writeln!(out, "Phase {phase}");
                let _ = writeln!(out, "  Status: cancelled");
            }
            PhaseEntry::TimedOut => {
                let _ = writeln!(out, "Phase {phase}");
                let _ = writeln!(out, "  Status: timed out");
            }
        }
    }
    out
}

fn render_phase(out: &mut String, result: &PhaseConnectivityResult) {
    match &result.name {
        Some(name) => {
            let _ = writeln!(out, "Phase {} ({})", result.phase, name);
        }
        None => {
            let _ = writeln!(out, "Phase {}", result.phase);
        }
    }
    let yes_no = |b: bool| if b { "yes" } else { "no" };
    let _ = writeln!(out, "  Voxels: {}", result.voxel_count);
    let _ = writeln!(out, "  Components: {}", result.total_components);
    let flags = result.percolation_flags();
    for axis in Axis::ALL {
        let _ = writeln!(out, "  Percolates {}: {}", axis.name(), yes_no(flags.get(axis)));
    }
    let _ = writeln!(out, "  Fully percolated: {}", yes_no(result.fully_percolated));
    let _ = writeln!(out, "  Total volume: {:.6}", result.total_phase_volume);
    let _ = writeln!(out, "  Percolation ratio: {:.6}", result.percolation_ratio);
    let _ = writeln!(out, "  Component volumes:");

    let mut spanning = result.component_percolation.iter().peekable();
    for (i, volume) in result.component_volumes.iter().enumerate() {
        let rank = i + 1;
        let _ = write!(out, "    {rank} {volume:.6}");
        if let Some(c) = spanning.next_if(|c| c.component == rank) {
            let axes: Vec<&str> = Axis::ALL
                .into_iter()
                .filter(|&axis| c.axes.get(axis))
                .map(Axis::name)
                .collect();
            let _ = write!(out, " percolates {}", axes.join(""));
        }
        out.push('\n');
    }
}
