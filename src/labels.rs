use std::io::{self, Cursor};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::config::AnalysisLimits;
use crate::connectivity::labeling::LabelField;
use crate::connectivity::phase::{merged_components, rank_by_size};
use crate::error::AnalysisError;
use crate::utils::voxel_grid::{PhaseId, VoxelGrid};

/// 计算某个相周期合并后的组件标签，并按体积重新编号：
/// 1 为最大组件，与 `PhaseConnectivityResult::component_volumes` 的顺序一致
pub fn ranked_labels(
    grid: &VoxelGrid,
    phase: PhaseId,
    limits: AnalysisLimits,
) -> Result<LabelField, AnalysisError> {
    let merged = merged_components(grid, phase, limits)?;

    let mut rank_of = vec![0u32; merged.count() + 1];
    for (rank, (label, _)) in rank_by_size(&merged.voxel_counts).into_iter().enumerate() {
        rank_of[label as usize] = rank as u32 + 1;
    }

    let shape = merged.field.shape();
    let count = merged.count();
    let mut labels = merged.field.into_labels();
    for label in labels.iter_mut() {
        *label = rank_of[*label as usize];
    }
    Ok(LabelField::new(shape, labels, count))
}

/// 标签数组编码为小端 u32 字节流
pub fn labels_to_le_bytes(field: &LabelField) -> io::Result<Vec<u8>> {
    let mut bytes = Vec::with_capacity(field.labels().len() * std::mem::size_of::<u32>());
    for &label in field.labels() {
        bytes.write_u32::<LittleEndian>(label)?;
    }
    Ok(bytes)
}

/// 从小端 u32 字节流解码标签数组
pub fn labels_from_le_bytes(bytes: &[u8]) -> io::Result<Vec<u32>> {
    if bytes.len() % 4 != 0 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("字节数 {} 不是 4 的倍数", bytes.len()),
        ));
    }
    let mut cursor = Cursor::new(bytes);
    let mut labels = Vec::with_capacity(bytes.len() / 4);
    for _ in 0..bytes.len() / 4 {
        labels.push(cursor.read_u32::<LittleEndian>()?);
    }
    Ok(labels)
}
