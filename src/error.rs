use thiserror::Error;

use crate::utils::voxel_grid::PhaseId;

/// 网格级校验错误，在任何相分析开始之前同步返回给调用方
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GridError {
    #[error("网格尺寸无效: {0:?}，每个轴必须至少包含 1 个体素")]
    InvalidExtent([usize; 3]),

    #[error("体素尺寸无效: {0:?}，每个分量必须是有限正数")]
    InvalidVoxelSize([f64; 3]),

    #[error("数据量不匹配: shape {shape:?} 需要 {expected} 个元素，但提供了 {actual} 个")]
    DataLength {
        shape: [usize; 3],
        expected: usize,
        actual: usize,
    },

    #[error("网格过大: {0} 个体素超出 u32 标签可寻址范围")]
    TooLarge(usize),
}

/// 单相分析错误；在报告中被记录为该相的失败条目
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalysisError {
    #[error(transparent)]
    Grid(#[from] GridError),

    #[error("相 0 是背景/孔隙保留编号，不能作为分析目标")]
    BackgroundPhase,

    #[error("相 {phase} 的{what}为 {actual}，超出安全上限 {limit}")]
    ResourceLimitExceeded {
        phase: PhaseId,
        what: &'static str,
        actual: u64,
        limit: u64,
    },

    #[error("分析已取消")]
    Cancelled,

    #[error("分析超时")]
    TimedOut,

    #[error("创建工作线程池失败: {0}")]
    WorkerPool(String),

    #[error("外部分析程序失败: {0}")]
    Backend(String),

    #[error("I/O 错误: {0}")]
    Io(String),
}

impl From<std::io::Error> for AnalysisError {
    fn from(err: std::io::Error) -> Self {
        AnalysisError::Io(err.to_string())
    }
}

/// 体素文件解析错误
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("读取文件失败: {0}")]
    Io(#[from] std::io::Error),

    #[error("缺少文件头字段 {0}")]
    MissingHeader(&'static str),

    #[error("文件头字段 {field} 无法解析: '{value}'")]
    InvalidHeader { field: &'static str, value: String },

    #[error("第 {line} 行的相编号无法解析: '{value}'")]
    InvalidValue { line: usize, value: String },

    #[error(transparent)]
    Grid(#[from] GridError),
}

/// 环境变量配置错误
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("环境变量 {key} 的值 '{value}' 无效: {reason}")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("使用外部分析后端时必须设置 {0}")]
    MissingExternalProgram(&'static str),
}
