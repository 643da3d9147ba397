mod microstructure;

pub use microstructure::{MicrostructureParser, write_microstructure, write_microstructure_file};

/// 获取所有可用的解析器
pub fn get_all_parsers() -> Vec<Box<dyn crate::utils::parser::VoxelGridParser>> {
    vec![Box::new(MicrostructureParser::new())]
}
