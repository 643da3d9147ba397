use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use log::{debug, warn};

use crate::error::{GridError, ParseError};
use crate::utils::parser::VoxelGridParser;
use crate::utils::voxel_grid::{PhaseId, VoxelGrid};

/// 写出文件时使用的格式版本
pub const FORMAT_VERSION: &str = "7.0";

/// 按文件头预分配的体素数上限，超出部分随读取增长
const MAX_PREALLOCATED_VOXELS: usize = 1 << 24;

/// 文本微结构文件解析器
///
/// 文件头为若干 `键: 值` 行（Version、X_Size、Y_Size、Z_Size、Image_Resolution），
/// 之后每行一个相编号，x 变化最快，其次 y，最后 z。
/// `.gz` 结尾的文件先经 gzip 解压。
pub struct MicrostructureParser;

impl MicrostructureParser {
    pub fn new() -> Self {
        MicrostructureParser
    }

    /// 从任意按行读取的输入解析体素网格
    pub fn parse_from_reader<R: BufRead>(&self, reader: R) -> Result<VoxelGrid, ParseError> {
        let mut header = HeaderBuilder::default();
        let mut data: Option<Vec<PhaseId>> = None;
        let mut expected = 0usize;

        for (i, line) in reader.lines().enumerate() {
            let line = line?;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            if data.is_none() {
                if header.accept(trimmed)? {
                    continue;
                }
                // 第一行数据：文件头到此结束
                let shape = header.shape()?;
                expected = VoxelGrid::checked_len(shape)?;
                data = Some(Vec::with_capacity(expected.min(MAX_PREALLOCATED_VOXELS)));
            }
            let values = data.get_or_insert_with(Vec::new);

            for token in trimmed.split_whitespace() {
                let phase = token.parse::<PhaseId>().map_err(|_| ParseError::InvalidValue {
                    line: i + 1,
                    value: token.to_string(),
                })?;
                if values.len() == expected {
                    return Err(GridError::DataLength {
                        shape: header.shape()?,
                        expected,
                        actual: expected + 1,
                    }
                    .into());
                }
                values.push(phase);
            }
        }

        let shape = header.shape()?;
        let resolution = header.resolution()?;
        debug!(
            "[文件解析] 版本 {}，shape {:?}，分辨率 {}",
            header.version.as_deref().unwrap_or("未知"),
            shape,
            resolution
        );
        Ok(VoxelGrid::isotropic(
            shape,
            resolution,
            data.unwrap_or_default(),
        )?)
    }
}

impl Default for MicrostructureParser {
    fn default() -> Self {
        Self::new()
    }
}

impl VoxelGridParser for MicrostructureParser {
    fn supported_extensions(&self) -> Vec<&'static str> {
        vec!["img", "txt", "gz"]
    }

    fn name(&self) -> &'static str {
        "Microstructure Text Parser"
    }

    fn parse_from_file(&self, file_path: &str) -> Result<VoxelGrid, ParseError> {
        self.parse_from_reader(open_reader(file_path)?)
    }

    fn get_shape_from_file(&self, file_path: &str) -> Result<[usize; 3], ParseError> {
        let reader = open_reader(file_path)?;
        let mut header = HeaderBuilder::default();
        for line in reader.lines() {
            let line = line?;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            if !header.accept(trimmed)? {
                break;
            }
        }
        header.shape()
    }
}

fn is_gzip(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("gz"))
}

fn open_reader(file_path: &str) -> Result<Box<dyn BufRead>, ParseError> {
    let path = Path::new(file_path);
    let file = File::open(path)?;
    if is_gzip(path) {
        Ok(Box::new(BufReader::new(GzDecoder::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

/// 逐行收集文件头字段
#[derive(Debug, Default)]
struct HeaderBuilder {
    version: Option<String>,
    sizes: [Option<usize>; 3],
    resolution: Option<String>,
}

impl HeaderBuilder {
    /// 如果该行是文件头行则记录并返回 true；遇到数据行返回 false
    fn accept(&mut self, line: &str) -> Result<bool, ParseError> {
        if !line.starts_with(|c: char| c.is_ascii_alphabetic()) {
            return Ok(false);
        }
        let (key, value) = line
            .split_once(':')
            .or_else(|| line.split_once(char::is_whitespace))
            .map(|(k, v)| (k.trim(), v.trim()))
            .unwrap_or((line, ""));

        match key {
            "Version" => self.version = Some(value.to_string()),
            "X_Size" => self.sizes[0] = Some(parse_field("X_Size", value)?),
            "Y_Size" => self.sizes[1] = Some(parse_field("Y_Size", value)?),
            "Z_Size" => self.sizes[2] = Some(parse_field("Z_Size", value)?),
            "Image_Resolution" => self.resolution = Some(value.to_string()),
            other => debug!("[文件解析] 忽略未知文件头字段 '{}'", other),
        }
        Ok(true)
    }

    /// 文件头声明的 shape，体素总数超出可寻址范围时报错
    fn shape(&self) -> Result<[usize; 3], ParseError> {
        let [x, y, z] = self.sizes;
        let shape = [
            x.ok_or(ParseError::MissingHeader("X_Size"))?,
            y.ok_or(ParseError::MissingHeader("Y_Size"))?,
            z.ok_or(ParseError::MissingHeader("Z_Size"))?,
        ];
        VoxelGrid::checked_len(shape)?;
        Ok(shape)
    }

    /// 缺少 Image_Resolution 的旧文件按 1.0 处理
    fn resolution(&self) -> Result<f64, ParseError> {
        match &self.resolution {
            None => Ok(1.0),
            Some(value) => parse_field("Image_Resolution", value),
        }
    }
}

fn parse_field<T: std::str::FromStr>(field: &'static str, value: &str) -> Result<T, ParseError> {
    value.parse::<T>().map_err(|_| ParseError::InvalidHeader {
        field,
        value: value.to_string(),
    })
}

/// 按文本微结构格式写出网格
///
/// 格式只能表达各向同性体素，非各向同性时以 dx 作为分辨率写出。
pub fn write_microstructure<W: Write>(grid: &VoxelGrid, mut writer: W) -> std::io::Result<()> {
    let [nx, ny, nz] = grid.shape();
    let [dx, dy, dz] = grid.voxel_size();
    if dx != dy || dy != dz {
        warn!(
            "[文件写出] 体素尺寸 {:?} 不是各向同性，Image_Resolution 使用 {}",
            grid.voxel_size(),
            dx
        );
    }

    writeln!(writer, "Version: {FORMAT_VERSION}")?;
    writeln!(writer, "X_Size: {nx}")?;
    writeln!(writer, "Y_Size: {ny}")?;
    writeln!(writer, "Z_Size: {nz}")?;
    writeln!(writer, "Image_Resolution: {dx}")?;
    for phase in grid.data() {
        writeln!(writer, "{phase}")?;
    }
    writer.flush()
}

/// 写出到文件，`.gz` 结尾时使用 gzip 压缩
pub fn write_microstructure_file(grid: &VoxelGrid, path: &Path) -> std::io::Result<()> {
    let file = File::create(path)?;
    if is_gzip(path) {
        let mut encoder = GzEncoder::new(BufWriter::new(file), Compression::default());
        write_microstructure(grid, &mut encoder)?;
        encoder.finish()?.flush()
    } else {
        write_microstructure(grid, BufWriter::new(file))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SMALL: &str = "Version: 7.0\nX_Size: 2\nY_Size: 2\nZ_Size: 1\nImage_Resolution: 0.5\n1\n0\n3\n3\n";

    #[test]
    fn parses_header_and_x_fastest_body() {
        let grid = MicrostructureParser::new()
            .parse_from_reader(SMALL.as_bytes())
            .unwrap();
        assert_eq!(grid.shape(), [2, 2, 1]);
        assert_eq!(grid.voxel_size(), [0.5; 3]);
        assert_eq!(grid.phase_of(0, 0, 0), 1);
        assert_eq!(grid.phase_of(1, 0, 0), 0);
        assert_eq!(grid.phase_of(0, 1, 0), 3);
    }

    #[test]
    fn resolution_defaults_to_one() {
        let text = "X_Size 1\nY_Size 1\nZ_Size 2\n\n4\n4\n";
        let grid = MicrostructureParser::new()
            .parse_from_reader(text.as_bytes())
            .unwrap();
        assert_eq!(grid.voxel_size(), [1.0; 3]);
        assert_eq!(grid.data(), &[4, 4]);
    }

    #[test]
    fn missing_size_is_reported() {
        let text = "Version: 7.0\nX_Size: 1\nZ_Size: 1\n1\n";
        let err = MicrostructureParser::new()
            .parse_from_reader(text.as_bytes())
            .unwrap_err();
        assert!(matches!(err, ParseError::MissingHeader("Y_Size")));
    }

    #[test]
    fn bad_value_reports_line() {
        let text = "X_Size: 2\nY_Size: 1\nZ_Size: 1\n1\n-2\n";
        let err = MicrostructureParser::new()
            .parse_from_reader(text.as_bytes())
            .unwrap_err();
        assert!(matches!(err, ParseError::InvalidValue { line: 5, .. }));
    }

    #[test]
    fn short_body_is_a_grid_error() {
        let text = "X_Size: 2\nY_Size: 2\nZ_Size: 1\n1\n1\n";
        let err = MicrostructureParser::new()
            .parse_from_reader(text.as_bytes())
            .unwrap_err();
        assert!(matches!(err, ParseError::Grid(_)));
    }

    #[test]
    fn overflowing_header_sizes_are_rejected() {
        let text = "X_Size: 4294967296\nY_Size: 4294967296\nZ_Size: 4294967296\n1\n";
        let err = MicrostructureParser::new()
            .parse_from_reader(text.as_bytes())
            .unwrap_err();
        assert!(matches!(err, ParseError::Grid(GridError::TooLarge(_))));
    }

    #[test]
    fn huge_header_sizes_are_rejected_before_reading_body() {
        let text = "X_Size: 1048576\nY_Size: 1048576\nZ_Size: 1024\n1\n";
        let err = MicrostructureParser::new()
            .parse_from_reader(text.as_bytes())
            .unwrap_err();
        assert!(matches!(err, ParseError::Grid(GridError::TooLarge(_))));

        let text = "X_Size: 0\nY_Size: 4\nZ_Size: 4\n1\n";
        let err = MicrostructureParser::new()
            .parse_from_reader(text.as_bytes())
            .unwrap_err();
        assert!(matches!(
            err,
            ParseError::Grid(GridError::InvalidExtent([0, 4, 4]))
        ));
    }

    #[test]
    fn body_longer_than_header_stops_early() {
        let text = "X_Size: 2\nY_Size: 1\nZ_Size: 1\n1\n1\n1\n1\n";
        let err = MicrostructureParser::new()
            .parse_from_reader(text.as_bytes())
            .unwrap_err();
        assert!(matches!(
            err,
            ParseError::Grid(GridError::DataLength { expected: 2, actual: 3, .. })
        ));
    }

    #[test]
    fn header_shape_lookup_validates_sizes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("huge.img");
        std::fs::write(&path, "X_Size: 1048576\nY_Size: 1048576\nZ_Size: 1024\n1\n").unwrap();
        let err = MicrostructureParser::new()
            .get_shape_from_file(path.to_str().unwrap())
            .unwrap_err();
        assert!(matches!(err, ParseError::Grid(GridError::TooLarge(_))));
    }

    #[test]
    fn gzip_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("paste.img.gz");
        let grid = MicrostructureParser::new()
            .parse_from_reader(SMALL.as_bytes())
            .unwrap();
        write_microstructure_file(&grid, &path).unwrap();

        let parser = MicrostructureParser::new();
        let path_str = path.to_str().unwrap();
        assert_eq!(parser.get_shape_from_file(path_str).unwrap(), [2, 2, 1]);
        let back = parser.parse_from_file(path_str).unwrap();
        assert_eq!(back.data(), grid.data());
        assert_eq!(back.voxel_size(), grid.voxel_size());
    }
}
