use std::collections::HashMap;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, info, warn};
use serde::Serialize;
use uuid::Uuid;

use crate::config::{AnalysisConfig, BackendKind};
use crate::connectivity::report::{ConnectivityReport, render_text_report};
use crate::connectivity::service::{CancellationToken, ConnectivityService};
use crate::error::AnalysisError;
use crate::parsers::write_microstructure_file;
use crate::utils::voxel_grid::{PhaseId, VoxelGrid};

/// 外部进程状态轮询间隔
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// 单次分析请求的可选参数
#[derive(Debug, Clone, Default)]
pub struct AnalysisRequest {
    /// 只分析这些相；None 表示网格中出现的全部非背景相
    pub phases: Option<Vec<PhaseId>>,
    /// 相编号到名称的映射
    pub names: HashMap<PhaseId, String>,
}

/// 分析输出：进程内分析得到结构化报告，外部程序只返回原始文本
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "report", rename_all = "snake_case")]
pub enum BackendOutput {
    Structured(ConnectivityReport),
    RawText(String),
}

impl BackendOutput {
    pub fn report(&self) -> Option<&ConnectivityReport> {
        match self {
            BackendOutput::Structured(report) => Some(report),
            BackendOutput::RawText(_) => None,
        }
    }

    /// 文本形式的报告
    pub fn to_text(&self) -> String {
        match self {
            BackendOutput::Structured(report) => render_text_report(report),
            BackendOutput::RawText(text) => text.clone(),
        }
    }
}

/// 连通性分析实现，在配置阶段二选一
pub trait ConnectivityBackend: Send + Sync {
    /// 后端名称（用于日志和接口输出）
    fn name(&self) -> &'static str;

    fn analyze(
        &self,
        grid: &VoxelGrid,
        request: &AnalysisRequest,
        token: &CancellationToken,
    ) -> Result<BackendOutput, AnalysisError>;
}

/// 根据配置构造后端
pub fn backend_from_config(
    config: &AnalysisConfig,
) -> Result<Box<dyn ConnectivityBackend>, AnalysisError> {
    match &config.backend {
        BackendKind::Native => Ok(Box::new(NativeBackend::new(config)?)),
        BackendKind::External { program } => Ok(Box::new(
            ExternalProcessBackend::new(program.clone()).with_deadline(config.deadline),
        )),
    }
}

/// 进程内分析
pub struct NativeBackend {
    service: ConnectivityService,
}

impl NativeBackend {
    pub fn new(config: &AnalysisConfig) -> Result<Self, AnalysisError> {
        Ok(Self {
            service: ConnectivityService::new(config)?,
        })
    }
}

impl ConnectivityBackend for NativeBackend {
    fn name(&self) -> &'static str {
        "native"
    }

    fn analyze(
        &self,
        grid: &VoxelGrid,
        request: &AnalysisRequest,
        token: &CancellationToken,
    ) -> Result<BackendOutput, AnalysisError> {
        let mut report = match &request.phases {
            Some(phases) => self.service.analyze_phases(grid, phases, token),
            None => self.service.analyze_with_cancel(grid, token),
        };
        report.apply_phase_names(&request.names);
        Ok(BackendOutput::Structured(report))
    }
}

/// 调用外部命令行分析程序：`<program> <输入体素文件> <输出报告文件>`
///
/// 网格先写成文本微结构文件，程序的输出文本不做解析直接返回。
/// 取消与截止时间通过轮询子进程实现，触发时终止子进程。
pub struct ExternalProcessBackend {
    program: PathBuf,
    work_dir: PathBuf,
    deadline: Option<Duration>,
}

impl ExternalProcessBackend {
    pub fn new(program: PathBuf) -> Self {
        Self {
            program,
            work_dir: std::env::temp_dir(),
            deadline: None,
        }
    }

    /// 临时文件所在目录，默认为系统临时目录
    pub fn with_work_dir(mut self, work_dir: PathBuf) -> Self {
        self.work_dir = work_dir;
        self
    }

    pub fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }

    fn run(
        &self,
        input: &Path,
        output: &Path,
        stderr_path: &Path,
        token: &CancellationToken,
    ) -> Result<String, AnalysisError> {
        let started = Instant::now();
        let mut child = Command::new(&self.program)
            .arg(input)
            .arg(output)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::from(File::create(stderr_path)?))
            .spawn()
            .map_err(|e| {
                AnalysisError::Backend(format!("无法启动 {}: {}", self.program.display(), e))
            })?;

        let status = loop {
            if let Some(status) = child.try_wait()? {
                break status;
            }
            let interrupted = if token.is_cancelled() {
                Some(AnalysisError::Cancelled)
            } else if self.deadline.is_some_and(|d| started.elapsed() >= d) {
                Some(AnalysisError::TimedOut)
            } else {
                None
            };
            if let Some(err) = interrupted {
                warn!("[外部分析] 终止子进程: {}", err);
                let _ = child.kill();
                let _ = child.wait();
                return Err(err);
            }
            thread::sleep(POLL_INTERVAL);
        };

        if !status.success() {
            let stderr = fs::read_to_string(stderr_path).unwrap_or_default();
            return Err(AnalysisError::Backend(format!(
                "{} 退出状态 {}: {}",
                self.program.display(),
                status,
                stderr.trim()
            )));
        }

        info!(
            "[外部分析] {} 完成，耗时 {}ms",
            self.program.display(),
            started.elapsed().as_millis()
        );
        Ok(fs::read_to_string(output)?)
    }
}

impl ConnectivityBackend for ExternalProcessBackend {
    fn name(&self) -> &'static str {
        "external"
    }

    fn analyze(
        &self,
        grid: &VoxelGrid,
        request: &AnalysisRequest,
        token: &CancellationToken,
    ) -> Result<BackendOutput, AnalysisError> {
        if token.is_cancelled() {
            return Err(AnalysisError::Cancelled);
        }
        if request.phases.is_some() {
            debug!("[外部分析] 外部程序总是分析全部相，忽略相筛选");
        }

        let id = Uuid::new_v4();
        let input = self.work_dir.join(format!("connectivity-{id}.img"));
        let output = self.work_dir.join(format!("connectivity-{id}.txt"));
        let stderr_path = self.work_dir.join(format!("connectivity-{id}.err"));

        let result = write_microstructure_file(grid, &input)
            .map_err(AnalysisError::from)
            .and_then(|()| self.run(&input, &output, &stderr_path, token));

        for path in [&input, &output, &stderr_path] {
            if path.exists() {
                if let Err(e) = fs::remove_file(path) {
                    warn!("[外部分析] 删除临时文件 {} 失败: {}", path.display(), e);
                }
            }
        }

        result.map(BackendOutput::RawText)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column_grid() -> VoxelGrid {
        let mut grid = VoxelGrid::filled([3, 3, 3], [1.0; 3], 0).unwrap();
        for z in 0..3 {
            grid.set(1, 1, z, 4);
        }
        grid
    }

    #[test]
    fn native_backend_applies_names_and_phase_filter() {
        let backend = backend_from_config(&AnalysisConfig {
            worker_threads: 1,
            ..AnalysisConfig::default()
        })
        .unwrap();
        assert_eq!(backend.name(), "native");

        let request = AnalysisRequest {
            phases: Some(vec![4]),
            names: HashMap::from([(4, "CH".to_string())]),
        };
        let output = backend
            .analyze(&column_grid(), &request, &CancellationToken::new())
            .unwrap();
        let report = output.report().unwrap();
        let result = report.result(4).unwrap();
        assert_eq!(result.name.as_deref(), Some("CH"));
        assert!(result.percolates_z);
        assert!(output.to_text().contains("Phase 4 (CH)"));
    }

    #[test]
    fn external_backend_reports_missing_program() {
        let dir = tempfile::tempdir().unwrap();
        let backend = ExternalProcessBackend::new(PathBuf::from("/nonexistent/perc3d"))
            .with_work_dir(dir.path().to_path_buf());
        let err = backend
            .analyze(&column_grid(), &AnalysisRequest::default(), &CancellationToken::new())
            .unwrap_err();
        assert!(matches!(err, AnalysisError::Backend(_)));
        // 临时文件已清理
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn external_backend_honours_cancellation() {
        let backend = ExternalProcessBackend::new(PathBuf::from("/nonexistent/perc3d"));
        let token = CancellationToken::new();
        token.cancel();
        let err = backend
            .analyze(&column_grid(), &AnalysisRequest::default(), &token)
            .unwrap_err();
        assert_eq!(err, AnalysisError::Cancelled);
    }

    #[cfg(unix)]
    #[test]
    fn external_backend_returns_raw_output() {
        // cp 把输入文件原样复制到输出路径，输出即为体素文件本身
        let dir = tempfile::tempdir().unwrap();
        let backend = ExternalProcessBackend::new(PathBuf::from("cp"))
            .with_work_dir(dir.path().to_path_buf());
        let output = backend
            .analyze(&column_grid(), &AnalysisRequest::default(), &CancellationToken::new())
            .unwrap();
        let BackendOutput::RawText(text) = output else {
            panic!("expected raw text output");
        };
        assert!(text.starts_with("Version: 7.0\nX_Size: 3\n"));
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
