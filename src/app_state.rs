use std::path::{Component, Path};
use std::sync::Arc;

use crate::config::AnalysisLimits;
use crate::connectivity::backend::ConnectivityBackend;
use crate::jobs::JobStore;
use crate::utils::parser_registry::ParserRegistry;

/// 全局应用状态，负责在各个 handler 之间共享解析器、分析后端与任务存储
pub struct AppState {
    pub parser_registry: Arc<ParserRegistry>,
    pub resource_dir: String,
    pub job_store: Arc<JobStore>,
    pub backend: Arc<dyn ConnectivityBackend>,
    /// 标签导出接口使用的安全上限
    pub limits: AnalysisLimits,
}

impl AppState {
    /// 资源目录下文件的完整路径
    ///
    /// 只接受资源目录内的相对路径，含 `..`、绝对路径或为空时返回 None。
    pub fn resource_path(&self, file: &str) -> Option<String> {
        let relative = Path::new(file);
        let inside = relative
            .components()
            .all(|component| matches!(component, Component::Normal(_) | Component::CurDir));
        if file.is_empty() || !inside {
            return None;
        }
        Some(format!("{}/{}", self.resource_dir, file))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connectivity::backend::NativeBackend;
    use crate::config::AnalysisConfig;

    fn state() -> AppState {
        AppState {
            parser_registry: Arc::new(ParserRegistry::new()),
            resource_dir: "test/resource".to_string(),
            job_store: Arc::new(JobStore::new()),
            backend: Arc::new(
                NativeBackend::new(&AnalysisConfig {
                    worker_threads: 1,
                    ..AnalysisConfig::default()
                })
                .unwrap(),
            ),
            limits: AnalysisLimits::default(),
        }
    }

    #[test]
    fn resource_path_stays_inside_resource_dir() {
        let state = state();
        assert_eq!(
            state.resource_path("paste.img").as_deref(),
            Some("test/resource/paste.img")
        );
        assert_eq!(
            state.resource_path("runs/day7.img.gz").as_deref(),
            Some("test/resource/runs/day7.img.gz")
        );
        assert!(state.resource_path("../secret.img").is_none());
        assert!(state.resource_path("runs/../../secret.txt").is_none());
        assert!(state.resource_path("/etc/passwd.txt").is_none());
        assert!(state.resource_path("").is_none());
    }
}
