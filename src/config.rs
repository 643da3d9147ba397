use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const ENV_HOST: &str = "CONNECTIVITY_HOST";
pub const ENV_PORT: &str = "CONNECTIVITY_PORT";
pub const ENV_RESOURCE_DIR: &str = "CONNECTIVITY_RESOURCE_DIR";
pub const ENV_JOB_TTL_SECS: &str = "CONNECTIVITY_JOB_TTL_SECS";
pub const ENV_MAX_PHASE_VOXELS: &str = "CONNECTIVITY_MAX_PHASE_VOXELS";
pub const ENV_MAX_COMPONENTS: &str = "CONNECTIVITY_MAX_COMPONENTS";
pub const ENV_WORKER_THREADS: &str = "CONNECTIVITY_WORKER_THREADS";
pub const ENV_DEADLINE_SECS: &str = "CONNECTIVITY_DEADLINE_SECS";
pub const ENV_BACKEND: &str = "CONNECTIVITY_BACKEND";
pub const ENV_EXTERNAL_PROGRAM: &str = "CONNECTIVITY_EXTERNAL_PROGRAM";

/// 单相分析的安全上限，None 表示不限制
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisLimits {
    pub max_phase_voxels: Option<u64>,
    pub max_components: Option<usize>,
}

/// 连通性分析的实现方式，在配置阶段选定
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum BackendKind {
    /// 进程内分析，输出结构化报告
    #[default]
    Native,
    /// 调用外部命令行分析程序，输出原始文本
    External { program: PathBuf },
}

/// 分析参数
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnalysisConfig {
    pub limits: AnalysisLimits,
    /// 工作线程数，0 表示使用可用 CPU 核数
    pub worker_threads: usize,
    /// 整个报告的截止时间（从开始分析算起）
    pub deadline: Option<Duration>,
    pub backend: BackendKind,
}

impl AnalysisConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 通过任意键值查找函数构造配置，便于测试时不修改进程环境
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let limits = AnalysisLimits {
            max_phase_voxels: parse_optional(&lookup, ENV_MAX_PHASE_VOXELS)?,
            max_components: parse_optional(&lookup, ENV_MAX_COMPONENTS)?,
        };
        let worker_threads = parse_optional(&lookup, ENV_WORKER_THREADS)?.unwrap_or(0);
        let deadline = parse_optional::<u64, _>(&lookup, ENV_DEADLINE_SECS)?.map(Duration::from_secs);

        let backend = match lookup(ENV_BACKEND).as_deref().map(str::trim) {
            None | Some("") | Some("native") => BackendKind::Native,
            Some("external") => {
                let program = lookup(ENV_EXTERNAL_PROGRAM)
                    .filter(|p| !p.trim().is_empty())
                    .ok_or(ConfigError::MissingExternalProgram(ENV_EXTERNAL_PROGRAM))?;
                BackendKind::External {
                    program: PathBuf::from(program),
                }
            }
            Some(other) => {
                return Err(ConfigError::InvalidValue {
                    key: ENV_BACKEND,
                    value: other.to_string(),
                    reason: "只支持 native 或 external".to_string(),
                });
            }
        };

        Ok(Self {
            limits,
            worker_threads,
            deadline,
            backend,
        })
    }

    /// 实际使用的工作线程数
    pub fn effective_worker_threads(&self) -> usize {
        if self.worker_threads > 0 {
            self.worker_threads
        } else {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        }
    }
}

/// HTTP 服务参数
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub resource_dir: String,
    /// 分析任务的过期时间
    pub job_ttl: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            resource_dir: "test/resource".to_string(),
            job_ttl: Duration::from_secs(30 * 60), // 30 分钟
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Ok(Self {
            host: lookup(ENV_HOST).unwrap_or(defaults.host),
            port: parse_optional(&lookup, ENV_PORT)?.unwrap_or(defaults.port),
            resource_dir: lookup(ENV_RESOURCE_DIR).unwrap_or(defaults.resource_dir),
            job_ttl: parse_optional::<u64, _>(&lookup, ENV_JOB_TTL_SECS)?
                .map(Duration::from_secs)
                .unwrap_or(defaults.job_ttl),
        })
    }
}

fn parse_optional<T, F>(lookup: &F, key: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| ConfigError::InvalidValue {
                key,
                value: raw.clone(),
                reason: e.to_string(),
            }),
    }
}
