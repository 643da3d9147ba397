use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use serde::Serialize;
use uuid::Uuid;

use crate::connectivity::backend::BackendOutput;
use crate::connectivity::service::CancellationToken;
use crate::utils::voxel_grid::PhaseId;

/// 分析任务状态
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum JobStatus {
    /// 已创建，等待后台线程开始
    Pending,
    Running,
    Completed,
    Failed { error: String },
}

impl JobStatus {
    pub fn is_finished(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed { .. })
    }
}

#[derive(Debug)]
struct JobState {
    status: JobStatus,
    output: Option<BackendOutput>,
}

/// 单个分析任务
/// 报告在后台分析完成后写入，可被多次读取直到任务过期
pub struct JobData {
    /// 资源目录下的文件名
    pub file: String,
    /// 请求的相；None 表示全部
    pub phases: Option<Vec<PhaseId>>,
    /// 任务创建时间，用于 TTL 过期检查
    pub created_at: Instant,
    pub token: CancellationToken,
    state: RwLock<JobState>,
}

impl JobData {
    pub fn new(file: String, phases: Option<Vec<PhaseId>>) -> Self {
        Self {
            file,
            phases,
            created_at: Instant::now(),
            token: CancellationToken::new(),
            state: RwLock::new(JobState {
                status: JobStatus::Pending,
                output: None,
            }),
        }
    }

    pub fn status(&self) -> JobStatus {
        self.state.read().status.clone()
    }

    pub fn output(&self) -> Option<BackendOutput> {
        self.state.read().output.clone()
    }

    pub fn mark_running(&self) {
        self.state.write().status = JobStatus::Running;
    }

    /// 写入分析结果（后台分析完成后调用）
    pub fn complete(&self, output: BackendOutput) {
        let mut state = self.state.write();
        state.status = JobStatus::Completed;
        state.output = Some(output);
    }

    pub fn fail(&self, error: String) {
        let mut state = self.state.write();
        state.status = JobStatus::Failed { error };
        state.output = None;
    }

    /// 请求取消；尚未开始的相会在报告中标记为已取消
    pub fn cancel(&self) {
        self.token.cancel();
    }
}

pub struct JobStore {
    jobs: RwLock<HashMap<String, Arc<JobData>>>,
    /// TTL（Time-To-Live）默认过期时间：30 分钟
    default_ttl: Duration,
}

impl JobStore {
    pub fn new() -> Self {
        Self::with_ttl(Duration::from_secs(30 * 60))
    }

    /// 创建带自定义 TTL 的 JobStore
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            jobs: RwLock::new(HashMap::new()),
            default_ttl: ttl,
        }
    }

    pub fn insert(&self, data: JobData) -> (String, Arc<JobData>) {
        let job_id = Uuid::new_v4().to_string();
        let job = Arc::new(data);
        self.jobs.write().insert(job_id.clone(), job.clone());
        (job_id, job)
    }

    pub fn get(&self, job_id: &str) -> Option<Arc<JobData>> {
        self.jobs.read().get(job_id).cloned()
    }

    /// 清理过期且已结束的任务，返回清理的任务数量
    pub fn cleanup_expired(&self) -> usize {
        let now = Instant::now();
        let mut jobs = self.jobs.write();
        let before_count = jobs.len();

        jobs.retain(|_, job| {
            now.duration_since(job.created_at) < self.default_ttl || !job.status().is_finished()
        });

        before_count - jobs.len()
    }

    /// 清理所有任务
    pub fn clear_all(&self) {
        self.jobs.write().clear();
    }

    /// 获取当前任务数量
    pub fn job_count(&self) -> usize {
        self.jobs.read().len()
    }

    /// 获取默认 TTL
    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }
}

impl Default for JobStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_lifecycle() {
        let store = JobStore::new();
        let (id, job) = store.insert(JobData::new("paste.img".to_string(), None));
        assert_eq!(store.get(&id).unwrap().status(), JobStatus::Pending);

        job.mark_running();
        assert_eq!(job.status(), JobStatus::Running);
        job.complete(BackendOutput::RawText("done".to_string()));
        assert_eq!(store.get(&id).unwrap().status(), JobStatus::Completed);
        assert_eq!(
            store.get(&id).unwrap().output(),
            Some(BackendOutput::RawText("done".to_string()))
        );
        assert!(store.get("missing").is_none());
    }

    #[test]
    fn cleanup_keeps_unfinished_jobs() {
        let store = JobStore::with_ttl(Duration::ZERO);
        let (_, running) = store.insert(JobData::new("a.img".to_string(), None));
        running.mark_running();
        let (_, failed) = store.insert(JobData::new("b.img".to_string(), None));
        failed.fail("boom".to_string());

        assert_eq!(store.cleanup_expired(), 1);
        assert_eq!(store.job_count(), 1);
        store.clear_all();
        assert_eq!(store.job_count(), 0);
    }

    #[test]
    fn cancel_sets_token() {
        let job = JobData::new("a.img".to_string(), Some(vec![1]));
        assert!(!job.token.is_cancelled());
        job.cancel();
        assert!(job.token.is_cancelled());
    }
}
