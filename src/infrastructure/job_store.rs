//! 任务存储 - 基础设施层
//!
//! 进程内的 job_id → Job 映射，只暴露插入 / 快照 / 原地修改三种能力

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::models::job::Job;

/// 任务存储
///
/// 职责：
/// - 持有全部任务，进程退出即丢失
/// - 读取返回克隆的快照，不会阻塞在任务进度上
/// - 不认识状态机，转换规则由 `Job` 自己校验
#[derive(Debug, Clone, Default)]
pub struct JobStore {
    jobs: Arc<RwLock<HashMap<String, Job>>>,
}

impl JobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, job: Job) {
        self.jobs.write().await.insert(job.job_id.clone(), job);
    }

    /// 当前快照
    pub async fn get(&self, job_id: &str) -> Option<Job> {
        self.jobs.read().await.get(job_id).cloned()
    }

    /// 在写锁内修改任务；任务不存在时返回 None
    pub async fn update<R>(&self, job_id: &str, f: impl FnOnce(&mut Job) -> R) -> Option<R> {
        let mut jobs = self.jobs.write().await;
        jobs.get_mut(job_id).map(f)
    }

    pub async fn len(&self) -> usize {
        self.jobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.jobs.read().await.is_empty()
    }
}
