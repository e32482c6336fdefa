use crate::models::corpus::CorpusItem;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;

/// 批次：按全局顺序划分的一组条目，创建后不再修改
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    /// 从 1 开始的序号
    pub ordinal: usize,
    pub items: Vec<CorpusItem>,
}

impl Batch {
    pub fn item_ids(&self) -> Vec<i64> {
        self.items.iter().map(|item| item.id).collect()
    }

    /// 把本批所有条目合并为一个文本块：每条一行 JSON
    pub fn combined_payload(&self) -> serde_json::Result<String> {
        let mut combined = String::new();
        for item in &self.items {
            combined.push_str(&item.payload_line()?);
            combined.push('\n');
        }
        Ok(combined)
    }
}

/// 批次产物：一次批次调用的原始响应
///
/// 磁盘上的 `batch{n}.json` 只保存 `raw_response`，重跑时按序号覆盖。
#[derive(Debug, Clone, PartialEq)]
pub struct BatchArtifact {
    pub batch_ordinal: usize,
    pub raw_response: Value,
    pub source_batch_ids: Vec<i64>,
}

/// 批次失败时的处理策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum FailurePolicy {
    /// 第一个失败的批次终止本次运行
    FailFast,
    /// 每批最多尝试 `max_attempts` 次，仍失败则记录后继续下一批
    RetryThenContinue { max_attempts: u32 },
}

impl Default for FailurePolicy {
    fn default() -> Self {
        FailurePolicy::FailFast
    }
}

impl FailurePolicy {
    pub fn max_attempts(self) -> u32 {
        match self {
            FailurePolicy::FailFast => 1,
            FailurePolicy::RetryThenContinue { max_attempts } => max_attempts.max(1),
        }
    }

    pub fn halts_on_failure(self) -> bool {
        matches!(self, FailurePolicy::FailFast)
    }
}

/// 单个批次的调度结果
#[derive(Debug, Clone, PartialEq)]
pub enum BatchStatus {
    Succeeded { artifact_path: PathBuf },
    Failed { cause: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct BatchOutcome {
    pub ordinal: usize,
    pub item_ids: Vec<i64>,
    /// 实际发起的请求次数
    pub attempts: u32,
    pub status: BatchStatus,
}

impl BatchOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self.status, BatchStatus::Succeeded { .. })
    }
}

/// 一次批次调度运行的汇总
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DispatchReport {
    pub total_batches: usize,
    /// 按序号排列，截止到第一个失败（快速失败）或全部批次
    pub outcomes: Vec<BatchOutcome>,
    /// 快速失败时中止的序号
    pub halted_at: Option<usize>,
}

impl DispatchReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    /// 所有批次都已尝试且全部成功
    pub fn is_complete(&self) -> bool {
        self.halted_at.is_none()
            && self.outcomes.len() == self.total_batches
            && self.failed() == 0
    }
}
