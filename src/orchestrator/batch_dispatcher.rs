//! 批次调度器 - 编排层
//!
//! ## 职责
//!
//! 把每个批次依次送往远程服务，每批持久化一个产物。
//!
//! ## 失败策略
//!
//! - `FailFast`：第一个失败的批次之后不再发送任何批次
//! - `RetryThenContinue`：每批最多重试若干次，仍失败则记录后继续
//!
//! 每次远程调用前都会询问 `IntervalScheduler`，因此最后一批之后不会再等待。

use crate::clients::FlowClient;
use crate::config::{Config, FlowEndpoint};
use crate::error::{AppError, AppResult};
use crate::infrastructure::IntervalScheduler;
use crate::models::{
    Batch, BatchArtifact, BatchOutcome, BatchStatus, DispatchReport, FailurePolicy, FlowRequest,
};
use crate::orchestrator::progress::{emit, ProgressEvent, ProgressSink};
use crate::services::{ArtifactStore, FailureJournal};
use crate::utils::logging;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info, warn};

/// 批次调度器
pub struct BatchDispatcher {
    client: FlowClient,
    endpoint: FlowEndpoint,
    store: ArtifactStore,
    scheduler: IntervalScheduler,
    policy: FailurePolicy,
    journal: FailureJournal,
    progress: Option<ProgressSink>,
}

impl BatchDispatcher {
    pub fn new(
        client: FlowClient,
        endpoint: FlowEndpoint,
        store: ArtifactStore,
        scheduler: IntervalScheduler,
        journal: FailureJournal,
    ) -> Self {
        Self {
            client,
            endpoint,
            store,
            scheduler,
            policy: FailurePolicy::FailFast,
            journal,
            progress: None,
        }
    }

    /// 按配置中的 `batch` 段创建
    pub fn from_config(client: FlowClient, config: &Config) -> Self {
        Self::new(
            client,
            config.batch.endpoint.clone(),
            ArtifactStore::new(&config.batch.output_dir),
            IntervalScheduler::new(Duration::from_secs(config.batch.interval_secs)),
            FailureJournal::with_path(&config.error_log_file),
        )
        .with_policy(config.batch.failure_policy)
    }

    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_progress(mut self, sink: ProgressSink) -> Self {
        self.progress = Some(sink);
        self
    }

    pub fn scheduler(&self) -> &IntervalScheduler {
        &self.scheduler
    }

    /// 依次调度所有批次
    ///
    /// # 返回
    /// 按序号排列的结果；快速失败时截止到第一个失败的批次（含）
    pub async fn run(&mut self, batches: Vec<Batch>) -> DispatchReport {
        let total = batches.len();
        let mut report = DispatchReport {
            total_batches: total,
            ..Default::default()
        };

        for batch in batches {
            let ordinal = batch.ordinal;
            logging::log_batch_start(ordinal, total, &batch.item_ids());
            emit(&self.progress, ProgressEvent::BatchStarted { ordinal, total });

            let outcome = self.dispatch_with_policy(&batch).await;
            let success = outcome.is_success();

            if let BatchStatus::Failed { cause } = &outcome.status {
                error!("[批次 {}] ❌ 处理失败: {}", ordinal, cause);
                self.journal.note(&format!("批次 {ordinal}"), cause).await;
            }

            report.outcomes.push(outcome);
            emit(
                &self.progress,
                ProgressEvent::BatchFinished {
                    ordinal,
                    total,
                    success,
                },
            );

            if !success && self.policy.halts_on_failure() {
                error!("[批次 {}] ⛔ 快速失败，后续批次不再发送", ordinal);
                report.halted_at = Some(ordinal);
                break;
            }
        }

        report
    }

    async fn dispatch_with_policy(&mut self, batch: &Batch) -> BatchOutcome {
        let max_attempts = self.policy.max_attempts();
        let mut attempts = 0;

        let status = loop {
            attempts += 1;

            self.scheduler.acquire().await;
            let result = self.dispatch_once(batch).await;
            self.scheduler.release();

            match result {
                Ok(artifact_path) => {
                    info!(
                        "[批次 {}] ✅ 产物已保存: {}",
                        batch.ordinal,
                        artifact_path.display()
                    );
                    break BatchStatus::Succeeded { artifact_path };
                }
                Err(e) if attempts < max_attempts => {
                    warn!(
                        "[批次 {}] ⚠️ 第 {}/{} 次尝试失败，将重试: {}",
                        batch.ordinal, attempts, max_attempts, e
                    );
                }
                Err(e) => break BatchStatus::Failed { cause: e.to_string() },
            }
        };

        BatchOutcome {
            ordinal: batch.ordinal,
            item_ids: batch.item_ids(),
            attempts,
            status,
        }
    }

    /// 序列化、发送、持久化一个批次
    async fn dispatch_once(&self, batch: &Batch) -> AppResult<PathBuf> {
        let payload = batch
            .combined_payload()
            .map_err(|e| AppError::Other(format!("批次 {} 序列化失败: {e}", batch.ordinal)))?;
        info!(
            "[批次 {}] 📤 发送 {} 个条目 ({} 字符)",
            batch.ordinal,
            batch.items.len(),
            payload.chars().count()
        );

        let request = FlowRequest::chat_text(&self.endpoint.component_id, payload);
        let raw_response = self.client.run(&self.endpoint, &request).await?;

        let artifact = BatchArtifact {
            batch_ordinal: batch.ordinal,
            raw_response,
            source_batch_ids: batch.item_ids(),
        };
        self.store.write_batch(&artifact).await
    }
}
