//! 单条目并发提取 - 编排层
//!
//! ## 职责
//!
//! 每个源文件一个请求。源文件按 `concurrency` 分成窗口，窗口内全部并发，
//! 等本窗口所有任务结束后再开始下一个窗口。
//!
//! ## 失败策略
//!
//! 单个文件失败只记录日志和失败记录，不取消同窗口的其它任务，也不影响后续窗口。

use crate::clients::FlowClient;
use crate::config::{Config, FlowEndpoint};
use crate::error::{AppError, AppResult};
use crate::models::{FanOutReport, FlowRequest, ItemOutcome};
use crate::orchestrator::progress::{emit, ProgressEvent, ProgressSink};
use crate::services::{ArtifactStore, FailureJournal, ResponseExtractor};
use crate::utils::{logging, sanitize};
use futures::future::join_all;
use serde_json::{Map, Value};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

/// 记录源文件绝对路径的字段
pub const FILE_SOURCE_KEY: &str = "file_source";

/// 处理单个源文件的能力，在任务之间共享
struct ItemWorker {
    client: FlowClient,
    endpoint: FlowEndpoint,
    prompt: String,
    result_key: String,
    store: ArtifactStore,
    extractor: ResponseExtractor,
}

impl ItemWorker {
    async fn process(&self, source: &Path) -> AppResult<PathBuf> {
        let absolute = std::path::absolute(source)
            .map_err(|e| AppError::file_read_failed(source.display().to_string(), e))?;
        let absolute_str = absolute.display().to_string();

        let request =
            FlowRequest::file_path(&self.endpoint.component_id, &self.prompt, &absolute_str);
        let response = self.client.run(&self.endpoint, &request).await?;

        let extracted = self.extractor.extract(&response);
        if extracted.is_opaque() {
            warn!("[{}] ⚠️ 未识别的响应结构，保存原始响应", display_name(source));
        }

        let mut record = Map::new();
        record.insert(self.result_key.clone(), extracted.into_value());
        record.insert(FILE_SOURCE_KEY.to_string(), Value::String(absolute_str));

        self.store
            .write_json(&sanitize::output_file_name(source), &Value::Object(record))
            .await
    }
}

/// 单条目并发提取池
pub struct FanOutPool {
    worker: Arc<ItemWorker>,
    concurrency: NonZeroUsize,
    journal: FailureJournal,
    progress: Option<ProgressSink>,
}

impl FanOutPool {
    pub fn new(
        client: FlowClient,
        endpoint: FlowEndpoint,
        prompt: impl Into<String>,
        result_key: impl Into<String>,
        store: ArtifactStore,
        concurrency: NonZeroUsize,
        journal: FailureJournal,
    ) -> Self {
        Self {
            worker: Arc::new(ItemWorker {
                client,
                endpoint,
                prompt: prompt.into(),
                result_key: result_key.into(),
                store,
                extractor: ResponseExtractor::full(),
            }),
            concurrency,
            journal,
            progress: None,
        }
    }

    /// 按配置中的 `extraction` 段创建
    pub fn from_config(client: FlowClient, config: &Config) -> AppResult<Self> {
        let extraction = &config.extraction;
        let concurrency = NonZeroUsize::new(extraction.concurrency)
            .ok_or_else(|| AppError::invalid_config("extraction.concurrency", "必须大于 0"))?;

        Ok(Self::new(
            client,
            extraction.endpoint.clone(),
            &extraction.prompt,
            &extraction.result_key,
            ArtifactStore::new(&extraction.output_dir),
            concurrency,
            FailureJournal::with_path(&config.error_log_file),
        ))
    }

    pub fn with_progress(mut self, sink: ProgressSink) -> Self {
        self.progress = Some(sink);
        self
    }

    /// 处理所有源文件
    ///
    /// # 返回
    /// 每个源文件一条结果；窗口之间有序，窗口内按提交顺序收集
    pub async fn run(&self, sources: Vec<PathBuf>) -> AppResult<FanOutReport> {
        let total = sources.len();
        let window_size = self.concurrency.get();
        let total_windows = total.div_ceil(window_size);
        let semaphore = Arc::new(Semaphore::new(window_size));

        let mut report = FanOutReport {
            total,
            ..Default::default()
        };
        let mut completed = 0;

        for (window_idx, window) in sources.chunks(window_size).enumerate() {
            let window_num = window_idx + 1;
            let start = window_idx * window_size;
            logging::log_window_start(
                window_num,
                total_windows,
                start + 1,
                start + window.len(),
                total,
            );

            // 为本窗口创建并发任务
            let mut handles = Vec::with_capacity(window.len());
            for source in window {
                let permit = semaphore
                    .clone()
                    .acquire_owned()
                    .await
                    .map_err(|e| AppError::Other(format!("并发许可获取失败: {e}")))?;

                let worker = Arc::clone(&self.worker);
                let task_source = source.clone();
                let handle = tokio::spawn(async move {
                    let _permit = permit;
                    worker.process(&task_source).await
                });
                handles.push(handle);
            }

            // 等待本窗口所有任务完成
            let joined = join_all(handles).await;
            let mut window_success = 0;
            for (source, joined) in window.iter().zip(joined) {
                let name = display_name(source);
                let result = match joined {
                    Ok(Ok(output)) => Ok(output),
                    Ok(Err(e)) => Err(e.to_string()),
                    Err(e) => Err(format!("任务执行失败: {e}")),
                };

                match &result {
                    Ok(output) => {
                        window_success += 1;
                        info!("[{}] ✅ 已保存: {}", name, output.display());
                    }
                    Err(cause) => {
                        error!("[{}] ❌ 提取失败: {}", name, cause);
                        self.journal.note(&name, cause).await;
                    }
                }

                completed += 1;
                emit(
                    &self.progress,
                    ProgressEvent::ItemFinished {
                        completed,
                        total,
                        source_path: source.clone(),
                        success: result.is_ok(),
                    },
                );
                report.outcomes.push(ItemOutcome {
                    source_path: source.clone(),
                    result,
                });
            }

            logging::log_window_complete(window_num, window_success, window.len());
        }

        Ok(report)
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
