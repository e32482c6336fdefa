//! 流水线入口 - 编排层
//!
//! ## 职责
//!
//! 1. **应用初始化**：校验配置、创建 HTTP 客户端
//! 2. **运行日志**：写入运行日志文件头、输出启动信息
//! 3. **模式分发**：批次 / 综合 / 完整 / 单条目提取
//! 4. **全局统计**：每个阶段结束后输出汇总
//!
//! 配置在创建时传入，运行期间不再修改。

use crate::clients::FlowClient;
use crate::config::Config;
use crate::error::{AppError, AppResult, PipelineError};
use crate::models::{
    discover_sources, load_corpus, BatchStatus, ConsolidatedDocument, DispatchReport, FanOutReport,
};
use crate::orchestrator::batch_dispatcher::BatchDispatcher;
use crate::orchestrator::batcher::{batch_count, partition};
use crate::orchestrator::consolidator::Consolidator;
use crate::orchestrator::fan_out::FanOutPool;
use crate::orchestrator::progress::ProgressSink;
use crate::services::FailureJournal;
use crate::utils::logging;
use std::fmt;
use std::num::NonZeroUsize;
use std::str::FromStr;
use tracing::{info, warn};

/// 运行模式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// 只跑第一阶段
    Batch,
    /// 只跑第二阶段（读取已有批次产物）
    Consolidate,
    /// 第一阶段完成且未中止时接着跑第二阶段
    Full,
    /// 单条目并发提取
    Extract,
}

impl RunMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunMode::Batch => "batch",
            RunMode::Consolidate => "consolidate",
            RunMode::Full => "full",
            RunMode::Extract => "extract",
        }
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RunMode {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "batch" => Ok(RunMode::Batch),
            "consolidate" => Ok(RunMode::Consolidate),
            "full" => Ok(RunMode::Full),
            "extract" => Ok(RunMode::Extract),
            other => Err(AppError::invalid_config(
                "mode",
                format!("未知的运行模式 '{other}'，可选: batch / consolidate / full / extract"),
            )),
        }
    }
}

/// 一次运行的结果
#[derive(Debug, Default)]
pub struct RunSummary {
    pub dispatch: Option<DispatchReport>,
    pub document: Option<ConsolidatedDocument>,
    pub fan_out: Option<FanOutReport>,
}

/// 应用主结构
pub struct App {
    config: Config,
    client: FlowClient,
    progress: Option<ProgressSink>,
}

impl App {
    /// 初始化应用
    pub fn new(config: Config) -> AppResult<Self> {
        config.validate()?;
        let client = FlowClient::from_config(&config)?;
        Ok(Self {
            config,
            client,
            progress: None,
        })
    }

    pub fn with_progress(mut self, sink: ProgressSink) -> Self {
        self.progress = Some(sink);
        self
    }

    /// 运行应用主逻辑
    pub async fn run(&self, mode: RunMode) -> AppResult<RunSummary> {
        logging::init_log_file(&self.config.run_log_file, mode.as_str())?;
        logging::log_startup(mode.as_str(), self.client.is_authenticated());

        let mut summary = RunSummary::default();
        match mode {
            RunMode::Batch => {
                let report = self.run_batches().await?;
                let halted = halt_error(&report);
                summary.dispatch = Some(report);
                if let Some(err) = halted {
                    return Err(err);
                }
            }
            RunMode::Consolidate => {
                summary.document = Some(self.run_consolidation().await?);
            }
            RunMode::Full => {
                let report = self.run_batches().await?;
                if let Some(err) = halt_error(&report) {
                    warn!("⚠️ 第一阶段未完成，跳过综合");
                    return Err(err);
                }
                let has_batches = report.total_batches > 0;
                summary.dispatch = Some(report);
                if has_batches {
                    summary.document = Some(self.run_consolidation().await?);
                } else {
                    warn!("⚠️ 没有发送任何批次，跳过综合");
                }
            }
            RunMode::Extract => {
                summary.fan_out = Some(self.run_extraction().await?);
            }
        }

        Ok(summary)
    }

    /// 第一阶段：加载、划分、依次调度
    pub async fn run_batches(&self) -> AppResult<DispatchReport> {
        let batch = &self.config.batch;
        self.check_connectivity(&batch.endpoint.url).await;

        info!("\n📁 正在扫描待处理的条目: {}", batch.input_dir);
        let corpus = load_corpus(&batch.input_dir).await;

        let journal = self.journal();
        for (path, reason) in &corpus.rejected {
            journal.note(&path.display().to_string(), reason).await;
        }

        if corpus.is_empty() {
            warn!("⚠️ 没有找到可处理的条目，程序结束");
            return Ok(DispatchReport::default());
        }

        let batch_size = NonZeroUsize::new(batch.batch_size)
            .ok_or_else(|| AppError::invalid_config("batch.batch_size", "必须大于 0"))?;
        logging::log_corpus_loaded(
            corpus.items.len(),
            batch_size.get(),
            batch_count(corpus.items.len(), batch_size),
        );

        let batches = partition(corpus.items, batch_size);
        let mut dispatcher = BatchDispatcher::from_config(self.client.clone(), &self.config);
        if let Some(sink) = &self.progress {
            dispatcher = dispatcher.with_progress(sink.clone());
        }

        let report = dispatcher.run(batches).await;
        logging::print_dispatch_stats(&report, &self.config.run_log_file);
        Ok(report)
    }

    /// 第二阶段：综合所有批次产物
    pub async fn run_consolidation(&self) -> AppResult<ConsolidatedDocument> {
        self.check_connectivity(&self.config.synthesis.endpoint.url)
            .await;

        let mut consolidator = Consolidator::from_config(self.client.clone(), &self.config);
        if let Some(sink) = &self.progress {
            consolidator = consolidator.with_progress(sink.clone());
        }
        consolidator.run().await
    }

    /// 单条目并发提取
    pub async fn run_extraction(&self) -> AppResult<FanOutReport> {
        let extraction = &self.config.extraction;
        self.check_connectivity(&extraction.endpoint.url).await;

        info!("\n📁 正在扫描源文件: {}", extraction.source_dir);
        let sources = discover_sources(&extraction.source_dir, &extraction.source_extension).await?;
        if sources.is_empty() {
            warn!(
                "⚠️ 没有找到 .{} 源文件，程序结束",
                extraction.source_extension
            );
            return Ok(FanOutReport::default());
        }
        info!(
            "✓ 找到 {} 个源文件，并发数 {}",
            sources.len(),
            extraction.concurrency
        );

        let mut pool = FanOutPool::from_config(self.client.clone(), &self.config)?;
        if let Some(sink) = &self.progress {
            pool = pool.with_progress(sink.clone());
        }

        let report = pool.run(sources).await?;
        logging::print_fan_out_stats(&report, &self.config.run_log_file);
        Ok(report)
    }

    /// 探测失败只警告，真正的失败由之后的请求报告
    async fn check_connectivity(&self, endpoint_url: &str) {
        if self.client.probe(endpoint_url).await {
            info!("🔗 远程服务在线: {}", endpoint_url);
        } else {
            warn!("⚠️ 无法连接远程服务: {}", endpoint_url);
        }
    }

    fn journal(&self) -> FailureJournal {
        FailureJournal::with_path(&self.config.error_log_file)
    }
}

/// 快速失败中止时转换为错误，携带序号和原因
fn halt_error(report: &DispatchReport) -> Option<AppError> {
    let ordinal = report.halted_at?;
    let cause = report
        .outcomes
        .iter()
        .find(|o| o.ordinal == ordinal)
        .and_then(|o| match &o.status {
            BatchStatus::Failed { cause } => Some(cause.clone()),
            BatchStatus::Succeeded { .. } => None,
        })
        .unwrap_or_default();
    Some(PipelineError::BatchHalted { ordinal, cause }.into())
}
