//! # Corpus Batch Synthesis
//!
//! 把一批结构化分析记录分批送往远程生成服务，再把各批结果综合成一份最终文档
//!
//! ## 架构设计
//!
//! 本系统采用分层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有时间资源，只暴露能力
//! - `IntervalScheduler` - 两次远程调用之间的最小间隔
//!
//! ### ② 客户端（Clients）
//! - `FlowClient` - 唯一与远程服务通信的代码（请求体、`x-api-key`、超时、连通性探测）
//!
//! ### ③ 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，只处理单个响应 / 单个文件
//! - `ResponseExtractor` - 按策略列表提取生成文本
//! - `ArtifactStore` - 产物文件的位置和格式
//! - `FailureJournal` - 写错误日志能力
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/batch_dispatcher` - 批次串行调度（快速失败）
//! - `orchestrator/fan_out` - 单条目窗口并发（隔离失败）
//! - `orchestrator/consolidator` - 第二阶段综合
//! - `orchestrator/pipeline` - 按运行模式组装以上组件
//!
//! ## 模块结构

pub mod clients;
pub mod config;
pub mod error;
pub mod infrastructure;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;

// 重新导出常用类型
pub use clients::FlowClient;
pub use config::Config;
pub use error::{AppError, AppResult};
pub use infrastructure::IntervalScheduler;
pub use models::{CorpusItem, DispatchReport, FailurePolicy, FanOutReport};
pub use orchestrator::{App, RunMode, RunSummary};
