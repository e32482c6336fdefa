//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责批次划分、调度顺序和失败策略，是整个系统的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `batcher` - 批次划分
//! - 纯函数，把有序条目切成固定大小的批次
//!
//! ### `batch_dispatcher` - 批次调度器
//! - 严格串行，每批一个请求、一个产物
//! - 每次调用前询问 `IntervalScheduler`
//! - 快速失败 / 重试后继续 两种策略
//!
//! ### `fan_out` - 单条目并发提取
//! - 按窗口并发（Semaphore + tokio::spawn），窗口之间等待全部完成
//! - 单个失败不影响其它条目
//!
//! ### `consolidator` - 第二阶段综合
//! - 自然顺序读取批次产物，拼接后发送一次综合请求
//!
//! ### `pipeline` - 应用入口
//! - 从 `Config` 组装以上组件并按运行模式执行
//!
//! ## 层次关系
//!
//! ```text
//! pipeline::App
//!     ↓
//! batch_dispatcher / fan_out / consolidator
//!     ↓
//! services (能力层：extractor / store / journal)
//!     ↓
//! clients::FlowClient + infrastructure::IntervalScheduler
//! ```

pub mod batch_dispatcher;
pub mod batcher;
pub mod consolidator;
pub mod fan_out;
pub mod pipeline;
pub mod progress;

// 重新导出主要类型
pub use batch_dispatcher::BatchDispatcher;
pub use batcher::partition;
pub use consolidator::Consolidator;
pub use fan_out::FanOutPool;
pub use pipeline::{App, RunMode, RunSummary};
pub use progress::{ProgressEvent, ProgressSink};
