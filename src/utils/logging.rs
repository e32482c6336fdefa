/// 日志工具模块
///
/// 提供订阅器初始化以及各阶段日志格式化的辅助函数
use crate::error::{AppError, AppResult};
use crate::models::{DispatchReport, FanOutReport};
use std::fs;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// 初始化全局日志订阅器
///
/// `RUST_LOG` 优先；否则默认 `info`，详细模式下为 `debug`。重复调用无副作用。
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 初始化运行日志文件
///
/// # 参数
/// - `log_file_path`: 日志文件路径
/// - `mode`: 运行模式
pub fn init_log_file(log_file_path: &str, mode: &str) -> AppResult<()> {
    let log_header = format!(
        "{}\n流水线运行日志 ({}) - {}\n{}\n\n",
        "=".repeat(60),
        mode,
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        "=".repeat(60)
    );
    fs::write(log_file_path, log_header)
        .map_err(|e| AppError::file_write_failed(log_file_path, e))
}

/// 记录程序启动信息
pub fn log_startup(mode: &str, authenticated: bool) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 模式: {}", mode);
    info!("🔑 API 密钥: {}", if authenticated { "已配置" } else { "未配置" });
    info!("{}", "=".repeat(60));
}

/// 记录语料加载信息
///
/// # 参数
/// - `total`: 条目总数
/// - `batch_size`: 每批条目数
/// - `total_batches`: 批次总数
pub fn log_corpus_loaded(total: usize, batch_size: usize, total_batches: usize) {
    info!("✓ 找到 {} 个待处理的条目", total);
    info!("📋 将以每批 {} 个的方式分为 {} 批", batch_size, total_batches);
    info!("💡 批次依次发送，每批之间保持固定间隔\n");
}

/// 记录批次开始信息
pub fn log_batch_start(ordinal: usize, total_batches: usize, ids: &[i64]) {
    info!("\n{}", "=".repeat(60));
    info!("📦 开始处理第 {}/{} 批", ordinal, total_batches);
    info!("📄 本批条目 ID: {:?}", ids);
    info!("{}", "=".repeat(60));
}

/// 记录并发窗口开始信息
pub fn log_window_start(window: usize, total_windows: usize, start: usize, end: usize, total: usize) {
    info!("\n{}", "=".repeat(60));
    info!("📦 开始处理第 {}/{} 个窗口", window, total_windows);
    info!("📄 本窗口文件: {}-{} / 共 {} 个", start, end, total);
    info!("{}", "=".repeat(60));
}

/// 记录窗口完成信息
pub fn log_window_complete(window: usize, success: usize, total: usize) {
    info!("\n{}", "─".repeat(60));
    info!("✓ 第 {} 个窗口完成: 成功 {}/{}", window, success, total);
    info!("{}", "─".repeat(60));
}

/// 打印批次调度的最终统计
pub fn print_dispatch_stats(report: &DispatchReport, log_file_path: &str) {
    info!("\n{}", "=".repeat(60));
    info!("📊 批次调度统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 成功: {}/{}", report.succeeded(), report.total_batches);
    info!("❌ 失败: {}", report.failed());
    if let Some(ordinal) = report.halted_at {
        info!(
            "⚠️ 在第 {} 批中止，第 {}..{} 批未发送",
            ordinal,
            ordinal + 1,
            report.total_batches
        );
    }
    info!("{}", "=".repeat(60));
    info!("\n日志已保存至: {}", log_file_path);
}

/// 打印并发提取的最终统计
pub fn print_fan_out_stats(report: &FanOutReport, log_file_path: &str) {
    info!("\n{}", "=".repeat(60));
    info!("📊 并发提取统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 成功: {}/{}", report.succeeded(), report.total);
    info!("❌ 失败: {}", report.failed());
    info!("{}", "=".repeat(60));
    info!("\n日志已保存至: {}", log_file_path);
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
