//! 间隔调度器 - 基础设施层
//!
//! 持有“上一次远程调用何时结束”这一时间资源，只暴露“轮到我了吗”的能力

use std::time::Duration;
use tokio::time::Instant;
use tracing::info;

/// 间隔调度器
///
/// 职责：
/// - 保证上一次调用结束后至少间隔 `interval` 才开始下一次调用
/// - 第一次调用不等待；最后一次调用之后也不会产生等待
/// - 不认识批次 / 条目
pub struct IntervalScheduler {
    interval: Duration,
    last_release: Option<Instant>,
    waits: usize,
}

impl IntervalScheduler {
    /// 创建新的间隔调度器
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_release: None,
            waits: 0,
        }
    }

    /// 不限速
    pub fn unlimited() -> Self {
        Self::new(Duration::ZERO)
    }

    /// 发起调用前调用：必要时等待到间隔结束
    pub async fn acquire(&mut self) {
        let Some(last) = self.last_release else {
            return;
        };
        let ready_at = last + self.interval;
        if Instant::now() < ready_at {
            self.waits += 1;
            info!("⏳ 等待 {} 秒后发送下一个请求...", self.interval.as_secs_f32());
            tokio::time::sleep_until(ready_at).await;
        }
    }

    /// 调用结束（无论成败）后调用
    pub fn release(&mut self) {
        self.last_release = Some(Instant::now());
    }

    /// 实际发生过的等待次数
    pub fn waits(&self) -> usize {
        self.waits
    }
}
