use std::path::PathBuf;

/// 单条目提取的结果
#[derive(Debug, Clone, PartialEq)]
pub struct ItemOutcome {
    pub source_path: PathBuf,
    /// 成功时为输出文件路径，失败时为原因
    pub result: Result<PathBuf, String>,
}

impl ItemOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// 并发提取运行的汇总
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FanOutReport {
    pub total: usize,
    /// 窗口之间有序，窗口内按完成先后无保证
    pub outcomes: Vec<ItemOutcome>,
}

impl FanOutReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    pub fn outcome_for(&self, source_path: &std::path::Path) -> Option<&ItemOutcome> {
        self.outcomes.iter().find(|o| o.source_path == source_path)
    }
}
