//! 失败记录服务 - 业务能力层
//!
//! 只负责"把失败写进错误日志文件"能力，不关心流程

use crate::error::{AppError, AppResult};
use std::path::{Path, PathBuf};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

/// 失败记录服务
///
/// 职责：
/// - 每次失败追加一行：时间 | 单元 | 原因
/// - 进程退出后仍可查看
/// - 不关心是批次还是单个文件
#[derive(Debug, Clone)]
pub struct FailureJournal {
    path: PathBuf,
}

impl FailureJournal {
    /// 使用给定文件路径创建
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 追加一条失败记录
    ///
    /// # 参数
    /// - `unit`: 失败单元（如 `批次 3`、文件名）
    /// - `cause`: 失败原因，换行会被压成空格
    pub async fn record(&self, unit: &str, cause: &str) -> AppResult<()> {
        debug!("写入失败记录: {} | {}", unit, cause);

        let line = format!(
            "{} | {} | {}\n",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
            unit,
            cause.replace(['\r', '\n'], " ")
        );

        let path_str = self.path.display().to_string();
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| AppError::file_write_failed(&path_str, e))?;

        file.write_all(line.as_bytes())
            .await
            .map_err(|e| AppError::file_write_failed(&path_str, e))
    }

    /// 追加记录；写入失败只打警告，不影响调用方流程
    pub async fn note(&self, unit: &str, cause: &str) {
        if let Err(e) = self.record(unit, cause).await {
            warn!("⚠️ 无法写入失败记录 {}: {}", self.path.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_record_appends_one_line_per_failure() {
        let temp = tempfile::tempdir().unwrap();
        let journal = FailureJournal::with_path(temp.path().join("errors.log"));

        journal.record("批次 3", "HTTP 500\ncorpo").await.unwrap();
        journal.note("artigo.pdf", "timeout").await;

        let content = std::fs::read_to_string(journal.path()).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("| 批次 3 | HTTP 500 corpo"));
        assert!(lines[1].ends_with("| artigo.pdf | timeout"));
    }

    #[tokio::test]
    async fn test_note_swallows_write_errors() {
        let temp = tempfile::tempdir().unwrap();
        let journal = FailureJournal::with_path(temp.path().join("missing").join("errors.log"));
        journal.note("批次 1", "x").await;
        assert!(journal.record("批次 1", "x").await.is_err());
    }
}
