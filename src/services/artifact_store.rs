//! 产物存储服务 - 业务能力层
//!
//! 只负责"产物文件放在哪里、以什么格式写入"能力，不关心流程
//!
//! 所有 JSON 产物以四空格缩进写出，非 ASCII 字符原样保留。

use crate::error::{AppError, AppResult, FileError};
use crate::models::BatchArtifact;
use crate::utils::natural_sort::sort_paths_naturally;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tokio::fs;
use tracing::debug;

/// 批次产物文件名前缀
pub const BATCH_FILE_PREFIX: &str = "batch";

/// 某个目录下的产物存储
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// 第 `ordinal` 批的产物文件名，如 `batch3.json`
    pub fn batch_file_name(ordinal: usize) -> String {
        format!("{BATCH_FILE_PREFIX}{ordinal}.json")
    }

    pub fn batch_path(&self, ordinal: usize) -> PathBuf {
        self.root.join(Self::batch_file_name(ordinal))
    }

    /// 持久化批次产物（原始响应体），同序号重跑时覆盖
    pub async fn write_batch(&self, artifact: &BatchArtifact) -> AppResult<PathBuf> {
        let path = self.batch_path(artifact.batch_ordinal);
        self.write_pretty(&path, &artifact.raw_response).await?;
        Ok(path)
    }

    /// 列出目录中的批次产物，按自然顺序排列
    pub async fn list_batches(&self) -> AppResult<Vec<PathBuf>> {
        if !self.root.is_dir() {
            return Err(AppError::File(FileError::DirectoryNotFound {
                path: self.root.display().to_string(),
            }));
        }

        let root_str = self.root.display().to_string();
        let mut entries = fs::read_dir(&self.root)
            .await
            .map_err(|e| AppError::file_read_failed(&root_str, e))?;

        let mut batches = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| AppError::file_read_failed(&root_str, e))?
        {
            let path = entry.path();
            let is_batch = path
                .file_name()
                .and_then(|name| name.to_str())
                .is_some_and(is_batch_file_name);
            if is_batch && path.is_file() {
                batches.push(path);
            }
        }

        sort_paths_naturally(&mut batches);
        debug!("找到 {} 个批次产物: {}", batches.len(), root_str);
        Ok(batches)
    }

    /// 读取并解析一个 JSON 产物
    pub async fn read_json(path: &Path) -> AppResult<Value> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| AppError::file_read_failed(path.display().to_string(), e))?;

        serde_json::from_str(&content).map_err(|source| {
            AppError::File(FileError::JsonParseFailed {
                path: path.display().to_string(),
                source,
            })
        })
    }

    /// 以给定文件名写出 JSON 值
    pub async fn write_json<T: Serialize>(&self, file_name: &str, value: &T) -> AppResult<PathBuf> {
        let path = self.root.join(file_name);
        self.write_pretty(&path, value).await?;
        Ok(path)
    }

    /// 以给定文件名写出纯文本（最终文档）
    pub async fn write_text(&self, file_name: &str, text: &str) -> AppResult<PathBuf> {
        let path = self.root.join(file_name);
        self.ensure_root().await?;
        fs::write(&path, text)
            .await
            .map_err(|e| AppError::file_write_failed(path.display().to_string(), e))?;
        Ok(path)
    }

    async fn write_pretty<T: Serialize>(&self, path: &Path, value: &T) -> AppResult<()> {
        let content = to_pretty_json(value)?;
        self.ensure_root().await?;
        fs::write(path, content)
            .await
            .map_err(|e| AppError::file_write_failed(path.display().to_string(), e))
    }

    async fn ensure_root(&self) -> AppResult<()> {
        fs::create_dir_all(&self.root)
            .await
            .map_err(|e| AppError::file_write_failed(self.root.display().to_string(), e))
    }
}

/// 四空格缩进的 JSON
pub fn to_pretty_json<T: Serialize>(value: &T) -> AppResult<String> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value
        .serialize(&mut serializer)
        .map_err(|e| AppError::Other(format!("JSON 序列化失败: {e}")))?;
    String::from_utf8(buf).map_err(|e| AppError::Other(format!("JSON 序列化失败: {e}")))
}

fn is_batch_file_name(name: &str) -> bool {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^batch\d+\.json$").ok())
        .as_ref()
        .is_some_and(|re| re.is_match(name))
}
