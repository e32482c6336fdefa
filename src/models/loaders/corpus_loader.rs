use crate::error::{AppError, AppResult};
use crate::models::corpus::{CorpusItem, ORDERING_FIELD};
use crate::utils::natural_sort::sort_paths_naturally;
use serde_json::Value;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tokio::fs;

/// 加载结果：按 `id` 升序的条目，以及被排除的文件和原因
#[derive(Debug, Default)]
pub struct LoadedCorpus {
    pub items: Vec<CorpusItem>,
    pub rejected: Vec<(PathBuf, String)>,
}

impl LoadedCorpus {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// 读取并解析单个记录文件
pub async fn load_record(path: &Path) -> AppResult<Value> {
    let content = fs::read_to_string(path)
        .await
        .map_err(|e| AppError::file_read_failed(path.display().to_string(), e))?;

    serde_json::from_str(&content).map_err(|source| {
        AppError::File(crate::error::FileError::JsonParseFailed {
            path: path.display().to_string(),
            source,
        })
    })
}

/// 从文件夹中加载所有 JSON 记录并按 `id` 升序排列
///
/// 单个文件读取/解析失败、缺少 `id`、`id` 重复时只记录并排除该文件，不中止。
/// 文件夹不存在、不是目录或无法打开时返回空结果，由调用方视为“无可处理内容”；
/// 遍历中途出错时保留已列出的文件。
pub async fn load_corpus(folder_path: &str) -> LoadedCorpus {
    let folder = PathBuf::from(folder_path);
    let mut loaded = LoadedCorpus::default();

    if !folder.is_dir() {
        tracing::error!("语料文件夹不存在或不是目录: {}", folder_path);
        return loaded;
    }

    let mut entries = match fs::read_dir(&folder).await {
        Ok(entries) => entries,
        Err(e) => {
            tracing::error!("❌ 无法打开语料文件夹 {}: {}", folder_path, e);
            return loaded;
        }
    };

    let mut paths = Vec::new();
    loop {
        let entry = match entries.next_entry().await {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(e) => {
                tracing::error!("❌ 遍历语料文件夹 {} 中断: {}", folder_path, e);
                break;
            }
        };
        let path = entry.path();
        if path.is_file() && path.extension().and_then(|s| s.to_str()) == Some("json") {
            paths.push(path);
        }
    }

    // 目录遍历顺序不稳定，先按文件名排好再处理，保证重复 id 的取舍可复现
    sort_paths_naturally(&mut paths);

    let mut seen_ids = HashSet::new();
    for path in paths {
        let file_name = path.file_name().unwrap_or_default().to_string_lossy().to_string();

        let record = match load_record(&path).await {
            Ok(record) => record,
            Err(e) => {
                tracing::error!("❌ 读取 {} 失败: {}", file_name, e);
                loaded.rejected.push((path, e.to_string()));
                continue;
            }
        };

        let Some(item) = CorpusItem::from_record(path.clone(), record) else {
            tracing::warn!("⚠️ 文件 {} 缺少整数字段 '{}'，已跳过", file_name, ORDERING_FIELD);
            loaded
                .rejected
                .push((path, format!("缺少字段 '{}'", ORDERING_FIELD)));
            continue;
        };

        if !seen_ids.insert(item.id) {
            tracing::warn!("⚠️ 文件 {} 的 id {} 与其他文件重复，已跳过", file_name, item.id);
            loaded.rejected.push((path, format!("重复的 id {}", item.id)));
            continue;
        }

        loaded.items.push(item);
    }

    loaded.items.sort_by_key(|item| item.id);

    tracing::info!(
        "成功加载 {} 个条目，排除 {} 个文件",
        loaded.items.len(),
        loaded.rejected.len()
    );

    loaded
}

/// 列出文件夹中指定扩展名的源文件（按自然顺序）
pub async fn discover_sources(folder_path: &str, extension: &str) -> AppResult<Vec<PathBuf>> {
    let folder = PathBuf::from(folder_path);

    if !folder.exists() {
        return Err(AppError::File(crate::error::FileError::DirectoryNotFound {
            path: folder_path.to_string(),
        }));
    }

    let mut sources = Vec::new();
    let mut entries = fs::read_dir(&folder)
        .await
        .map_err(|e| AppError::file_read_failed(folder_path, e))?;

    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| AppError::file_read_failed(folder_path, e))?
    {
        let path = entry.path();
        let matches = path
            .extension()
            .and_then(|s| s.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case(extension));
        if path.is_file() && matches {
            sources.push(path);
        }
    }

    sort_paths_naturally(&mut sources);
    Ok(sources)
}
