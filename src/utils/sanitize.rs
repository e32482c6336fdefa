use std::path::Path;

/// 由源文件名生成输出文件名
///
/// 小写，空格替换为下划线，去掉 `[a-z0-9_]` 以外的字符，扩展名固定为 `.json`。
pub fn output_file_name(source: &Path) -> String {
    let stem = source
        .file_stem()
        .unwrap_or_default()
        .to_string_lossy()
        .to_lowercase()
        .replace(' ', "_");

    let cleaned: String = stem
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '_')
        .collect();

    if cleaned.is_empty() {
        "unnamed.json".to_string()
    } else {
        format!("{cleaned}.json")
    }
}
