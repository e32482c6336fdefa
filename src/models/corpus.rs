use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;

/// 排序字段名
pub const ORDERING_FIELD: &str = "id";

/// 语料条目：一个源文档的结构化分析记录
///
/// 由加载器从单个文件创建，加载后不再修改，排序键为 `id`。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorpusItem {
    pub id: i64,
    pub source_path: PathBuf,
    pub payload: Value,
}

impl CorpusItem {
    /// 从已解析的记录创建条目，缺少 `id` 字段时返回 `None`
    pub fn from_record(source_path: PathBuf, payload: Value) -> Option<Self> {
        let id = payload.get(ORDERING_FIELD).and_then(ordering_key)?;
        Some(Self {
            id,
            source_path,
            payload,
        })
    }

    /// 序列化为单行 JSON（保留非 ASCII 字符）
    pub fn payload_line(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.payload)
    }
}

/// 把 `id` 字段解析为整数，兼容整数或纯数字字符串
fn ordering_key(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_record_reads_integer_id() {
        let item = CorpusItem::from_record("a.json".into(), json!({"id": 7, "resumo": "x"})).unwrap();
        assert_eq!(item.id, 7);
    }

    #[test]
    fn test_from_record_accepts_numeric_string_id() {
        let item = CorpusItem::from_record("a.json".into(), json!({"id": " 12 "})).unwrap();
        assert_eq!(item.id, 12);
    }

    #[test]
    fn test_from_record_without_id_is_none() {
        assert!(CorpusItem::from_record("a.json".into(), json!({"titulo": "x"})).is_none());
        assert!(CorpusItem::from_record("a.json".into(), json!({"id": 1.5})).is_none());
        assert!(CorpusItem::from_record("a.json".into(), json!(["id"])).is_none());
    }

    #[test]
    fn test_payload_line_preserves_non_ascii() {
        let item = CorpusItem::from_record("a.json".into(), json!({"id": 1, "título": "governança"})).unwrap();
        let line = item.payload_line().unwrap();
        assert!(line.contains("governança"));
        assert!(!line.contains('\n'));
    }
}
