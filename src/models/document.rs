use regex::Regex;
use std::path::PathBuf;
use std::sync::OnceLock;

/// 第二阶段中一个批次产物提取出的文本段
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    /// 来源产物文件名
    pub source_file: String,
    pub text: String,
}

/// 最终综合文档
#[derive(Debug, Clone, PartialEq)]
pub struct ConsolidatedDocument {
    /// 按自然顺序排列的文本段
    pub sections: Vec<Section>,
    /// 提交给综合请求的完整输入
    pub consolidated_input: String,
    pub final_text: String,
    pub output_path: PathBuf,
}

/// 第 `position` 段之前的分隔行
pub fn section_delimiter(position: usize, source_file: &str) -> String {
    format!("\n\n--- DATA SECTION {position} ({source_file}) ---\n\n")
}

/// 用分隔行把各段拼接起来，第一段之前不加分隔
pub fn join_sections(sections: &[Section]) -> String {
    let mut joined = String::new();
    for (idx, section) in sections.iter().enumerate() {
        if idx > 0 {
            joined.push_str(&section_delimiter(idx + 1, &section.source_file));
        }
        joined.push_str(&section.text);
    }
    joined
}

/// `join_sections` 的逆操作，供人工核对
pub fn split_sections(consolidated: &str) -> Vec<&str> {
    static DELIMITER: OnceLock<Option<Regex>> = OnceLock::new();
    let re = DELIMITER
        .get_or_init(|| Regex::new(r"\n\n--- DATA SECTION \d+ \([^)\n]*\) ---\n\n").ok());
    match re {
        Some(re) => re.split(consolidated).collect(),
        None => vec![consolidated],
    }
}
