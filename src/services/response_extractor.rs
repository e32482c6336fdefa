//! 响应提取服务 - 业务能力层
//!
//! 只负责"从形状不固定的响应里找出生成文本"能力，不关心流程
//!
//! 按固定优先级依次尝试一组命名策略，第一个能定位到值的策略胜出；
//! 全部失败时把整个响应原样交回（不报错）。

use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;
use tracing::debug;

/// 一个命名的路径提取策略
#[derive(Clone, Copy)]
pub struct ExtractionStrategy {
    pub name: &'static str,
    pub locate: fn(&Value) -> Option<&Value>,
}

impl ExtractionStrategy {
    /// 路径存在即命中，值为 null 或空字符串也算
    fn resolve<'a>(&self, response: &'a Value) -> Option<&'a Value> {
        (self.locate)(response)
    }
}

/// `outputs[0].outputs[0].results.text.data.text`
pub const TEXT_DATA: ExtractionStrategy = ExtractionStrategy {
    name: "results.text.data.text",
    locate: text_data_path,
};

/// `outputs[0].outputs[0].results.message.text`
pub const MESSAGE_TEXT: ExtractionStrategy = ExtractionStrategy {
    name: "results.message.text",
    locate: message_text_path,
};

/// 顶层 `result`
pub const TOP_LEVEL_RESULT: ExtractionStrategy = ExtractionStrategy {
    name: "result",
    locate: result_field,
};

/// 顶层 `message`
pub const TOP_LEVEL_MESSAGE: ExtractionStrategy = ExtractionStrategy {
    name: "message",
    locate: message_field,
};

fn text_data_path(v: &Value) -> Option<&Value> {
    v.pointer("/outputs/0/outputs/0/results/text/data/text")
}

fn message_text_path(v: &Value) -> Option<&Value> {
    v.pointer("/outputs/0/outputs/0/results/message/text")
}

fn result_field(v: &Value) -> Option<&Value> {
    v.get("result")
}

fn message_field(v: &Value) -> Option<&Value> {
    v.get("message")
}

/// 提取结果
#[derive(Debug, Clone, PartialEq)]
pub enum Extracted {
    /// 能解析为 JSON 对象/数组的内容
    Structured(Value),
    /// 不是结构化数据的原始字符串
    Text(String),
    /// 所有策略都失败时的整个响应：保留数据，但不要当作正文
    Opaque(Value),
}

impl Extracted {
    pub fn is_opaque(&self) -> bool {
        matches!(self, Extracted::Opaque(_))
    }

    /// 转为可写入 JSON 文件的值
    pub fn into_value(self) -> Value {
        match self {
            Extracted::Text(text) => Value::String(text),
            Extracted::Structured(value) | Extracted::Opaque(value) => value,
        }
    }
}

/// 响应提取服务
///
/// 职责：
/// - 持有有序的策略列表
/// - 去除 markdown 代码围栏并尝试解析为 JSON
/// - 只处理单个响应
pub struct ResponseExtractor {
    strategies: Vec<ExtractionStrategy>,
}

impl ResponseExtractor {
    pub fn new(strategies: Vec<ExtractionStrategy>) -> Self {
        Self { strategies }
    }

    /// 完整回退链：两个文本路径 + 顶层 `result` / `message`
    pub fn full() -> Self {
        Self::new(vec![TEXT_DATA, MESSAGE_TEXT, TOP_LEVEL_RESULT, TOP_LEVEL_MESSAGE])
    }

    /// 只看文本路径（第二阶段读取批次产物时使用）
    pub fn text_only() -> Self {
        Self::new(vec![TEXT_DATA, MESSAGE_TEXT])
    }

    fn locate<'a>(&self, response: &'a Value) -> Option<(&'static str, &'a Value)> {
        self.strategies
            .iter()
            .find_map(|strategy| strategy.resolve(response).map(|v| (strategy.name, v)))
    }

    /// 提取响应内容，从不报错
    pub fn extract(&self, response: &Value) -> Extracted {
        let Some((name, value)) = self.locate(response) else {
            debug!("所有提取策略均未命中，返回原始响应");
            return Extracted::Opaque(response.clone());
        };
        debug!("提取策略命中: {}", name);

        let raw = match value {
            Value::String(raw) => raw,
            Value::Object(_) | Value::Array(_) => return Extracted::Structured(value.clone()),
            Value::Null => return Extracted::Text(String::new()),
            scalar => return Extracted::Text(scalar.to_string()),
        };

        let cleaned = strip_code_fences(raw);
        if let Some(parsed) = parse_structured(&cleaned) {
            return Extracted::Structured(parsed);
        }
        if let Some(parsed) = brace_substring(&cleaned).and_then(parse_structured) {
            return Extracted::Structured(parsed);
        }
        Extracted::Text(raw.clone())
    }

    /// 只取字符串文本并去除代码围栏；未命中或命中非字符串时返回 `None`
    pub fn extract_text(&self, response: &Value) -> Option<String> {
        let (name, value) = self.locate(response)?;
        let text = value.as_str()?;
        debug!("文本提取策略命中: {}", name);
        Some(strip_code_fences(text))
    }
}

impl Default for ResponseExtractor {
    fn default() -> Self {
        Self::full()
    }
}

/// 只接受对象和数组，避免把 "42"、"true" 之类的正文误当作数据
fn parse_structured(text: &str) -> Option<Value> {
    serde_json::from_str::<Value>(text)
        .ok()
        .filter(|v| v.is_object() || v.is_array())
}

/// 第一个 `{` 到最后一个 `}` 之间的子串
fn brace_substring(text: &str) -> Option<&str> {
    static BRACES: OnceLock<Option<Regex>> = OnceLock::new();
    BRACES
        .get_or_init(|| Regex::new(r"(?s)\{.*\}").ok())
        .as_ref()?
        .find(text)
        .map(|m| m.as_str())
}

/// 去除 markdown 代码围栏，结果首尾去空白
///
/// 语言标记只在独占一行的围栏上去除（如 ```` ```json ````），
/// 其余位置只删掉 ```` ``` ```` 本身，紧跟其后的文字保留。
/// 幂等：对已去除围栏的字符串再次调用返回原值。
pub fn strip_code_fences(text: &str) -> String {
    static FENCE_LINE: OnceLock<Option<Regex>> = OnceLock::new();
    let fence_line =
        FENCE_LINE.get_or_init(|| Regex::new(r"(?m)```[A-Za-z0-9_+\-]*[ \t]*\r?$\n?").ok());

    let mut cleaned = match fence_line {
        Some(re) => re.replace_all(text, "").into_owned(),
        None => text.to_string(),
    };
    while cleaned.contains("```") {
        cleaned = cleaned.replace("```", "");
    }
    cleaned.trim().to_string()
}
