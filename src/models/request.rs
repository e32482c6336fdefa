//! 远程生成服务的请求体

use serde::Serialize;
use serde_json::{json, Map, Value};
use uuid::Uuid;

/// 输入/输出类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IoType {
    Chat,
    Text,
}

/// run 接口的请求体
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlowRequest {
    pub input_value: String,
    pub input_type: IoType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_type: Option<IoType>,
    /// 仅单条目流程携带
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<Uuid>,
    pub tweaks: Map<String, Value>,
}

impl FlowRequest {
    /// 批次/综合请求：文本同时放在根 `input_value` 和组件的 `input_value`
    pub fn chat_text(component_id: &str, text: impl Into<String>) -> Self {
        let text = text.into();
        let mut tweaks = Map::new();
        tweaks.insert(component_id.to_string(), json!({ "input_value": text }));
        Self {
            input_value: text,
            input_type: IoType::Chat,
            output_type: None,
            session_id: None,
            tweaks,
        }
    }

    /// 单条目请求：固定提示词 + 组件的文件 `path`，每次使用新会话
    pub fn file_path(component_id: &str, prompt: &str, path: &str) -> Self {
        let mut tweaks = Map::new();
        tweaks.insert(component_id.to_string(), json!({ "path": path }));
        Self {
            input_value: prompt.to_string(),
            input_type: IoType::Text,
            output_type: Some(IoType::Text),
            session_id: Some(Uuid::new_v4()),
            tweaks,
        }
    }

    pub fn with_output_type(mut self, output_type: IoType) -> Self {
        self.output_type = Some(output_type);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_text_shape() {
        let body = serde_json::to_value(FlowRequest::chat_text("TextInput-1", "linha\n")).unwrap();
        assert_eq!(body["input_value"], "linha\n");
        assert_eq!(body["input_type"], "chat");
        assert_eq!(body["tweaks"]["TextInput-1"]["input_value"], "linha\n");
        assert!(body.get("output_type").is_none());
        assert!(body.get("session_id").is_none());
    }

    #[test]
    fn test_synthesis_adds_chat_output() {
        let body = serde_json::to_value(
            FlowRequest::chat_text("TextInput-1", "x").with_output_type(IoType::Chat),
        )
        .unwrap();
        assert_eq!(body["output_type"], "chat");
    }

    #[test]
    fn test_file_path_shape() {
        let request = FlowRequest::file_path("FileInput-9", "Extract", "/data/a.pdf");
        let other = FlowRequest::file_path("FileInput-9", "Extract", "/data/a.pdf");
        assert_ne!(request.session_id, other.session_id);

        let body = serde_json::to_value(request).unwrap();
        assert_eq!(body["input_type"], "text");
        assert_eq!(body["output_type"], "text");
        assert_eq!(body["tweaks"]["FileInput-9"]["path"], "/data/a.pdf");
        assert!(body["session_id"].is_string());
    }
}
