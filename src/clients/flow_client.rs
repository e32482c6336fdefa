/// 远程生成服务客户端
///
/// 封装所有与 flow run 接口相关的 HTTP 调用逻辑
use crate::config::{Config, FlowEndpoint};
use crate::error::{ApiError, AppError, AppResult};
use crate::models::FlowRequest;
use reqwest::{Client, Url};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

/// 连通性探测的超时时间
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// 远程生成服务客户端
#[derive(Clone)]
pub struct FlowClient {
    http: Client,
    api_key: Option<String>,
}

impl FlowClient {
    /// 创建新的客户端；`api_key` 为空时请求不带 `x-api-key`
    pub fn new(api_key: Option<String>) -> AppResult<Self> {
        let http = Client::builder()
            .build()
            .map_err(|e| AppError::Other(format!("无法创建 HTTP 客户端: {e}")))?;
        Ok(Self { http, api_key })
    }

    /// 从配置创建客户端
    pub fn from_config(config: &Config) -> AppResult<Self> {
        Self::new(config.api_key.clone())
    }

    pub fn is_authenticated(&self) -> bool {
        self.api_key.is_some()
    }

    /// 发送一次 run 请求
    ///
    /// # 参数
    /// - `endpoint`: 目标端点（URL 与超时）
    /// - `request`: 请求体
    ///
    /// # 返回
    /// 成功状态且响应体为合法 JSON 时返回完整响应体
    pub async fn run(&self, endpoint: &FlowEndpoint, request: &FlowRequest) -> AppResult<Value> {
        debug!("调用 flow: {}", endpoint.url);
        debug!("输入长度: {} 字符", request.input_value.chars().count());

        let mut builder = self
            .http
            .post(&endpoint.url)
            .timeout(Duration::from_secs(endpoint.timeout_secs))
            .json(request);
        if let Some(key) = &self.api_key {
            builder = builder.header("x-api-key", key);
        }

        let response = builder.send().await.map_err(|e| {
            warn!("flow 调用失败: {}", e);
            AppError::api_request_failed(&endpoint.url, endpoint.timeout_secs, e)
        })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AppError::api_request_failed(&endpoint.url, endpoint.timeout_secs, e))?;

        if !status.is_success() {
            warn!("flow 返回错误状态 {}: {}", status, body);
            return Err(AppError::Api(ApiError::BadStatus {
                endpoint: endpoint.url.clone(),
                status: status.as_u16(),
                body,
            }));
        }

        debug!("flow 调用成功");

        serde_json::from_str(&body).map_err(|source| {
            AppError::Api(ApiError::JsonParseFailed {
                endpoint: endpoint.url.clone(),
                source,
            })
        })
    }

    /// 检查远程服务是否在线：对端点所在主机发一个短超时的 GET
    pub async fn probe(&self, endpoint_url: &str) -> bool {
        let Some(base) = base_url(endpoint_url) else {
            warn!("无法解析端点 URL: {}", endpoint_url);
            return false;
        };

        match self.http.get(base).timeout(PROBE_TIMEOUT).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!("连通性探测失败: {}", e);
                false
            }
        }
    }
}

/// 取端点的 scheme://host[:port]/
fn base_url(endpoint_url: &str) -> Option<Url> {
    let url = Url::parse(endpoint_url).ok()?;
    let mut base = url.clone();
    base.set_path("/");
    base.set_query(None);
    base.set_fragment(None);
    url.host_str()?;
    Some(base)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn endpoint(server: &MockServer, timeout_secs: u64) -> FlowEndpoint {
        FlowEndpoint {
            url: format!("{}/api/v1/run/flow-1", server.uri()),
            component_id: "TextInput-1".to_string(),
            timeout_secs,
        }
    }

    #[tokio::test]
    async fn test_run_sends_api_key_and_returns_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/run/flow-1"))
            .and(header("x-api-key", "sk-test"))
            .and(body_partial_json(json!({"input_type": "chat"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": "ok"})))
            .expect(1)
            .mount(&server)
            .await;

        let client = FlowClient::new(Some("sk-test".to_string())).unwrap();
        let body = client
            .run(&endpoint(&server, 10), &FlowRequest::chat_text("TextInput-1", "x"))
            .await
            .unwrap();
        assert_eq!(body["result"], "ok");
    }

    #[tokio::test]
    async fn test_run_without_key_omits_header() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&server)
            .await;

        let client = FlowClient::new(None).unwrap();
        client
            .run(&endpoint(&server, 10), &FlowRequest::chat_text("TextInput-1", "x"))
            .await
            .unwrap();

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].headers.get("x-api-key").is_none());
    }

    #[tokio::test]
    async fn test_bad_status_keeps_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403).set_body_string("forbidden flow"))
            .mount(&server)
            .await;

        let client = FlowClient::new(None).unwrap();
        let err = client
            .run(&endpoint(&server, 10), &FlowRequest::chat_text("TextInput-1", "x"))
            .await
            .unwrap_err();
        match err {
            AppError::Api(ApiError::BadStatus { status, body, .. }) => {
                assert_eq!(status, 403);
                assert_eq!(body, "forbidden flow");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_non_json_body_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let client = FlowClient::new(None).unwrap();
        let err = client
            .run(&endpoint(&server, 10), &FlowRequest::chat_text("TextInput-1", "x"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Api(ApiError::JsonParseFailed { .. })));
    }

    #[tokio::test]
    async fn test_slow_response_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({}))
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&server)
            .await;

        let client = FlowClient::new(None).unwrap();
        let err = client
            .run(&endpoint(&server, 1), &FlowRequest::chat_text("TextInput-1", "x"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Api(ApiError::Timeout { timeout_secs: 1, .. })));
    }

    #[tokio::test]
    async fn test_connectivity_check_hits_host_root() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let client = FlowClient::new(None).unwrap();
        let url = format!("{}/api/v1/run/flow-1?stream=false", server.uri());
        assert!(client.probe(&url).await);
    }

    #[tokio::test]
    async fn test_connectivity_check_reports_unreachable() {
        let client = FlowClient::new(None).unwrap();
        assert!(!client.probe("not a url").await);
        assert!(!client.probe("http://127.0.0.1:9/api/v1/run/x").await);
    }

    #[test]
    fn test_base_url_strips_path() {
        let base = base_url("http://localhost:7860/api/v1/run/abc?x=1").unwrap();
        assert_eq!(base.as_str(), "http://localhost:7860/");
    }
}
