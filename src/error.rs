use thiserror::Error;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 远程生成服务调用错误
    #[error("API错误: {0}")]
    Api(#[from] ApiError),
    /// 文件操作错误
    #[error("文件错误: {0}")]
    File(#[from] FileError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
    /// 流水线控制错误
    #[error("流水线错误: {0}")]
    Pipeline(#[from] PipelineError),
    /// 其他错误（用于包装第三方库错误）
    #[error("错误: {0}")]
    Other(String),
}

/// API 调用错误
#[derive(Debug, Error)]
pub enum ApiError {
    /// 网络请求失败
    #[error("API请求失败 ({endpoint}): {source}")]
    RequestFailed {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },
    /// 请求超时
    #[error("API请求超时 ({endpoint}): 超过 {timeout_secs} 秒未响应")]
    Timeout { endpoint: String, timeout_secs: u64 },
    /// API 返回非成功状态码，保留响应体用于诊断
    #[error("API返回错误状态 ({endpoint}): status={status}, body={body}")]
    BadStatus {
        endpoint: String,
        status: u16,
        body: String,
    },
    /// 响应体不是合法 JSON
    #[error("JSON解析失败 ({endpoint}): {source}")]
    JsonParseFailed {
        endpoint: String,
        #[source]
        source: serde_json::Error,
    },
}

/// 文件操作错误
#[derive(Debug, Error)]
pub enum FileError {
    /// 读取文件失败
    #[error("读取文件失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// 写入文件失败
    #[error("写入文件失败 ({path}): {source}")]
    WriteFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// 目录不存在
    #[error("目录不存在: {path}")]
    DirectoryNotFound { path: String },
    /// JSON 解析失败
    #[error("JSON解析失败 ({path}): {source}")]
    JsonParseFailed {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    /// TOML 解析失败
    #[error("TOML解析失败 ({path}): {source}")]
    TomlParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 环境变量解析失败
    #[error("环境变量 {var_name} 解析失败: 值 '{value}' 无法转换为 {expected_type}")]
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: String,
    },
    /// 配置项取值非法
    #[error("配置项 {field} 非法: {reason}")]
    InvalidValue { field: String, reason: String },
}

/// 流水线控制错误
#[derive(Debug, Error)]
pub enum PipelineError {
    /// 批次产物目录中没有 batch 文件
    #[error("没有找到批次产物文件: {dir}")]
    NoBatchArtifacts { dir: String },
    /// 所有批次产物都无法提取文本
    #[error("无法从任何批次产物中提取文本: {dir}")]
    NothingConsolidated { dir: String },
    /// 批次调度在某个序号处中止
    #[error("批次调度在第 {ordinal} 批中止: {cause}")]
    BatchHalted { ordinal: usize, cause: String },
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建API请求失败错误（超时单独归类）
    pub fn api_request_failed(
        endpoint: impl Into<String>,
        timeout_secs: u64,
        source: reqwest::Error,
    ) -> Self {
        let endpoint = endpoint.into();
        if source.is_timeout() {
            AppError::Api(ApiError::Timeout {
                endpoint,
                timeout_secs,
            })
        } else {
            AppError::Api(ApiError::RequestFailed { endpoint, source })
        }
    }

    /// 创建文件读取错误
    pub fn file_read_failed(path: impl Into<String>, source: std::io::Error) -> Self {
        AppError::File(FileError::ReadFailed {
            path: path.into(),
            source,
        })
    }

    /// 创建文件写入错误
    pub fn file_write_failed(path: impl Into<String>, source: std::io::Error) -> Self {
        AppError::File(FileError::WriteFailed {
            path: path.into(),
            source,
        })
    }

    /// 创建配置项非法错误
    pub fn invalid_config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        AppError::Config(ConfigError::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        })
    }

    /// 是否为远程调用类错误（网络、超时、状态码）
    pub fn is_dispatch_failure(&self) -> bool {
        matches!(self, AppError::Api(_))
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
