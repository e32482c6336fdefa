//! 程序配置
//!
//! 配置在一次运行开始时创建一次，之后以引用的形式传入各个入口，不再修改。
//!
//! 加载顺序：内置默认值 → `PIPELINE_CONFIG` 指向的 TOML 文件 → 环境变量覆盖。

use crate::error::{AppError, AppResult, ConfigError, FileError};
use crate::models::FailurePolicy;
use serde::Deserialize;
use std::path::Path;
use std::str::FromStr;

/// 远程生成服务的一个 flow 端点
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct FlowEndpoint {
    /// 完整的 run URL
    pub url: String,
    /// 接收输入的组件 ID（写入请求的 tweaks）
    pub component_id: String,
    /// 单次调用的超时时间（秒）
    pub timeout_secs: u64,
}

impl Default for FlowEndpoint {
    fn default() -> Self {
        Self {
            url: "http://localhost:7860/api/v1/run/batch-analysis".to_string(),
            component_id: "TextInput".to_string(),
            timeout_secs: 600,
        }
    }
}

/// 第一阶段：分批提取
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    pub endpoint: FlowEndpoint,
    /// 语料条目目录（每个条目一个 JSON 文件）
    pub input_dir: String,
    /// 批次产物目录（batch{n}.json）
    pub output_dir: String,
    /// 每批条目数
    pub batch_size: usize,
    /// 相邻两批之间的间隔（秒）
    pub interval_secs: u64,
    /// 批次失败时的处理策略
    pub failure_policy: FailurePolicy,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            endpoint: FlowEndpoint::default(),
            input_dir: "unified".to_string(),
            output_dir: "phase1_batches".to_string(),
            batch_size: 15,
            interval_secs: 3,
            failure_policy: FailurePolicy::FailFast,
        }
    }
}

/// 第二阶段：整体综合
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct SynthesisConfig {
    pub endpoint: FlowEndpoint,
    /// 最终文档目录
    pub output_dir: String,
    /// 最终文档文件名
    pub document_name: String,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            endpoint: FlowEndpoint {
                url: "http://localhost:7860/api/v1/run/final-synthesis".to_string(),
                timeout_secs: 180,
                ..FlowEndpoint::default()
            },
            output_dir: "phase2_output".to_string(),
            document_name: "final_analysis.md".to_string(),
        }
    }
}

/// 单条目并发提取（不分批合并）
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    pub endpoint: FlowEndpoint,
    /// 源文件目录
    pub source_dir: String,
    /// 源文件扩展名（不含点）
    pub source_extension: String,
    /// 输出目录
    pub output_dir: String,
    /// 每个窗口同时处理的条目数
    pub concurrency: usize,
    /// 请求中固定的 input_value
    pub prompt: String,
    /// 输出文件中保存提取内容的字段名
    pub result_key: String,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            endpoint: FlowEndpoint {
                url: "http://localhost:7860/api/v1/run/data-extraction".to_string(),
                component_id: "FileInput".to_string(),
                timeout_secs: 400,
            },
            source_dir: "sources".to_string(),
            source_extension: "pdf".to_string(),
            output_dir: "extraction_output".to_string(),
            concurrency: 3,
            prompt: "Extract the article data".to_string(),
            result_key: "extracted_data".to_string(),
        }
    }
}

/// 程序配置文件
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 远程服务 API 密钥，未配置时请求不带 x-api-key
    pub api_key: Option<String>,
    pub batch: BatchConfig,
    pub synthesis: SynthesisConfig,
    pub extraction: ExtractionConfig,
    /// 失败记录文件（跨进程保留）
    pub error_log_file: String,
    /// 运行日志文件
    pub run_log_file: String,
    /// 是否显示详细日志
    pub verbose_logging: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            batch: BatchConfig::default(),
            synthesis: SynthesisConfig::default(),
            extraction: ExtractionConfig::default(),
            error_log_file: "errors.log".to_string(),
            run_log_file: "run.log".to_string(),
            verbose_logging: false,
        }
    }
}

impl Config {
    /// 按 默认值 → TOML 文件 → 环境变量 的顺序加载配置并校验
    pub fn load() -> AppResult<Self> {
        let Ok(path) = std::env::var("PIPELINE_CONFIG") else {
            return Self::from_env();
        };
        let mut config = Self::from_toml_file(Path::new(&path))?;
        config.apply_overrides(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// 从默认值和环境变量创建配置
    pub fn from_env() -> AppResult<Self> {
        let mut config = Self::default();
        config.apply_overrides(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// 从 TOML 文件加载配置，缺省字段使用默认值
    pub fn from_toml_file(path: &Path) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::file_read_failed(path.display().to_string(), e))?;
        Self::from_toml_str(&content).map_err(|source| {
            AppError::File(FileError::TomlParseFailed {
                path: path.display().to_string(),
                source,
            })
        })
    }

    fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// 用 `lookup` 提供的变量覆盖配置项
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> AppResult<()> {
        if let Some(key) = lookup("FLOW_API_KEY").or_else(|| lookup("LANGFLOW_API_KEY")) {
            if !key.trim().is_empty() {
                self.api_key = Some(key);
            }
        }

        override_string(&lookup, "BATCH_API_URL", &mut self.batch.endpoint.url);
        override_string(&lookup, "BATCH_COMPONENT_ID", &mut self.batch.endpoint.component_id);
        override_string(&lookup, "BATCH_INPUT_DIR", &mut self.batch.input_dir);
        override_string(&lookup, "BATCH_OUTPUT_DIR", &mut self.batch.output_dir);
        override_parsed(&lookup, "BATCH_SIZE", "usize", &mut self.batch.batch_size)?;
        override_parsed(&lookup, "BATCH_INTERVAL_SECS", "u64", &mut self.batch.interval_secs)?;
        override_parsed(
            &lookup,
            "BATCH_TIMEOUT_SECS",
            "u64",
            &mut self.batch.endpoint.timeout_secs,
        )?;
        if let Some(attempts) = parse_var::<u32>(&lookup, "BATCH_MAX_ATTEMPTS", "u32")? {
            self.batch.failure_policy = if attempts <= 1 {
                FailurePolicy::FailFast
            } else {
                FailurePolicy::RetryThenContinue {
                    max_attempts: attempts,
                }
            };
        }

        override_string(&lookup, "SYNTHESIS_API_URL", &mut self.synthesis.endpoint.url);
        override_string(
            &lookup,
            "SYNTHESIS_COMPONENT_ID",
            &mut self.synthesis.endpoint.component_id,
        );
        override_string(&lookup, "SYNTHESIS_OUTPUT_DIR", &mut self.synthesis.output_dir);
        override_string(&lookup, "SYNTHESIS_DOCUMENT_NAME", &mut self.synthesis.document_name);
        override_parsed(
            &lookup,
            "SYNTHESIS_TIMEOUT_SECS",
            "u64",
            &mut self.synthesis.endpoint.timeout_secs,
        )?;

        override_string(&lookup, "EXTRACT_API_URL", &mut self.extraction.endpoint.url);
        override_string(
            &lookup,
            "EXTRACT_COMPONENT_ID",
            &mut self.extraction.endpoint.component_id,
        );
        override_string(&lookup, "EXTRACT_SOURCE_DIR", &mut self.extraction.source_dir);
        override_string(&lookup, "EXTRACT_OUTPUT_DIR", &mut self.extraction.output_dir);
        override_parsed(
            &lookup,
            "EXTRACT_CONCURRENCY",
            "usize",
            &mut self.extraction.concurrency,
        )?;
        override_parsed(
            &lookup,
            "EXTRACT_TIMEOUT_SECS",
            "u64",
            &mut self.extraction.endpoint.timeout_secs,
        )?;

        override_string(&lookup, "ERROR_LOG_FILE", &mut self.error_log_file);
        override_string(&lookup, "RUN_LOG_FILE", &mut self.run_log_file);
        override_parsed(&lookup, "VERBOSE_LOGGING", "bool", &mut self.verbose_logging)?;

        Ok(())
    }

    /// 校验配置项取值
    pub fn validate(&self) -> AppResult<()> {
        if self.batch.batch_size == 0 {
            return Err(AppError::invalid_config("batch.batch_size", "必须大于 0"));
        }
        if self.extraction.concurrency == 0 {
            return Err(AppError::invalid_config("extraction.concurrency", "必须大于 0"));
        }
        if let FailurePolicy::RetryThenContinue { max_attempts: 0 } = self.batch.failure_policy {
            return Err(AppError::invalid_config(
                "batch.failure_policy.max_attempts",
                "必须大于 0",
            ));
        }
        for (field, endpoint) in [
            ("batch.endpoint.url", &self.batch.endpoint),
            ("synthesis.endpoint.url", &self.synthesis.endpoint),
            ("extraction.endpoint.url", &self.extraction.endpoint),
        ] {
            if endpoint.url.trim().is_empty() {
                return Err(AppError::invalid_config(field, "不能为空"));
            }
        }
        Ok(())
    }
}

fn override_string(lookup: &impl Fn(&str) -> Option<String>, name: &str, target: &mut String) {
    if let Some(value) = lookup(name) {
        *target = value;
    }
}

fn override_parsed<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    expected_type: &str,
    target: &mut T,
) -> AppResult<()> {
    if let Some(value) = parse_var(lookup, name, expected_type)? {
        *target = value;
    }
    Ok(())
}

fn parse_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    expected_type: &str,
) -> AppResult<Option<T>> {
    match lookup(name) {
        None => Ok(None),
        Some(raw) => raw.trim().parse::<T>().map(Some).map_err(|_| {
            AppError::Config(ConfigError::EnvVarParseFailed {
                var_name: name.to_string(),
                value: raw,
                expected_type: expected_type.to_string(),
            })
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.batch.batch_size, 15);
        assert_eq!(config.batch.endpoint.timeout_secs, 600);
        assert_eq!(config.synthesis.endpoint.timeout_secs, 180);
        assert_eq!(config.extraction.endpoint.timeout_secs, 400);
        assert!(config.api_key.is_none());
    }

    #[test]
    fn test_overrides_apply() {
        let mut config = Config::default();
        config
            .apply_overrides(lookup_from(&[
                ("LANGFLOW_API_KEY", "sk-test"),
                ("BATCH_SIZE", "3"),
                ("BATCH_MAX_ATTEMPTS", "4"),
                ("EXTRACT_CONCURRENCY", "5"),
            ]))
            .unwrap();
        assert_eq!(config.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.batch.batch_size, 3);
        assert_eq!(
            config.batch.failure_policy,
            FailurePolicy::RetryThenContinue { max_attempts: 4 }
        );
        assert_eq!(config.extraction.concurrency, 5);
    }

    #[test]
    fn test_blank_api_key_is_ignored() {
        let mut config = Config::default();
        config
            .apply_overrides(lookup_from(&[("FLOW_API_KEY", "  ")]))
            .unwrap();
        assert!(config.api_key.is_none());
    }

    #[test]
    fn test_unparsable_number_is_an_error() {
        let mut config = Config::default();
        let err = config
            .apply_overrides(lookup_from(&[("BATCH_SIZE", "fifteen")]))
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::Config(ConfigError::EnvVarParseFailed { .. })
        ));
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        let mut config = Config::default();
        config.batch.batch_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = Config::from_toml_str(
            r#"
            api_key = "sk-file"

            [batch]
            batch_size = 7
            failure_policy = { mode = "retry_then_continue", max_attempts = 2 }

            [synthesis]
            document_name = "synthesis.md"
            "#,
        )
        .unwrap();
        assert_eq!(config.api_key.as_deref(), Some("sk-file"));
        assert_eq!(config.batch.batch_size, 7);
        assert_eq!(config.batch.interval_secs, 3);
        assert_eq!(
            config.batch.failure_policy,
            FailurePolicy::RetryThenContinue { max_attempts: 2 }
        );
        assert_eq!(config.synthesis.document_name, "synthesis.md");
        assert_eq!(config.synthesis.endpoint.timeout_secs, 180);
    }
}
