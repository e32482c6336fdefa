//! 第二阶段综合 - 编排层
//!
//! ## 流程
//!
//! 1. 按自然顺序列出批次产物（`batch2` 在 `batch10` 之前）
//! 2. 只沿文本路径提取每个产物的文本并去除代码围栏
//! 3. 用分隔行拼接所有文本段
//! 4. 发送一次综合请求
//! 5. 用完整回退链提取最终文本并写出文档
//!
//! 单个产物读取/提取失败只跳过该产物；综合请求失败则整个阶段失败。

use crate::clients::FlowClient;
use crate::config::{Config, FlowEndpoint};
use crate::error::{AppError, AppResult, FileError, PipelineError};
use crate::models::document::join_sections;
use crate::models::{ConsolidatedDocument, FlowRequest, IoType, Section};
use crate::orchestrator::progress::{emit, ProgressEvent, ProgressSink};
use crate::services::artifact_store::to_pretty_json;
use crate::services::{strip_code_fences, ArtifactStore, Extracted, FailureJournal, ResponseExtractor};
use crate::utils::logging::truncate_text;
use std::path::Path;
use tracing::{error, info, warn};

/// 第二阶段综合器
pub struct Consolidator {
    client: FlowClient,
    endpoint: FlowEndpoint,
    batch_store: ArtifactStore,
    output_store: ArtifactStore,
    document_name: String,
    journal: FailureJournal,
    progress: Option<ProgressSink>,
    section_extractor: ResponseExtractor,
    final_extractor: ResponseExtractor,
}

impl Consolidator {
    pub fn new(
        client: FlowClient,
        endpoint: FlowEndpoint,
        batch_store: ArtifactStore,
        output_store: ArtifactStore,
        document_name: impl Into<String>,
        journal: FailureJournal,
    ) -> Self {
        Self {
            client,
            endpoint,
            batch_store,
            output_store,
            document_name: document_name.into(),
            journal,
            progress: None,
            section_extractor: ResponseExtractor::text_only(),
            final_extractor: ResponseExtractor::full(),
        }
    }

    /// 读取 `batch.output_dir`，写入 `synthesis.output_dir`
    pub fn from_config(client: FlowClient, config: &Config) -> Self {
        Self::new(
            client,
            config.synthesis.endpoint.clone(),
            ArtifactStore::new(&config.batch.output_dir),
            ArtifactStore::new(&config.synthesis.output_dir),
            &config.synthesis.document_name,
            FailureJournal::with_path(&config.error_log_file),
        )
    }

    pub fn with_progress(mut self, sink: ProgressSink) -> Self {
        self.progress = Some(sink);
        self
    }

    /// 步骤 1-2：读取所有批次产物并提取文本段
    pub async fn collect_sections(&self) -> AppResult<Vec<Section>> {
        let dir = self.batch_store.root().display().to_string();
        let paths = match self.batch_store.list_batches().await {
            Ok(paths) => paths,
            Err(AppError::File(FileError::DirectoryNotFound { .. })) => Vec::new(),
            Err(e) => return Err(e),
        };

        if paths.is_empty() {
            return Err(PipelineError::NoBatchArtifacts { dir }.into());
        }
        info!("📁 找到 {} 个批次产物，开始提取文本", paths.len());

        let total = paths.len();
        let mut sections = Vec::with_capacity(total);
        for (idx, path) in paths.iter().enumerate() {
            let file_name = file_name(path);
            let section = self.read_section(path, &file_name).await;
            emit(
                &self.progress,
                ProgressEvent::ArtifactRead {
                    position: idx + 1,
                    total,
                    file_name,
                    used: section.is_some(),
                },
            );
            sections.extend(section);
        }

        if sections.is_empty() {
            return Err(PipelineError::NothingConsolidated { dir }.into());
        }
        Ok(sections)
    }

    async fn read_section(&self, path: &Path, file_name: &str) -> Option<Section> {
        let response = match ArtifactStore::read_json(path).await {
            Ok(response) => response,
            Err(e) => {
                warn!("[{}] ⚠️ 无法读取产物，已跳过: {}", file_name, e);
                self.journal.note(file_name, &e.to_string()).await;
                return None;
            }
        };

        match self.section_extractor.extract_text(&response) {
            Some(text) if !text.is_empty() => {
                info!("[{}] ✓ 提取文本 {} 字符", file_name, text.chars().count());
                Some(Section {
                    source_file: file_name.to_string(),
                    text,
                })
            }
            _ => {
                warn!("[{}] ⚠️ 未找到文本内容，已跳过", file_name);
                self.journal.note(file_name, "响应中未找到文本内容").await;
                None
            }
        }
    }

    /// 执行完整的第二阶段
    pub async fn run(&self) -> AppResult<ConsolidatedDocument> {
        let sections = self.collect_sections().await?;
        let consolidated_input = join_sections(&sections);
        info!(
            "🧩 已拼接 {} 段，共 {} 字符",
            sections.len(),
            consolidated_input.chars().count()
        );

        emit(
            &self.progress,
            ProgressEvent::SynthesisStarted {
                sections: sections.len(),
            },
        );

        let request = FlowRequest::chat_text(&self.endpoint.component_id, consolidated_input.clone())
            .with_output_type(IoType::Chat);
        let response = match self.client.run(&self.endpoint, &request).await {
            Ok(response) => response,
            Err(e) => {
                error!("❌ 综合请求失败: {}", e);
                self.journal.note("综合请求", &e.to_string()).await;
                return Err(e);
            }
        };

        let final_text = match self.final_extractor.extract(&response) {
            Extracted::Text(text) => strip_code_fences(&text),
            Extracted::Structured(value) => to_pretty_json(&value)?,
            Extracted::Opaque(value) => {
                warn!("⚠️ 无法从综合响应中提取文本，保存原始响应");
                to_pretty_json(&value)?
            }
        };
        info!("📝 最终文本预览: {}", truncate_text(&final_text, 80));

        let output_path = self
            .output_store
            .write_text(&self.document_name, &final_text)
            .await?;
        info!("✅ 最终文档已保存: {}", output_path.display());

        Ok(ConsolidatedDocument {
            sections,
            consolidated_input,
            final_text,
            output_path,
        })
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::document::split_sections;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn text_response(text: &str) -> serde_json::Value {
        json!({"outputs": [{"outputs": [{"results": {"text": {"data": {"text": text}}}}]}]})
    }

    fn consolidator(server: &MockServer, dir: &Path) -> Consolidator {
        let endpoint = FlowEndpoint {
            url: format!("{}/api/v1/run/synthesis", server.uri()),
            component_id: "TextInput-9".to_string(),
            timeout_secs: 10,
        };
        Consolidator::new(
            FlowClient::new(None).unwrap(),
            endpoint,
            ArtifactStore::new(dir.join("phase1")),
            ArtifactStore::new(dir.join("phase2")),
            "final.md",
            FailureJournal::with_path(dir.join("errors.log")),
        )
    }

    fn write_artifact(dir: &Path, name: &str, content: &str) {
        let phase1 = dir.join("phase1");
        std::fs::create_dir_all(&phase1).unwrap();
        std::fs::write(phase1.join(name), content).unwrap();
    }

    #[tokio::test]
    async fn test_sections_follow_natural_order_and_skip_bad_artifacts() {
        let server = MockServer::start().await;
        let temp = tempfile::tempdir().unwrap();
        write_artifact(temp.path(), "batch10.json", &text_response("décimo").to_string());
        write_artifact(temp.path(), "batch2.json", &text_response("```md\nsegundo\n```").to_string());
        write_artifact(temp.path(), "batch1.json", &text_response("primeiro").to_string());
        write_artifact(temp.path(), "batch3.json", "{ quebrado");
        write_artifact(temp.path(), "batch4.json", r#"{"outputs": []}"#);

        let sections = consolidator(&server, temp.path())
            .collect_sections()
            .await
            .unwrap();

        let files: Vec<&str> = sections.iter().map(|s| s.source_file.as_str()).collect();
        assert_eq!(files, vec!["batch1.json", "batch2.json", "batch10.json"]);
        assert_eq!(sections[1].text, "segundo");

        let journal = std::fs::read_to_string(temp.path().join("errors.log")).unwrap();
        assert!(journal.contains("batch3.json"));
        assert!(journal.contains("batch4.json"));
    }

    #[tokio::test]
    async fn test_missing_or_unusable_artifacts() {
        let server = MockServer::start().await;
        let temp = tempfile::tempdir().unwrap();
        let consolidator = consolidator(&server, temp.path());

        assert!(matches!(
            consolidator.collect_sections().await,
            Err(AppError::Pipeline(PipelineError::NoBatchArtifacts { .. }))
        ));

        write_artifact(temp.path(), "batch1.json", r#"{"result": "fora do caminho de texto"}"#);
        assert!(matches!(
            consolidator.collect_sections().await,
            Err(AppError::Pipeline(PipelineError::NothingConsolidated { .. }))
        ));
    }

    #[tokio::test]
    async fn test_run_writes_final_document() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({"input_type": "chat", "output_type": "chat"})))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(text_response("```markdown\n# Síntese\n\ntexto final\n```")),
            )
            .expect(1)
            .mount(&server)
            .await;

        let temp = tempfile::tempdir().unwrap();
        write_artifact(temp.path(), "batch1.json", &text_response("um").to_string());
        write_artifact(temp.path(), "batch2.json", &text_response("dois").to_string());

        let document = consolidator(&server, temp.path()).run().await.unwrap();

        assert_eq!(split_sections(&document.consolidated_input), vec!["um", "dois"]);
        assert_eq!(document.final_text, "# Síntese\n\ntexto final");
        assert_eq!(
            std::fs::read_to_string(&document.output_path).unwrap(),
            "# Síntese\n\ntexto final"
        );
        assert!(document.output_path.ends_with("phase2/final.md"));

        let requests = server.received_requests().await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
        assert_eq!(body["input_value"], document.consolidated_input);
        assert_eq!(body["tweaks"]["TextInput-9"]["input_value"], document.consolidated_input);
    }

    #[tokio::test]
    async fn test_unrecognised_final_response_is_saved_raw() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"session_id": "s1"})))
            .mount(&server)
            .await;

        let temp = tempfile::tempdir().unwrap();
        write_artifact(temp.path(), "batch1.json", &text_response("um").to_string());

        let document = consolidator(&server, temp.path()).run().await.unwrap();
        assert_eq!(document.final_text, "{\n    \"session_id\": \"s1\"\n}");
    }

    #[tokio::test]
    async fn test_synthesis_failure_aborts_phase() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(502).set_body_string("gateway"))
            .mount(&server)
            .await;

        let temp = tempfile::tempdir().unwrap();
        write_artifact(temp.path(), "batch1.json", &text_response("um").to_string());

        let err = consolidator(&server, temp.path()).run().await.unwrap_err();
        assert!(err.is_dispatch_failure());
        assert!(!temp.path().join("phase2").join("final.md").exists());

        let journal = std::fs::read_to_string(temp.path().join("errors.log")).unwrap();
        assert!(journal.contains("综合请求"));
    }
}
