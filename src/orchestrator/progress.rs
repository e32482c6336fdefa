use std::path::PathBuf;
use std::sync::Arc;

/// 进度事件：由外层界面渲染，编排层只负责发出
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    BatchStarted {
        ordinal: usize,
        total: usize,
    },
    BatchFinished {
        ordinal: usize,
        total: usize,
        success: bool,
    },
    ArtifactRead {
        position: usize,
        total: usize,
        file_name: String,
        used: bool,
    },
    SynthesisStarted {
        sections: usize,
    },
    ItemFinished {
        completed: usize,
        total: usize,
        source_path: PathBuf,
        success: bool,
    },
}

/// 进度回调
pub type ProgressSink = Arc<dyn Fn(ProgressEvent) + Send + Sync>;

pub(crate) fn emit(sink: &Option<ProgressSink>, event: ProgressEvent) {
    if let Some(sink) = sink {
        sink(event);
    }
}
