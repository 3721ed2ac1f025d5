//! Backend commands queued from UI to backend worker.

use shared::protocol::AnalysisRecord;
use std::path::PathBuf;

pub enum BackendCommand {
    CheckService,
    AnalyzeImage { path: PathBuf },
    RefreshHistory,
    ViewAnalysis { id: String },
    DeleteAnalysis { id: String },
}

pub enum UiEvent {
    Info(String),
    AnalysisComplete(AnalysisRecord),
    AnalysisLoaded(AnalysisRecord),
    AnalysisDeleted { id: String, message: String },
    HistoryLoaded(Vec<AnalysisRecord>),
    Error(String),
}
