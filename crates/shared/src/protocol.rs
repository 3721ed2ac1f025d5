use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::AnalysisId;

/// One image's stored analysis: the model's free-text reply plus the
/// structured fields parsed out of it. Owned by the backend; clients only
/// create, read, and delete these.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub id: AnalysisId,
    pub filename: String,
    pub image_base64: String,
    pub analysis: String,
    #[serde(default)]
    pub objects_detected: Vec<String>,
    #[serde(default)]
    pub text_found: String,
    #[serde(default)]
    pub emotions: Vec<String>,
    #[serde(default)]
    pub scene_description: String,
    #[serde(default)]
    pub confidence: String,
    pub timestamp: DateTime<Utc>,
}

impl AnalysisRecord {
    /// The text after `DESCRIPTION:` on the first line carrying that label,
    /// or the full analysis when the model ignored the format.
    pub fn description(&self) -> &str {
        for line in self.analysis.lines() {
            if let Some(rest) = line.trim_start().strip_prefix("DESCRIPTION:") {
                let rest = rest.trim();
                if !rest.is_empty() {
                    return rest;
                }
            }
        }
        self.analysis.trim()
    }

    /// "None detected" is the model's explicit empty answer for text.
    pub fn has_text_found(&self) -> bool {
        let text = self.text_found.trim();
        !text.is_empty() && !text.eq_ignore_ascii_case("none detected")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzeImageRequest {
    pub filename: String,
    pub image_base64: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteAck {
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceStatus {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record_with_analysis(analysis: &str) -> AnalysisRecord {
        AnalysisRecord {
            id: AnalysisId::random(),
            filename: "photo.png".into(),
            image_base64: String::new(),
            analysis: analysis.into(),
            objects_detected: Vec::new(),
            text_found: String::new(),
            emotions: Vec::new(),
            scene_description: String::new(),
            confidence: String::new(),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn description_extracts_labelled_line() {
        let record =
            record_with_analysis("DESCRIPTION: A dog on a beach\nOBJECTS: dog, sand, sea");
        assert_eq!(record.description(), "A dog on a beach");
    }

    #[test]
    fn description_falls_back_to_full_text() {
        let record = record_with_analysis("The model ignored the format entirely.");
        assert_eq!(
            record.description(),
            "The model ignored the format entirely."
        );
    }

    #[test]
    fn none_detected_counts_as_no_text() {
        let mut record = record_with_analysis("DESCRIPTION: x");
        record.text_found = "None detected".into();
        assert!(!record.has_text_found());
        record.text_found = "EXIT 12".into();
        assert!(record.has_text_found());
    }
}
