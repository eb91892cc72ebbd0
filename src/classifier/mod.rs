pub mod gemini;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::sensing::Frame;

pub use gemini::GeminiClassifier;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FocusStatus {
    Focused,
    Distracted,
    Absent,
    Error,
}

impl FocusStatus {
    /// Maps a status label from the remote service. Anything unrecognised is
    /// treated as `Distracted` so a malformed answer still prompts the child.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_uppercase().as_str() {
            "FOCUSED" => FocusStatus::Focused,
            "DISTRACTED" => FocusStatus::Distracted,
            "ABSENT" => FocusStatus::Absent,
            _ => FocusStatus::Distracted,
        }
    }

    /// Distracted or absent: resets the streak and always gets feedback.
    pub fn is_negative(self) -> bool {
        matches!(self, FocusStatus::Distracted | FocusStatus::Absent)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FocusStatus::Focused => "FOCUSED",
            FocusStatus::Distracted => "DISTRACTED",
            FocusStatus::Absent => "ABSENT",
            FocusStatus::Error => "ERROR",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClassificationResult {
    pub status: FocusStatus,
    pub message: String,
    pub confidence: f32,
}

impl ClassificationResult {
    pub fn new(status: FocusStatus, message: impl Into<String>, confidence: f32) -> Self {
        Self {
            status,
            message: message.into(),
            confidence: confidence.clamp(0.0, 1.0),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(FocusStatus::Error, message, 0.0)
    }
}

#[derive(Debug, Deserialize)]
struct RawClassification {
    status: Option<String>,
    message: Option<String>,
    confidence: Option<f32>,
}

/// Parses the JSON document the model returns. Unparsable payloads become an
/// `Error` result; unknown or missing status labels become `Distracted`.
pub fn parse_classification(text: &str) -> ClassificationResult {
    let raw: RawClassification = match serde_json::from_str(text.trim()) {
        Ok(raw) => raw,
        Err(err) => return ClassificationResult::error(format!("unreadable response: {err}")),
    };

    let status = raw
        .status
        .as_deref()
        .map(FocusStatus::from_label)
        .unwrap_or(FocusStatus::Distracted);

    ClassificationResult::new(
        status,
        raw.message.unwrap_or_default(),
        raw.confidence.unwrap_or(0.0),
    )
}

/// Remote frame classification. `Err` means the call was rejected before it
/// was made (bad frame, missing credentials); remote failures come back as
/// an `Error` result.
#[async_trait]
pub trait FrameClassifier: Send + Sync {
    async fn classify(&self, frame: &Frame) -> Result<ClassificationResult>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_response() {
        let result = parse_classification(
            r#"{"status":"FOCUSED","message":"Great posture, keep going","confidence":0.92}"#,
        );
        assert_eq!(result.status, FocusStatus::Focused);
        assert_eq!(result.message, "Great posture, keep going");
        assert!((result.confidence - 0.92).abs() < f32::EPSILON);
    }

    #[test]
    fn unknown_status_is_coerced_to_distracted() {
        let result = parse_classification(r#"{"status":"SLEEPY","message":"wake up","confidence":0.4}"#);
        assert_eq!(result.status, FocusStatus::Distracted);

        let missing = parse_classification(r#"{"message":"?"}"#);
        assert_eq!(missing.status, FocusStatus::Distracted);
    }

    #[test]
    fn status_labels_are_case_insensitive() {
        assert_eq!(FocusStatus::from_label(" absent "), FocusStatus::Absent);
        assert_eq!(FocusStatus::from_label("Focused"), FocusStatus::Focused);
    }

    #[test]
    fn garbage_becomes_error_result() {
        let result = parse_classification("I think the child is focused");
        assert_eq!(result.status, FocusStatus::Error);
        assert_eq!(result.confidence, 0.0);
    }

    #[test]
    fn confidence_is_clamped() {
        let result = parse_classification(r#"{"status":"ABSENT","message":"","confidence":3.5}"#);
        assert_eq!(result.confidence, 1.0);
    }

    #[test]
    fn status_serializes_in_upper_case() {
        let json = serde_json::to_string(&FocusStatus::Distracted).unwrap();
        assert_eq!(json, "\"DISTRACTED\"");
    }
}
