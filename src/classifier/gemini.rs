use anyhow::{bail, Result};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::sensing::Frame;
use crate::settings::ClassifierSettings;

use super::{parse_classification, ClassificationResult, FrameClassifier};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::log_warn;

const SYSTEM_INSTRUCTION: &str = "You are a strict but friendly homework supervisor.

Classification rules:
- FOCUSED: eyes on the book or notebook, writing, reading.
- DISTRACTED: looking around, playing with toys, lying on the desk asleep, using a phone, daydreaming.
- ABSENT: nobody is in the chair.

Message rules (one short spoken sentence, at most ten words):
- FOCUSED: encourage (e.g. \"Nice posture, keep it up\").
- DISTRACTED: a gentle reminder (e.g. \"Back to your homework, please\").
- ABSENT: ask where they went (e.g. \"Where did you go?\").";

const USER_PROMPT: &str = "Describe the student's state in this picture.";

/// Classifies frames with the Gemini `generateContent` endpoint, asking for a
/// JSON document that matches a fixed response schema.
pub struct GeminiClassifier {
    client: Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
}

impl GeminiClassifier {
    pub fn new(settings: &ClassifierSettings) -> Self {
        Self {
            client: Client::new(),
            endpoint: settings.endpoint.trim_end_matches('/').to_string(),
            model: settings.model.clone(),
            api_key: settings.api_key.clone(),
        }
    }

    fn url(&self) -> String {
        format!("{}/models/{}:generateContent", self.endpoint, self.model)
    }

    async fn request(&self, api_key: &str, body: &Value) -> Result<String, String> {
        let response = self
            .client
            .post(self.url())
            .header("x-goog-api-key", api_key)
            .json(body)
            .send()
            .await
            .map_err(|err| format!("connection error: {err}"))?;

        let status = response.status();
        if !status.is_success() {
            return Err(format!("Gemini error: HTTP {status}"));
        }

        let payload: GenerateContentResponse = response
            .json()
            .await
            .map_err(|err| format!("invalid response body: {err}"))?;

        payload
            .first_text()
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(|| "empty response".to_string())
    }
}

#[async_trait]
impl FrameClassifier for GeminiClassifier {
    async fn classify(&self, frame: &Frame) -> Result<ClassificationResult> {
        let Some(api_key) = self.api_key.as_deref() else {
            bail!("API key is missing; set GEMINI_API_KEY");
        };

        let body = request_body(frame);
        match self.request(api_key, &body).await {
            Ok(text) => Ok(parse_classification(&text)),
            Err(reason) => {
                log_warn!("Frame analysis failed: {reason}");
                Ok(ClassificationResult::error(reason))
            }
        }
    }
}

fn request_body(frame: &Frame) -> Value {
    json!({
        "systemInstruction": {
            "parts": [{ "text": SYSTEM_INSTRUCTION }]
        },
        "contents": [{
            "role": "user",
            "parts": [
                { "text": USER_PROMPT },
                {
                    "inlineData": {
                        "mimeType": frame.mime_type(),
                        "data": STANDARD.encode(frame.bytes()),
                    }
                }
            ]
        }],
        "generationConfig": {
            "responseMimeType": "application/json",
            "responseSchema": {
                "type": "OBJECT",
                "properties": {
                    "status": {
                        "type": "STRING",
                        "enum": ["FOCUSED", "DISTRACTED", "ABSENT"]
                    },
                    "message": {
                        "type": "STRING",
                        "description": "A short spoken prompt for the child, at most ten words"
                    },
                    "confidence": { "type": "NUMBER" }
                },
                "required": ["status", "message", "confidence"]
            }
        }
    })
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

impl GenerateContentResponse {
    fn first_text(self) -> Option<String> {
        self.candidates
            .into_iter()
            .filter_map(|candidate| candidate.content)
            .flat_map(|content| content.parts)
            .find_map(|part| part.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::FocusStatus;

    fn settings(endpoint: &str, api_key: Option<&str>) -> ClassifierSettings {
        ClassifierSettings {
            endpoint: endpoint.to_string(),
            model: "gemini-2.5-flash".into(),
            api_key: api_key.map(str::to_string),
        }
    }

    fn frame() -> Frame {
        Frame::from_bytes(crate::sensing::frame::tests::tiny_png()).unwrap()
    }

    #[test]
    fn request_carries_image_and_schema() {
        let body = request_body(&frame());

        let parts = &body["contents"][0]["parts"];
        assert_eq!(parts[1]["inlineData"]["mimeType"], "image/png");
        assert!(!parts[1]["inlineData"]["data"].as_str().unwrap().is_empty());
        assert_eq!(
            body["generationConfig"]["responseSchema"]["required"],
            json!(["status", "message", "confidence"])
        );
    }

    #[test]
    fn extracts_first_text_part() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [
                { "content": { "parts": [{ "text": "{\"status\":\"ABSENT\"}" }] } }
            ]
        }))
        .unwrap();
        assert_eq!(response.first_text().as_deref(), Some("{\"status\":\"ABSENT\"}"));

        let empty: GenerateContentResponse = serde_json::from_value(json!({})).unwrap();
        assert!(empty.first_text().is_none());
    }

    #[tokio::test]
    async fn missing_api_key_rejects_call() {
        let classifier = GeminiClassifier::new(&settings("http://127.0.0.1:9", None));
        assert!(classifier.classify(&frame()).await.is_err());
    }

    #[tokio::test]
    async fn successful_call_is_parsed() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/models/gemini-2.5-flash:generateContent")
            .match_header("x-goog-api-key", "test-key")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "candidates": [{
                        "content": { "parts": [{
                            "text": "{\"status\":\"DISTRACTED\",\"message\":\"Eyes on the book\",\"confidence\":0.8}"
                        }] }
                    }]
                })
                .to_string(),
            )
            .create_async()
            .await;

        let classifier = GeminiClassifier::new(&settings(&server.url(), Some("test-key")));
        let result = classifier.classify(&frame()).await.unwrap();

        mock.assert_async().await;
        assert_eq!(result.status, FocusStatus::Distracted);
        assert_eq!(result.message, "Eyes on the book");
    }

    #[tokio::test]
    async fn http_failure_becomes_error_result() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/models/gemini-2.5-flash:generateContent")
            .with_status(503)
            .create_async()
            .await;

        let classifier = GeminiClassifier::new(&settings(&server.url(), Some("test-key")));
        let result = classifier.classify(&frame()).await.unwrap();

        assert_eq!(result.status, FocusStatus::Error);
        assert!(result.message.contains("503"));
    }
}
