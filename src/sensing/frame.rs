use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};

/// Anything smaller is a blank or placeholder capture.
pub const MIN_FRAME_BYTES: usize = 100;

/// One encoded still image. Construction validates the payload so a frame
/// handed to the classifier is never empty or of an unknown format.
#[derive(Debug, Clone)]
pub struct Frame {
    bytes: Arc<Vec<u8>>,
    mime_type: &'static str,
}

impl Frame {
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        if bytes.len() < MIN_FRAME_BYTES {
            bail!(
                "invalid frame: {} bytes is below the {} byte minimum",
                bytes.len(),
                MIN_FRAME_BYTES
            );
        }

        let format = image::guess_format(&bytes).context("invalid frame: unknown image format")?;

        Ok(Self {
            bytes: Arc::new(bytes),
            mime_type: format.to_mime_type(),
        })
    }

    /// Accepts `data:<mime>;base64,<payload>` as produced by browser canvases.
    pub fn from_data_uri(uri: &str) -> Result<Self> {
        let rest = uri
            .strip_prefix("data:")
            .ok_or_else(|| anyhow!("invalid frame: not a data URI"))?;
        let (_, payload) = rest
            .split_once(";base64,")
            .ok_or_else(|| anyhow!("invalid frame: data URI is not base64 encoded"))?;

        let bytes = STANDARD
            .decode(payload.trim())
            .context("invalid frame: bad base64 payload")?;
        Self::from_bytes(bytes)
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn mime_type(&self) -> &'static str {
        self.mime_type
    }
}
