//! Gemini `generateContent` request bodies with an optional redacted photo.
//!
//! Prompt text is supplied by the caller; this module only decides which
//! image bytes are allowed to ride along with it.

use crate::redact::{self, Redactor};
use crate::vision::{FaceDetector, detect_and_redact};
use anyhow::{Context, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Serialize;
use tracing::{Level, debug, span, warn};

/// Used when the image bytes don't reveal their format.
pub const FALLBACK_MIME_TYPE: &str = "image/jpeg";

pub const RECIPE_TEMPERATURE: f32 = 1.0;
pub const RECIPE_MAX_TOKENS: u32 = 2048;
pub const RESTAURANT_TEMPERATURE: f32 = 0.2;
pub const RESTAURANT_MAX_TOKENS: u32 = 512;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    pub generation_config: GenerationConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Content {
    pub role: String,
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Part {
    Text { text: String },
    InlineData { inline_data: InlineData },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InlineData {
    /// Base64, standard alphabet.
    pub data: String,
    #[serde(rename = "mimeType")]
    pub mime_type: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub temperature: f32,
    pub max_output_tokens: u32,
}

/// The photo a client attached to a generation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageInput<'a> {
    /// Base64 image that already went through redaction (the analysis
    /// response's `processedImage`); forwarded as-is.
    Processed(&'a str),
    /// Base64 image straight from the photo library; must be redacted first.
    Raw(&'a str),
}

impl<'a> ImageInput<'a> {
    /// A processed image wins over a raw one when a client sends both.
    pub fn from_request(processed: Option<&'a str>, raw: Option<&'a str>) -> Option<Self> {
        match (processed, raw) {
            (Some(p), _) if !p.is_empty() => Some(ImageInput::Processed(p)),
            (_, Some(r)) if !r.is_empty() => Some(ImageInput::Raw(r)),
            _ => None,
        }
    }
}

impl Part {
    pub fn text(text: impl Into<String>) -> Part {
        Part::Text { text: text.into() }
    }

    pub fn inline_data(bytes: &[u8]) -> Part {
        Part::InlineData {
            inline_data: InlineData {
                data: STANDARD.encode(bytes),
                mime_type: mime_type_or_fallback(bytes).to_string(),
            },
        }
    }

    /// Builds the image part for `input`, redacting raw images with
    /// `detector` first. Returns `None` when the image can't be used, in
    /// which case the request goes out text-only.
    pub fn image(
        input: ImageInput,
        detector: &impl FaceDetector,
        redactor: &Redactor,
    ) -> Option<Part> {
        let span = span!(Level::DEBUG, "image_part");
        let _guard = span.enter();

        match image_part(input, detector, redactor) {
            Ok(part) => Some(part),
            Err(e) => {
                warn!("Continuing without image: {e:#}");
                None
            }
        }
    }
}

fn image_part(
    input: ImageInput,
    detector: &impl FaceDetector,
    redactor: &Redactor,
) -> Result<Part> {
    match input {
        ImageInput::Processed(data) => {
            debug!("Using pre-processed image");
            let mime_type = match STANDARD.decode(data) {
                Ok(bytes) => mime_type_or_fallback(&bytes),
                Err(_) => FALLBACK_MIME_TYPE,
            };
            Ok(Part::InlineData {
                inline_data: InlineData {
                    data: data.to_string(),
                    mime_type: mime_type.to_string(),
                },
            })
        }
        ImageInput::Raw(data) => {
            let bytes = STANDARD
                .decode(data)
                .context("image is not valid base64")?;
            let redacted = detect_and_redact(detector, redactor, &bytes);
            debug!("Using redacted image");
            Ok(Part::inline_data(&redacted))
        }
    }
}

fn mime_type_or_fallback(bytes: &[u8]) -> &'static str {
    redact::mime_type(bytes).unwrap_or(FALLBACK_MIME_TYPE)
}

impl GenerateContentRequest {
    pub fn new(prompt: impl Into<String>, generation_config: GenerationConfig) -> Self {
        Self {
            contents: vec![Content {
                role: "user".to_string(),
                parts: vec![Part::text(prompt)],
            }],
            generation_config,
        }
    }

    pub fn recipe(prompt: impl Into<String>, temperature: Option<f32>) -> Self {
        Self::new(
            prompt,
            GenerationConfig {
                temperature: temperature.unwrap_or(RECIPE_TEMPERATURE),
                max_output_tokens: RECIPE_MAX_TOKENS,
            },
        )
    }

    pub fn restaurants(prompt: impl Into<String>) -> Self {
        Self::new(
            prompt,
            GenerationConfig {
                temperature: RESTAURANT_TEMPERATURE,
                max_output_tokens: RESTAURANT_MAX_TOKENS,
            },
        )
    }

    /// Appends the client's photo, if any and if usable, after the prompt.
    pub fn with_image(
        self,
        input: Option<ImageInput>,
        detector: &impl FaceDetector,
        redactor: &Redactor,
    ) -> Self {
        match input.and_then(|input| Part::image(input, detector, redactor)) {
            Some(part) => self.with_part(part),
            None => self,
        }
    }

    /// Appends `part` to the user turn.
    pub fn with_part(mut self, part: Part) -> Self {
        if let Some(content) = self.contents.first_mut() {
            content.parts.push(part);
        }
        self
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
