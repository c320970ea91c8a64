//! Typed view of the Google Vision `AnnotateImageResponse` fields PicPlate reads.
//!
//! Vision responses are loosely shaped: any field may be missing. Everything
//! here defaults instead of failing, so a partial response still yields
//! whatever faces it does describe.

use crate::redact::{FaceRegion, Redactor};
use crate::shapes::Polygon;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::path::Path;
use tracing::{Level, debug, span, warn};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnnotateImageResponse {
    pub face_annotations: Vec<FaceAnnotation>,
    pub label_annotations: Vec<EntityAnnotation>,
    pub text_annotations: Vec<EntityAnnotation>,
    pub image_properties_annotation: Option<ImageProperties>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FaceAnnotation {
    pub bounding_poly: Option<Polygon>,
    pub joy_likelihood: Likelihood,
    pub sorrow_likelihood: Likelihood,
    pub anger_likelihood: Likelihood,
    pub surprise_likelihood: Likelihood,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EntityAnnotation {
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bounding_poly: Option<Polygon>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ImageProperties {
    pub dominant_colors: DominantColors,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DominantColors {
    pub colors: Vec<ColorInfo>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ColorInfo {
    pub color: Color,
}

/// Vision reports channels as floats in `0..=255`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Color {
    pub red: f32,
    pub green: f32,
    pub blue: f32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Likelihood {
    #[default]
    Unknown,
    VeryUnlikely,
    Unlikely,
    Possible,
    Likely,
    VeryLikely,
    /// Any rating this crate doesn't know, e.g. `LIKELIHOOD_UNSPECIFIED`.
    #[serde(other)]
    Unspecified,
}

impl Likelihood {
    pub fn at_least_possible(self) -> bool {
        matches!(
            self,
            Likelihood::Possible | Likelihood::Likely | Likelihood::VeryLikely
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Emotion {
    Joy,
    Sorrow,
    Anger,
    Surprise,
}

impl FaceAnnotation {
    pub fn region(&self) -> FaceRegion {
        self.bounding_poly.clone().unwrap_or_default()
    }

    /// Emotions rated at least `POSSIBLE`, in joy/sorrow/anger/surprise order.
    pub fn emotions(&self) -> Vec<Emotion> {
        [
            (Emotion::Joy, self.joy_likelihood),
            (Emotion::Sorrow, self.sorrow_likelihood),
            (Emotion::Anger, self.anger_likelihood),
            (Emotion::Surprise, self.surprise_likelihood),
        ]
        .into_iter()
        .filter(|(_, l)| l.at_least_possible())
        .map(|(e, _)| e)
        .collect()
    }
}

impl AnnotateImageResponse {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("failed to parse Vision response")
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_json(&json)
    }

    /// One region per face annotation. Annotations without a bounding poly
    /// become empty regions, which redaction skips.
    pub fn face_regions(&self) -> Vec<FaceRegion> {
        self.face_annotations.iter().map(FaceAnnotation::region).collect()
    }

    pub fn emotions(&self) -> Vec<Emotion> {
        self.face_annotations
            .iter()
            .flat_map(FaceAnnotation::emotions)
            .collect()
    }

    pub fn dominant_colors(&self) -> Vec<Color> {
        self.image_properties_annotation
            .iter()
            .flat_map(|p| p.dominant_colors.colors.iter().map(|c| c.color))
            .collect()
    }
}

/// Anything that can find faces in an encoded image.
pub trait FaceDetector {
    fn detect(&self, image: &[u8]) -> Result<Vec<FaceRegion>>;
}

/// A response fetched ahead of time already describes the image it came from.
impl FaceDetector for AnnotateImageResponse {
    fn detect(&self, _image: &[u8]) -> Result<Vec<FaceRegion>> {
        Ok(self.face_regions())
    }
}

/// No detector configured: every image has zero faces.
///
/// Images pass through unredacted, so any face in them leaves as-is. Only use
/// this where the caller has decided that sending an unchecked photo is
/// acceptable, e.g. when the photo is already redacted.
impl FaceDetector for () {
    fn detect(&self, _image: &[u8]) -> Result<Vec<FaceRegion>> {
        Ok(Vec::new())
    }
}

impl<D: FaceDetector + ?Sized> FaceDetector for &D {
    fn detect(&self, image: &[u8]) -> Result<Vec<FaceRegion>> {
        (**self).detect(image)
    }
}

/// Runs `detector` then `redactor` on `image`. A failed detection counts as
/// zero faces, so the image comes back unchanged.
pub fn detect_and_redact<'a>(
    detector: &impl FaceDetector,
    redactor: &Redactor,
    image: &'a [u8],
) -> Cow<'a, [u8]> {
    let span = span!(Level::DEBUG, "detect_and_redact");
    let _guard = span.enter();

    let faces = match detector.detect(image) {
        Ok(faces) => faces,
        Err(e) => {
            warn!(privacy = true, "Face detection unavailable, treating as no faces: {e:#}");
            Vec::new()
        }
    };
    debug!("Detected {} faces", faces.len());

    redactor.redact(image, &faces)
}
