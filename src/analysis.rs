use crate::redact::Redactor;
use crate::shapes::Polygon;
use crate::vision::{AnnotateImageResponse, Color, Emotion, EntityAnnotation, detect_and_redact};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Serialize;
use tracing::{Level, info, span};

/// JSON body returned to the client after analysing a photo. The photo itself
/// only leaves as `processed_image`, with faces blacked out.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageAnalysis {
    pub labels: Vec<EntityAnnotation>,
    pub colors: Vec<Color>,
    pub emotions: Vec<Emotion>,
    pub bounding_polys: BoundingPolys,
    pub label_descriptions: Vec<String>,
    /// Base64 of the redacted image, same format as the upload.
    pub processed_image: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BoundingPolys {
    pub faces: Vec<Polygon>,
    pub labels: Vec<EntityAnnotation>,
    pub text: Vec<EntityAnnotation>,
}

impl ImageAnalysis {
    pub fn build(response: &AnnotateImageResponse, image: &[u8], redactor: &Redactor) -> Self {
        let processed = detect_and_redact(response, redactor, image);
        Self::with_processed(response, &processed)
    }

    /// For callers that already redacted the image. `processed` is encoded
    /// verbatim, so it must be the redacted bytes, never the upload.
    pub fn with_processed(response: &AnnotateImageResponse, processed: &[u8]) -> Self {
        let span = span!(Level::DEBUG, "image_analysis");
        let _guard = span.enter();

        let labels = response.label_annotations.clone();
        let label_descriptions = labels.iter().map(|l| l.description.clone()).collect();
        let emotions = response.emotions();
        let colors = response.dominant_colors();

        info!(
            labels = labels.len(),
            emotions = emotions.len(),
            colors = colors.len(),
            "Image analysis completed"
        );

        Self {
            bounding_polys: BoundingPolys {
                faces: response
                    .face_annotations
                    .iter()
                    .filter_map(|f| f.bounding_poly.clone())
                    .collect(),
                labels: labels
                    .iter()
                    .filter(|l| l.bounding_poly.is_some())
                    .cloned()
                    .collect(),
                text: response.text_annotations.clone(),
            },
            labels,
            colors,
            emotions,
            label_descriptions,
            processed_image: STANDARD.encode(processed),
        }
    }
}
