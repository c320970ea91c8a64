//! Face redaction for PicPlate photos.
//!
//! Photos pass through [`redact::Redactor`] before they are attached to a
//! Gemini request ([`gemini`]) or returned to the client ([`analysis`]).
//! Face regions come from Google Vision responses ([`vision`]).

pub mod analysis;
pub mod gemini;
pub mod redact;
pub mod shapes;
pub mod vision;

pub use redact::{FaceRegion, Redactor, redact};
pub use vision::{AnnotateImageResponse, FaceDetector, detect_and_redact};
