use crate::shapes::{Polygon, Rect};
use anyhow::{Context, Result};
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, GenericImageView, ImageFormat, ImageReader, Rgba};
use imageproc::drawing::draw_filled_rect_mut;
use std::borrow::Cow;
use std::io::Cursor;
use tracing::{Level, debug, span, trace, warn};

/// A detected face, in the pixel space of the image it was detected on.
pub type FaceRegion = Polygon;

pub const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);
pub const DEFAULT_JPEG_QUALITY: u8 = 90;

/// Blacks out faces in encoded images.
///
/// Redaction is fail-open: when the image cannot be decoded, drawn on or
/// re-encoded, the original bytes come back untouched and a `privacy` warning
/// is logged. Callers never see an error from here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Redactor {
    fill: Rgba<u8>,
    jpeg_quality: u8,
}

impl Default for Redactor {
    fn default() -> Self {
        Self {
            fill: BLACK,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }
}

impl Redactor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fill is always fully opaque.
    pub fn with_fill(mut self, [r, g, b]: [u8; 3]) -> Self {
        self.fill = Rgba([r, g, b, 255]);
        self
    }

    pub fn with_jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = quality.clamp(1, 100);
        self
    }

    /// Returns `image` with an opaque box over the bounding box of every face.
    ///
    /// With no usable face regions the input is handed back as-is, without a
    /// decode/encode round trip.
    pub fn redact<'a>(&self, image: &'a [u8], faces: &[FaceRegion]) -> Cow<'a, [u8]> {
        let span = span!(Level::DEBUG, "redact", faces = faces.len());
        let _guard = span.enter();

        let boxes = face_boxes(faces);
        if boxes.is_empty() {
            debug!("No face boxes to draw, returning image unchanged");
            return Cow::Borrowed(image);
        }

        match self.try_redact(image, &boxes) {
            Ok(redacted) => {
                debug!(boxes = boxes.len(), "Redacted faces");
                Cow::Owned(redacted)
            }
            Err(e) => {
                warn!(
                    privacy = true,
                    boxes = boxes.len(),
                    "Face redaction failed, passing original image through: {e:#}"
                );
                Cow::Borrowed(image)
            }
        }
    }

    fn try_redact(&self, image: &[u8], boxes: &[Rect]) -> Result<Vec<u8>> {
        let format = image::guess_format(image).context("unrecognised image format")?;
        let mut img = ImageReader::with_format(Cursor::new(image), format)
            .decode()
            .context("failed to decode image")?;
        let (width, height) = img.dimensions();

        for b in boxes {
            match b.on_canvas(width, height) {
                Some(drawable) => {
                    trace!("Filling {drawable:?}");
                    draw_filled_rect_mut(&mut img, drawable, self.fill);
                }
                None => trace!("Face box {b:?} lies outside {width}x{height} image"),
            }
        }

        encode(&img, format, self.jpeg_quality)
    }
}

/// Redacts with the default black fill.
pub fn redact<'a>(image: &'a [u8], faces: &[FaceRegion]) -> Cow<'a, [u8]> {
    Redactor::default().redact(image, faces)
}

/// Like [`redact`], for callers whose detector may not have reported faces at all.
pub fn redact_opt<'a>(image: &'a [u8], faces: Option<&[FaceRegion]>) -> Cow<'a, [u8]> {
    match faces {
        Some(faces) => redact(image, faces),
        None => Cow::Borrowed(image),
    }
}

/// Bounding boxes that will be drawn for `faces`; short polygons are dropped.
pub fn face_boxes(faces: &[FaceRegion]) -> Vec<Rect> {
    faces
        .iter()
        .filter_map(|face| {
            let bounds = face.bounds();
            if bounds.is_none() {
                debug!("Skipping face region with {} vertices", face.len());
            }
            bounds
        })
        .collect()
}

/// Width and height of an encoded image, read from its header.
pub fn dimensions(image: &[u8]) -> Result<(u32, u32)> {
    let dims = ImageReader::new(Cursor::new(image))
        .with_guessed_format()?
        .into_dimensions()?;
    Ok(dims)
}

/// MIME type for the encoded bytes, if the format is recognised.
pub fn mime_type(image: &[u8]) -> Option<&'static str> {
    image::guess_format(image).ok().map(|f| f.to_mime_type())
}

fn encode(img: &DynamicImage, format: ImageFormat, jpeg_quality: u8) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    match format {
        ImageFormat::Jpeg => {
            let encoder = JpegEncoder::new_with_quality(&mut buffer, jpeg_quality);
            img.write_with_encoder(encoder)
                .context("failed to encode jpeg")?;
        }
        _ => img
            .write_to(&mut Cursor::new(&mut buffer), format)
            .with_context(|| format!("failed to encode {format:?}"))?,
    }

    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shapes::Point;
    use image::{GrayImage, Luma, Rgb, RgbImage};

    fn gradient(w: u32, h: u32) -> RgbImage {
        RgbImage::from_fn(w, h, |x, y| Rgb([(x * 2 + 1) as u8, (y * 2 + 1) as u8, 200]))
    }

    fn encoded(img: &DynamicImage, format: ImageFormat) -> Vec<u8> {
        let mut buffer = Vec::new();
        img.write_to(&mut Cursor::new(&mut buffer), format).unwrap();
        buffer
    }

    fn png(w: u32, h: u32) -> Vec<u8> {
        encoded(&DynamicImage::ImageRgb8(gradient(w, h)), ImageFormat::Png)
    }

    fn face(points: &[(i32, i32)]) -> FaceRegion {
        FaceRegion::new(points.iter().copied().map(Point::from).collect())
    }

    fn decode(bytes: &[u8]) -> RgbImage {
        image::load_from_memory(bytes).unwrap().into_rgb8()
    }

    #[test]
    fn test_single_face_scenario() {
        let input = png(100, 100);
        let original = decode(&input);
        let faces = [face(&[(10, 10), (40, 10), (40, 40), (10, 40)])];

        let output = redact(&input, &faces);
        assert_eq!(image::guess_format(&output).unwrap(), ImageFormat::Png);

        let img = decode(&output);
        assert_eq!(img.dimensions(), (100, 100));
        for y in 10..=40 {
            for x in 10..=40 {
                assert_eq!(img.get_pixel(x, y), &Rgb([0, 0, 0]), "pixel ({x}, {y})");
            }
        }
        assert_eq!(img.get_pixel(0, 0), original.get_pixel(0, 0));
        assert_eq!(img.get_pixel(99, 99), original.get_pixel(99, 99));
        assert_eq!(img.get_pixel(41, 41), original.get_pixel(41, 41));
        assert_eq!(img.get_pixel(9, 25), original.get_pixel(9, 25));
    }

    #[test]
    fn test_no_faces_returns_input_bytes() {
        let input = png(100, 100);
        let output = redact(&input, &[]);
        assert!(matches!(output, Cow::Borrowed(_)));
        assert_eq!(&*output, &input[..]);

        assert_eq!(&*redact_opt(&input, None), &input[..]);
    }

    #[test]
    fn test_two_vertex_face_is_skipped() {
        let input = png(100, 100);
        let output = redact(&input, &[face(&[(10, 10), (40, 40)])]);
        assert_eq!(&*output, &input[..]);
    }

    #[test]
    fn test_corrupt_image_passes_through() {
        let input = png(64, 64);
        let truncated = &input[..input.len() / 2];
        let faces = [face(&[(1, 1), (20, 1), (20, 20), (1, 20)])];

        assert_eq!(&*redact(truncated, &faces), truncated);
        assert_eq!(&*redact(b"not an image", &faces), b"not an image");
        assert_eq!(&*redact(&[], &faces), &[] as &[u8]);
    }

    #[test]
    fn test_jpeg_stays_jpeg_with_same_dimensions() {
        let input = encoded(&DynamicImage::ImageRgb8(gradient(80, 60)), ImageFormat::Jpeg);
        let faces = [face(&[(5, 5), (30, 5), (30, 30), (5, 30)])];

        let output = Redactor::new().with_jpeg_quality(95).redact(&input, &faces);
        assert_eq!(image::guess_format(&output).unwrap(), ImageFormat::Jpeg);
        assert_eq!(dimensions(&output).unwrap(), (80, 60));

        // Interior of a large box survives jpeg compression as near-black.
        let img = decode(&output);
        let Rgb([r, g, b]) = *img.get_pixel(17, 17);
        assert!(r < 16 && g < 16 && b < 16, "got {r},{g},{b}");
    }

    #[test]
    fn test_grayscale_keeps_color_type() {
        let gray = GrayImage::from_pixel(20, 20, Luma([180]));
        let input = encoded(&DynamicImage::ImageLuma8(gray), ImageFormat::Png);
        let faces = [face(&[(2, 2), (8, 2), (8, 8), (2, 8)])];

        let output = image::load_from_memory(&redact(&input, &faces)).unwrap();
        assert!(matches!(output, DynamicImage::ImageLuma8(_)));
        let output = output.into_luma8();
        assert_eq!(output.get_pixel(5, 5), &Luma([0]));
        assert_eq!(output.get_pixel(15, 15), &Luma([180]));
    }

    #[test]
    fn test_custom_fill() {
        let input = png(30, 30);
        let faces = [face(&[(0, 0), (9, 0), (9, 9), (0, 9)])];
        let output = Redactor::new().with_fill([255, 0, 255]).redact(&input, &faces);
        assert_eq!(decode(&output).get_pixel(4, 4), &Rgb([255, 0, 255]));
    }

    #[test]
    fn test_face_partly_outside_frame() {
        let input = png(50, 50);
        let original = decode(&input);
        let faces = [face(&[(-10, 40), (70, 40), (70, 80), (-10, 80)])];

        let img = decode(&redact(&input, &faces));
        assert_eq!(img.dimensions(), (50, 50));
        assert_eq!(img.get_pixel(0, 49), &Rgb([0, 0, 0]));
        assert_eq!(img.get_pixel(49, 40), &Rgb([0, 0, 0]));
        assert_eq!(img.get_pixel(25, 39), original.get_pixel(25, 39));
    }

    #[test]
    fn test_face_entirely_outside_frame_keeps_pixels() {
        let input = png(20, 20);
        let faces = [face(&[(30, 30), (40, 30), (40, 40), (30, 40)])];
        let output = redact(&input, &faces);
        assert_eq!(decode(&output), decode(&input));
    }

    #[test]
    fn test_face_boxes_skips_short_regions() {
        let faces = [
            face(&[(0, 0), (5, 0), (5, 5), (0, 5)]),
            FaceRegion::default(),
            face(&[(1, 1)]),
            face(&[(10, 10), (20, 10), (20, 20), (10, 20), (15, 25)]),
        ];
        let boxes = face_boxes(&faces);
        assert_eq!(boxes.len(), 2);
        assert_eq!(boxes[1].bottom, 25);
    }

    #[test]
    fn test_mime_type() {
        assert_eq!(mime_type(&png(4, 4)), Some("image/png"));
        assert_eq!(mime_type(b"garbage"), None);
    }
}
