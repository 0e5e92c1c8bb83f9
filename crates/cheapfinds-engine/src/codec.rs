use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use cheapfinds_contracts::search::ImageBlob;
use cheapfinds_contracts::PipelineError;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use serde::Serialize;

const JPEG_QUALITY: u8 = 90;

/// An image ready to be inlined into a provider request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineImage {
    pub mime_type: String,
    /// Standard base64 of the (possibly re-encoded) image bytes.
    pub data: String,
}

pub fn encode_image(blob: &ImageBlob, max_dim: Option<u32>) -> Result<InlineImage, PipelineError> {
    if blob.bytes.is_empty() {
        return Err(PipelineError::encoding(&blob.name, "image is empty"));
    }
    let sniffed = image::guess_format(&blob.bytes).ok();
    let mime_type = sniffed
        .map(|format| format.to_mime_type().to_string())
        .or_else(|| declared_image_mime(blob))
        .ok_or_else(|| PipelineError::encoding(&blob.name, "unrecognised image data"))?;

    if let (Some(dim), Some(format)) = (max_dim, sniffed) {
        if let Some(bytes) = downscale(blob, format, dim)? {
            return Ok(InlineImage {
                mime_type: "image/jpeg".to_string(),
                data: BASE64.encode(bytes),
            });
        }
    }

    Ok(InlineImage {
        mime_type,
        data: BASE64.encode(&blob.bytes),
    })
}

fn declared_image_mime(blob: &ImageBlob) -> Option<String> {
    blob.mime_type
        .as_deref()
        .map(str::trim)
        .filter(|mime| mime.starts_with("image/"))
        .map(str::to_string)
}

/// Re-encodes as JPEG when the image is larger than `dim` on either edge.
/// Returns `None` when it already fits.
fn downscale(
    blob: &ImageBlob,
    format: ImageFormat,
    dim: u32,
) -> Result<Option<Vec<u8>>, PipelineError> {
    let decoded = image::load_from_memory_with_format(&blob.bytes, format)
        .map_err(|err| PipelineError::encoding(&blob.name, err.to_string()))?;
    if decoded.width() <= dim && decoded.height() <= dim {
        return Ok(None);
    }
    let flattened = flatten_on_white(decoded.to_rgba8());
    let resized = DynamicImage::ImageRgba8(flattened)
        .resize(dim, dim, FilterType::Triangle)
        .to_rgb8();

    let mut bytes = Vec::new();
    DynamicImage::ImageRgb8(resized)
        .write_with_encoder(JpegEncoder::new_with_quality(&mut bytes, JPEG_QUALITY))
        .map_err(|err| PipelineError::encoding(&blob.name, err.to_string()))?;
    tracing::debug!(image = %blob.name, max_dim = dim, "downscaled image before upload");
    Ok(Some(bytes))
}

fn flatten_on_white(rgba: RgbaImage) -> RgbaImage {
    let mut flattened = RgbaImage::new(rgba.width(), rgba.height());
    for (x, y, pixel) in rgba.enumerate_pixels() {
        let alpha = u16::from(pixel[3]);
        let blend =
            |channel: u8| (((u16::from(channel) * alpha) + (255 * (255 - alpha))) / 255) as u8;
        flattened.put_pixel(
            x,
            y,
            Rgba([blend(pixel[0]), blend(pixel[1]), blend(pixel[2]), 255]),
        );
    }
    flattened
}
