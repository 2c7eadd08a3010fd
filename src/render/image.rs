//! Image results.

use super::{
    decode_media, facts, panel, steps_list, variant_item, variants_container, MediaBlob,
    RenderError, Rendered,
};
use crate::api::response::{ImageAugmented, ImageOriginal, ImagePreprocessed};
use crate::api::EncodedMedia;

/// Sniff the image MIME type from magic bytes, defaulting to PNG.
pub fn sniff_mime(bytes: &[u8]) -> &'static str {
    infer::get(bytes)
        .filter(|kind| kind.matcher_type() == infer::MatcherType::Image)
        .map(|kind| kind.mime_type())
        .unwrap_or("image/png")
}

fn image_blob(media: &EncodedMedia, label: &str) -> Result<MediaBlob, RenderError> {
    let bytes = decode_media(media, label)?;
    let mime = sniff_mime(&bytes);
    Ok(MediaBlob::new(label, mime, bytes))
}

fn img_tag(blob: &MediaBlob, alt: &str) -> String {
    format!(
        "<img class=\"img-fluid\" src=\"{}\" alt=\"{}\">",
        blob.placeholder(),
        super::escape_html(alt)
    )
}

pub fn original(result: &ImageOriginal) -> Result<Rendered, RenderError> {
    let blob = image_blob(&result.data, "original image")?;
    let mut rows = Vec::new();
    if let Some(format) = &result.validation.format {
        rows.push(("Format", format.clone()));
    }
    if let Some(size) = result.validation.size {
        rows.push(("Size", size.to_string()));
    }
    let body = format!("{}{}", img_tag(&blob, "Original image"), facts(&rows));
    Ok(Rendered::new(panel("image", "Original Image", result.source, &body)).with_blobs(vec![blob]))
}

pub fn preprocessed(result: &ImagePreprocessed) -> Result<Rendered, RenderError> {
    let blob = image_blob(&result.data, "processed image")?;
    let rows = [
        ("Original size", result.original_size.to_string()),
        ("Processed size", result.processed_size.to_string()),
    ];
    let body = format!(
        "{}{}{}",
        img_tag(&blob, "Processed image"),
        facts(&rows),
        steps_list(&result.steps)
    );
    Ok(
        Rendered::new(panel("image", "Processed Image", result.source, &body))
            .with_blobs(vec![blob]),
    )
}

pub fn augmented(result: &ImageAugmented) -> Result<Rendered, RenderError> {
    let mut blobs = Vec::with_capacity(result.variants.len());
    let mut items = Vec::with_capacity(result.variants.len());
    for variant in &result.variants {
        let blob = image_blob(&variant.value, &format!("augmented image {}", variant.name))?;
        items.push(variant_item(&variant.name, &img_tag(&blob, &variant.name)));
        blobs.push(blob);
    }
    let body = format!("{}{}", variants_container(&items), steps_list(&result.steps));
    Ok(Rendered::new(panel("image", "Augmented Images", result.source, &body)).with_blobs(blobs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::fixtures::SAMPLE_PNG_BASE64;
    use crate::api::response::{Dimensions, Variant};
    use crate::api::ResponseSource;

    fn png() -> EncodedMedia {
        EncodedMedia::new(SAMPLE_PNG_BASE64)
    }

    #[test]
    fn test_preprocessed_shows_dimensions_and_steps() {
        let result = ImagePreprocessed {
            data: png(),
            original_size: Dimensions { width: 800, height: 600 },
            processed_size: Dimensions { width: 400, height: 300 },
            steps: vec!["Converted to grayscale".into(), "Resized".into()],
            source: ResponseSource::Live,
        };
        let rendered = preprocessed(&result).unwrap();
        assert!(rendered.html.contains("800×600"));
        assert!(rendered.html.contains("400×300"));
        assert!(rendered.html.contains("<li>Converted to grayscale</li><li>Resized</li>"));
        assert_eq!(rendered.blobs.len(), 1);
        assert_eq!(rendered.blobs[0].mime, "image/png");
        assert!(rendered.html.contains(&rendered.blobs[0].placeholder()));
    }

    #[test]
    fn test_augmented_one_item_per_variant() {
        let result = ImageAugmented {
            variants: ["rotated", "flipped", "brightened"]
                .iter()
                .map(|name| Variant {
                    name: name.to_string(),
                    value: png(),
                })
                .collect(),
            steps: vec![],
            source: ResponseSource::Fixture,
        };
        let rendered = augmented(&result).unwrap();
        assert_eq!(rendered.html.matches("class=\"variant accordion-item\"").count(), 3);
        assert_eq!(rendered.blobs.len(), 3);
        assert!(rendered.html.contains(">Rotated<"));
        assert!(rendered.html.contains("data-variant=\"flipped\""));
        assert!(rendered.html.contains("Sample data"));
    }

    #[test]
    fn test_undecodable_payload_is_decode_error() {
        let result = ImagePreprocessed {
            data: EncodedMedia::new("base64_encoded_image_data"),
            original_size: Dimensions { width: 1, height: 1 },
            processed_size: Dimensions { width: 1, height: 1 },
            steps: vec![],
            source: ResponseSource::Live,
        };
        assert!(matches!(
            preprocessed(&result),
            Err(RenderError::Decode { .. })
        ));
    }

    #[test]
    fn test_sniff_mime() {
        assert_eq!(sniff_mime(&[0xFF, 0xD8, 0xFF, 0xE0]), "image/jpeg");
        assert_eq!(sniff_mime(b"GIF89a"), "image/gif");
        assert_eq!(sniff_mime(b"????"), "image/png");
    }
}
