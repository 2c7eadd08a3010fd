//! Content renderers.
//!
//! Renderers are pure: they take a decoded result and return a [`Rendered`]
//! fragment of HTML plus the media blobs it references. Blobs are referenced
//! from markup through `blob:<uuid>` placeholders, which the page renderer
//! resolves against the live [`BlobRegistry`] (inline data URIs for a
//! standalone page, `/blobs/<uuid>` when served).

pub mod audio;
pub mod image;
pub mod mesh;
pub mod page;
pub mod text;

use std::collections::HashMap;
use std::fmt::Write as _;

use base64::Engine;
use bytes::Bytes;
use thiserror::Error;
use uuid::Uuid;

use crate::api::{AugmentResult, EncodedMedia, PreprocessResult, ResponseSource, UploadResult};
use crate::error::ClientError;

pub use text::TextExport;

/// Placeholder scheme for blob references inside rendered markup.
pub const BLOB_SCHEME: &str = "blob:";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RenderError {
    #[error("could not decode {what}: {reason}")]
    Decode { what: String, reason: String },

    #[error("malformed result: {field}")]
    Malformed { field: String },
}

impl From<RenderError> for ClientError {
    fn from(err: RenderError) -> Self {
        match err {
            RenderError::Decode { what, reason } => ClientError::Decode { what, reason },
            RenderError::Malformed { field } => ClientError::MalformedResponse { field },
        }
    }
}

/// A decoded media payload, the analog of a browser object URL.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaBlob {
    pub id: Uuid,
    pub label: String,
    pub mime: String,
    pub bytes: Bytes,
}

impl MediaBlob {
    pub fn new(label: impl Into<String>, mime: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            id: Uuid::new_v4(),
            label: label.into(),
            mime: mime.into(),
            bytes: bytes.into(),
        }
    }

    /// Placeholder URL used in markup until the page is assembled.
    pub fn placeholder(&self) -> String {
        format!("{BLOB_SCHEME}{}", self.id)
    }

    pub fn data_uri(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.mime,
            base64::engine::general_purpose::STANDARD.encode(&self.bytes)
        )
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}

/// Output of a renderer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Rendered {
    pub html: String,
    pub blobs: Vec<MediaBlob>,
    /// Processed text offered for saving.
    pub text_export: Option<TextExport>,
}

impl Rendered {
    pub fn new(html: String) -> Self {
        Self {
            html,
            ..Self::default()
        }
    }

    pub fn with_blobs(mut self, blobs: Vec<MediaBlob>) -> Self {
        self.blobs = blobs;
        self
    }

    pub fn blob_ids(&self) -> Vec<Uuid> {
        self.blobs.iter().map(|b| b.id).collect()
    }
}

/// Live media blobs. Released blobs can no longer be resolved.
#[derive(Debug, Default)]
pub struct BlobRegistry {
    blobs: HashMap<Uuid, MediaBlob>,
}

impl BlobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, blobs: impl IntoIterator<Item = MediaBlob>) {
        for blob in blobs {
            self.blobs.insert(blob.id, blob);
        }
    }

    pub fn release(&mut self, ids: &[Uuid]) {
        for id in ids {
            if self.blobs.remove(id).is_some() {
                tracing::trace!(blob = %id, "released media blob");
            }
        }
    }

    pub fn get(&self, id: &Uuid) -> Option<&MediaBlob> {
        self.blobs.get(id)
    }

    pub fn contains(&self, id: &Uuid) -> bool {
        self.blobs.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MediaBlob> {
        self.blobs.values()
    }
}

/// Render an upload result as the "original" view.
pub fn render_upload(result: &UploadResult) -> Result<Rendered, RenderError> {
    match result {
        UploadResult::Image(r) => image::original(r),
        UploadResult::Audio(r) => audio::original(r),
        UploadResult::Text(r) => Ok(text::original(r)),
        UploadResult::Mesh(r) => mesh::original(r),
    }
}

pub fn render_preprocess(result: &PreprocessResult) -> Result<Rendered, RenderError> {
    match result {
        PreprocessResult::Image(r) => image::preprocessed(r),
        PreprocessResult::Audio(r) => audio::preprocessed(r),
        PreprocessResult::Text(r) => Ok(text::preprocessed(r)),
        PreprocessResult::Mesh(r) => mesh::preprocessed(r),
    }
}

pub fn render_augment(result: &AugmentResult) -> Result<Rendered, RenderError> {
    match result {
        AugmentResult::Image(r) => image::augmented(r),
        AugmentResult::Audio(r) => audio::augmented(r),
        AugmentResult::Text(r) => Ok(text::augmented(r)),
        AugmentResult::Mesh(r) => mesh::augmented(r),
    }
}

/// Escape text for HTML element content and attribute values.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            _ => out.push(c),
        }
    }
    out
}

/// Variant display title: first letter upper-cased, rest verbatim.
pub fn variant_title(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub(crate) fn decode_media(media: &EncodedMedia, what: &str) -> Result<Vec<u8>, RenderError> {
    media.decode(what).map_err(|e| match e {
        ClientError::Decode { what, reason } => RenderError::Decode { what, reason },
        other => RenderError::Malformed {
            field: other.to_string(),
        },
    })
}

/// Ordered list of processing steps. Empty when there are none.
pub(crate) fn steps_list(steps: &[String]) -> String {
    if steps.is_empty() {
        return String::new();
    }
    let mut html = String::from("<div class=\"steps\"><h6>Processing steps</h6><ol>");
    for step in steps {
        let _ = write!(html, "<li>{}</li>", escape_html(step));
    }
    html.push_str("</ol></div>");
    html
}

pub(crate) fn source_badge(source: ResponseSource) -> &'static str {
    match source {
        ResponseSource::Live => "",
        ResponseSource::Fixture => "<span class=\"badge sample-data\">Sample data</span>",
    }
}

/// A titled result panel.
pub(crate) fn panel(kind: &str, title: &str, source: ResponseSource, body: &str) -> String {
    format!(
        "<section class=\"result-panel {kind}\"><h5>{}{}</h5>{body}</section>",
        escape_html(title),
        source_badge(source)
    )
}

/// One accordion item per augmentation variant.
pub(crate) fn variant_item(name: &str, body: &str) -> String {
    format!(
        "<div class=\"variant accordion-item\" data-variant=\"{}\">\
         <h6 class=\"variant-title\">{}</h6>\
         <div class=\"accordion-body\">{body}</div></div>",
        escape_html(name),
        escape_html(&variant_title(name))
    )
}

pub(crate) fn variants_container(items: &[String]) -> String {
    format!("<div class=\"variants accordion\">{}</div>", items.concat())
}

/// `<dl>` of label/value pairs; values are escaped.
pub(crate) fn facts(rows: &[(&str, String)]) -> String {
    if rows.is_empty() {
        return String::new();
    }
    let mut html = String::from("<dl class=\"facts\">");
    for (label, value) in rows {
        let _ = write!(
            html,
            "<dt>{}</dt><dd>{}</dd>",
            escape_html(label),
            escape_html(value)
        );
    }
    html.push_str("</dl>");
    html
}

/// Size in megabytes with two decimals.
pub(crate) fn format_megabytes(bytes: usize) -> String {
    format!("{:.2} MB", bytes as f64 / (1024.0 * 1024.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_html_all_specials() {
        assert_eq!(
            escape_html(r#"<b>"Tom" & 'Jerry'</b>"#),
            "&lt;b&gt;&quot;Tom&quot; &amp; &#039;Jerry&#039;&lt;/b&gt;"
        );
        assert_eq!(escape_html("plain"), "plain");
    }

    #[test]
    fn test_variant_title() {
        assert_eq!(variant_title("rotated"), "Rotated");
        assert_eq!(variant_title("time_stretched"), "Time_stretched");
        assert_eq!(variant_title(""), "");
    }

    #[test]
    fn test_steps_list_order_and_escaping() {
        let steps = vec!["Resize <fast>".to_string(), "Normalize".to_string()];
        let html = steps_list(&steps);
        let first = html.find("Resize &lt;fast&gt;").unwrap();
        let second = html.find("Normalize").unwrap();
        assert!(first < second);
        assert!(steps_list(&[]).is_empty());
    }

    #[test]
    fn test_blob_registry_release() {
        let mut registry = BlobRegistry::new();
        let a = MediaBlob::new("a", "image/png", vec![1u8]);
        let b = MediaBlob::new("b", "image/png", vec![2u8]);
        let (a_id, b_id) = (a.id, b.id);
        registry.register([a, b]);
        assert_eq!(registry.len(), 2);

        registry.release(&[a_id]);
        assert!(!registry.contains(&a_id));
        assert!(registry.contains(&b_id));
    }

    #[test]
    fn test_blob_data_uri() {
        let blob = MediaBlob::new("x", "text/plain", b"hello".to_vec());
        assert_eq!(blob.data_uri(), "data:text/plain;base64,aGVsbG8=");
        assert!(blob.placeholder().starts_with("blob:"));
    }

    #[test]
    fn test_render_error_maps_to_client_error() {
        let err: ClientError = RenderError::Decode {
            what: "image".into(),
            reason: "bad".into(),
        }
        .into();
        assert!(matches!(err, ClientError::Decode { .. }));
    }

    #[test]
    fn test_format_megabytes() {
        assert_eq!(format_megabytes(1024 * 1024), "1.00 MB");
        assert_eq!(format_megabytes(0), "0.00 MB");
    }

    #[test]
    fn test_fixture_badge_only_for_fixtures() {
        assert!(panel("x", "T", ResponseSource::Fixture, "").contains("Sample data"));
        assert!(!panel("x", "T", ResponseSource::Live, "").contains("Sample data"));
    }
}
