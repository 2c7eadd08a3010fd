//! Typed backend responses.
//!
//! JSON bodies are decoded once, at the transport boundary, into one variant
//! per category. Each variant carries only the fields that category's
//! response has. A missing or mistyped required field is a
//! [`ClientError::MalformedResponse`] naming the field.
//!
//! Canonical schema: `validation.vertex_count` for mesh uploads and
//! `statistics.{original,processed,improvements}` for mesh preprocessing.

use base64::Engine;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::{ClientError, ClientResult};
use crate::media::MediaCategory;

/// Where a response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseSource {
    #[default]
    Live,
    /// Canned stand-in data; shown as such on screen.
    Fixture,
}

impl ResponseSource {
    pub fn is_fixture(&self) -> bool {
        matches!(self, ResponseSource::Fixture)
    }
}

/// Base64 media payload, not yet decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedMedia(String);

impl EncodedMedia {
    pub fn new(encoded: impl Into<String>) -> Self {
        Self(encoded.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Decode the payload. Whitespace (line-wrapped base64) is ignored.
    pub fn decode(&self, what: &str) -> ClientResult<Vec<u8>> {
        let compact: String = self.0.chars().filter(|c| !c.is_whitespace()).collect();
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(compact.as_bytes())
            .map_err(|e| ClientError::Decode {
                what: what.to_string(),
                reason: e.to_string(),
            })?;
        if bytes.is_empty() {
            return Err(ClientError::Decode {
                what: what.to_string(),
                reason: "payload is empty".to_string(),
            });
        }
        Ok(bytes)
    }
}

/// Pixel dimensions, encoded on the wire as `[width, height]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(from = "(u32, u32)")]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl From<(u32, u32)> for Dimensions {
    fn from((width, height): (u32, u32)) -> Self {
        Self { width, height }
    }
}

impl std::fmt::Display for Dimensions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}×{}", self.width, self.height)
    }
}

/// Vertex/face arrays of a mesh payload.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MeshData {
    pub vertices: Vec<[f64; 3]>,
    pub faces: Vec<Vec<u32>>,
    #[serde(default)]
    pub normals: Option<Vec<[f64; 3]>>,
}

impl MeshData {
    /// Check index bounds, face arity and normal count.
    fn validate(&self, field: &str) -> ClientResult<()> {
        let count = self.vertices.len();
        for (i, face) in self.faces.iter().enumerate() {
            if face.len() < 3 {
                return Err(ClientError::malformed(format!("{field}.faces[{i}]")));
            }
            if face.iter().any(|&idx| idx as usize >= count) {
                return Err(ClientError::malformed(format!("{field}.faces[{i}]")));
            }
        }
        if let Some(normals) = &self.normals {
            if normals.len() != count {
                return Err(ClientError::malformed(format!("{field}.normals")));
            }
        }
        Ok(())
    }
}

/// One named output of an augmentation.
#[derive(Debug, Clone, PartialEq)]
pub struct Variant<T> {
    pub name: String,
    pub value: T,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ImageValidation {
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub size: Option<Dimensions>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AudioValidation {
    /// Seconds.
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub sample_rate: Option<u32>,
    #[serde(default)]
    pub num_channels: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TextValidation {
    #[serde(default)]
    pub length: Option<u64>,
    #[serde(default)]
    pub word_count: Option<u64>,
    #[serde(default)]
    pub line_count: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MeshValidation {
    pub vertex_count: u64,
    pub face_count: u64,
    pub is_watertight: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MeshCounts {
    pub vertices: u64,
    pub faces: u64,
    #[serde(default)]
    pub is_watertight: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct MeshImprovements {
    #[serde(default)]
    pub vertices_reduced: i64,
    #[serde(default)]
    pub faces_reduced: i64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MeshStatistics {
    pub original: MeshCounts,
    pub processed: MeshCounts,
    #[serde(default)]
    pub improvements: MeshImprovements,
}

// ---------------------------------------------------------------------------
// Upload
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct ImageOriginal {
    pub data: EncodedMedia,
    pub validation: ImageValidation,
    pub source: ResponseSource,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AudioOriginal {
    pub data: EncodedMedia,
    pub validation: AudioValidation,
    pub source: ResponseSource,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextOriginal {
    pub text: String,
    pub validation: TextValidation,
    pub source: ResponseSource,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MeshOriginal {
    pub mesh: MeshData,
    pub validation: MeshValidation,
    pub source: ResponseSource,
}

/// Response of `POST {category}/upload`.
#[derive(Debug, Clone, PartialEq)]
pub enum UploadResult {
    Image(ImageOriginal),
    Audio(AudioOriginal),
    Text(TextOriginal),
    Mesh(MeshOriginal),
}

impl UploadResult {
    pub fn decode(
        category: MediaCategory,
        body: &Value,
        source: ResponseSource,
    ) -> ClientResult<Self> {
        let body = as_object(body)?;
        Ok(match category {
            MediaCategory::Image => UploadResult::Image(ImageOriginal {
                data: media(body, "image_data")?,
                validation: optional(body, "validation")?.unwrap_or_default(),
                source,
            }),
            MediaCategory::Audio => UploadResult::Audio(AudioOriginal {
                data: media(body, "audio_data")?,
                validation: optional(body, "validation")?.unwrap_or_default(),
                source,
            }),
            MediaCategory::Text => UploadResult::Text(TextOriginal {
                text: string(body, "text_content")?,
                validation: optional(body, "validation")?.unwrap_or_default(),
                source,
            }),
            MediaCategory::Mesh => UploadResult::Mesh(MeshOriginal {
                mesh: mesh(body, "mesh_data")?,
                validation: required(body, "validation")?,
                source,
            }),
        })
    }

    pub fn category(&self) -> MediaCategory {
        match self {
            UploadResult::Image(_) => MediaCategory::Image,
            UploadResult::Audio(_) => MediaCategory::Audio,
            UploadResult::Text(_) => MediaCategory::Text,
            UploadResult::Mesh(_) => MediaCategory::Mesh,
        }
    }

    pub fn source(&self) -> ResponseSource {
        match self {
            UploadResult::Image(r) => r.source,
            UploadResult::Audio(r) => r.source,
            UploadResult::Text(r) => r.source,
            UploadResult::Mesh(r) => r.source,
        }
    }
}

// ---------------------------------------------------------------------------
// Preprocess
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct ImagePreprocessed {
    pub data: EncodedMedia,
    pub original_size: Dimensions,
    pub processed_size: Dimensions,
    pub steps: Vec<String>,
    pub source: ResponseSource,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AudioPreprocessed {
    pub data: EncodedMedia,
    pub sample_rate: Option<u32>,
    pub steps: Vec<String>,
    pub source: ResponseSource,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextPreprocessed {
    pub text: String,
    pub original_text: Option<String>,
    pub steps: Vec<String>,
    pub source: ResponseSource,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MeshPreprocessed {
    pub mesh: MeshData,
    pub statistics: MeshStatistics,
    pub steps: Vec<String>,
    pub source: ResponseSource,
}

/// Response of `POST {category}/preprocess`.
#[derive(Debug, Clone, PartialEq)]
pub enum PreprocessResult {
    Image(ImagePreprocessed),
    Audio(AudioPreprocessed),
    Text(TextPreprocessed),
    Mesh(MeshPreprocessed),
}

impl PreprocessResult {
    pub fn decode(
        category: MediaCategory,
        body: &Value,
        source: ResponseSource,
    ) -> ClientResult<Self> {
        let body = as_object(body)?;
        let steps = steps(body)?;
        Ok(match category {
            MediaCategory::Image => PreprocessResult::Image(ImagePreprocessed {
                data: media(body, "processed_image")?,
                original_size: required(body, "original_size")?,
                processed_size: required(body, "processed_size")?,
                steps,
                source,
            }),
            MediaCategory::Audio => PreprocessResult::Audio(AudioPreprocessed {
                data: media(body, "processed_audio")?,
                sample_rate: optional(body, "sample_rate")?,
                steps,
                source,
            }),
            MediaCategory::Text => PreprocessResult::Text(TextPreprocessed {
                text: string(body, "processed_text")?,
                original_text: optional(body, "original_text")?,
                steps,
                source,
            }),
            MediaCategory::Mesh => PreprocessResult::Mesh(MeshPreprocessed {
                mesh: mesh(body, "processed_mesh")?,
                statistics: required(body, "statistics")?,
                steps,
                source,
            }),
        })
    }

    pub fn steps(&self) -> &[String] {
        match self {
            PreprocessResult::Image(r) => &r.steps,
            PreprocessResult::Audio(r) => &r.steps,
            PreprocessResult::Text(r) => &r.steps,
            PreprocessResult::Mesh(r) => &r.steps,
        }
    }

    pub fn source(&self) -> ResponseSource {
        match self {
            PreprocessResult::Image(r) => r.source,
            PreprocessResult::Audio(r) => r.source,
            PreprocessResult::Text(r) => r.source,
            PreprocessResult::Mesh(r) => r.source,
        }
    }
}

// ---------------------------------------------------------------------------
// Augment
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct ImageAugmented {
    pub variants: Vec<Variant<EncodedMedia>>,
    pub steps: Vec<String>,
    pub source: ResponseSource,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AudioAugmented {
    pub variants: Vec<Variant<EncodedMedia>>,
    pub sample_rate: Option<u32>,
    pub steps: Vec<String>,
    pub source: ResponseSource,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextAugmented {
    pub variants: Vec<Variant<String>>,
    pub steps: Vec<String>,
    pub source: ResponseSource,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MeshAugmented {
    pub variants: Vec<Variant<MeshData>>,
    pub steps: Vec<String>,
    pub source: ResponseSource,
}

/// Response of `POST {category}/augment`: a set of named variants.
#[derive(Debug, Clone, PartialEq)]
pub enum AugmentResult {
    Image(ImageAugmented),
    Audio(AudioAugmented),
    Text(TextAugmented),
    Mesh(MeshAugmented),
}

impl AugmentResult {
    pub fn decode(
        category: MediaCategory,
        body: &Value,
        source: ResponseSource,
    ) -> ClientResult<Self> {
        let body = as_object(body)?;
        let steps = steps(body)?;
        Ok(match category {
            MediaCategory::Image => AugmentResult::Image(ImageAugmented {
                variants: variants(body, "augmented_images", |v, field| {
                    encoded(v, field)
                })?,
                steps,
                source,
            }),
            MediaCategory::Audio => AugmentResult::Audio(AudioAugmented {
                variants: variants(body, "augmented_audio", |v, field| encoded(v, field))?,
                sample_rate: optional(body, "sample_rate")?,
                steps,
                source,
            }),
            MediaCategory::Text => AugmentResult::Text(TextAugmented {
                variants: variants(body, "augmented_texts", |v, field| {
                    v.as_str()
                        .map(str::to_string)
                        .ok_or_else(|| ClientError::malformed(field))
                })?,
                steps,
                source,
            }),
            MediaCategory::Mesh => AugmentResult::Mesh(MeshAugmented {
                variants: variants(body, "augmented_meshes", |v, field| {
                    let mesh: MeshData = serde_json::from_value(v.clone())
                        .map_err(|_| ClientError::malformed(field))?;
                    mesh.validate(field)?;
                    Ok(mesh)
                })?,
                steps,
                source,
            }),
        })
    }

    pub fn variant_names(&self) -> Vec<&str> {
        fn names<T>(variants: &[Variant<T>]) -> Vec<&str> {
            variants.iter().map(|v| v.name.as_str()).collect()
        }
        match self {
            AugmentResult::Image(r) => names(&r.variants),
            AugmentResult::Audio(r) => names(&r.variants),
            AugmentResult::Text(r) => names(&r.variants),
            AugmentResult::Mesh(r) => names(&r.variants),
        }
    }

    pub fn steps(&self) -> &[String] {
        match self {
            AugmentResult::Image(r) => &r.steps,
            AugmentResult::Audio(r) => &r.steps,
            AugmentResult::Text(r) => &r.steps,
            AugmentResult::Mesh(r) => &r.steps,
        }
    }

    pub fn source(&self) -> ResponseSource {
        match self {
            AugmentResult::Image(r) => r.source,
            AugmentResult::Audio(r) => r.source,
            AugmentResult::Text(r) => r.source,
            AugmentResult::Mesh(r) => r.source,
        }
    }
}

// ---------------------------------------------------------------------------
// Field extraction helpers
// ---------------------------------------------------------------------------

type Object = Map<String, Value>;

fn as_object(body: &Value) -> ClientResult<&Object> {
    body.as_object()
        .ok_or_else(|| ClientError::malformed("<response body>"))
}

fn required<T: DeserializeOwned>(body: &Object, field: &str) -> ClientResult<T> {
    let value = body
        .get(field)
        .filter(|v| !v.is_null())
        .ok_or_else(|| ClientError::malformed(field))?;
    serde_json::from_value(value.clone()).map_err(|_| ClientError::malformed(field))
}

fn optional<T: DeserializeOwned>(body: &Object, field: &str) -> ClientResult<Option<T>> {
    match body.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => serde_json::from_value(value.clone())
            .map(Some)
            .map_err(|_| ClientError::malformed(field)),
    }
}

fn string(body: &Object, field: &str) -> ClientResult<String> {
    body.get(field)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| ClientError::malformed(field))
}

fn encoded(value: &Value, field: &str) -> ClientResult<EncodedMedia> {
    match value.as_str() {
        Some(s) if !s.trim().is_empty() => Ok(EncodedMedia::new(s)),
        _ => Err(ClientError::malformed(field)),
    }
}

fn media(body: &Object, field: &str) -> ClientResult<EncodedMedia> {
    let value = body.get(field).ok_or_else(|| ClientError::malformed(field))?;
    encoded(value, field)
}

fn mesh(body: &Object, field: &str) -> ClientResult<MeshData> {
    let mesh: MeshData = required(body, field)?;
    mesh.validate(field)?;
    Ok(mesh)
}

/// `steps` is optional; when present it must be a list of strings.
fn steps(body: &Object) -> ClientResult<Vec<String>> {
    Ok(optional::<Vec<String>>(body, "steps")?.unwrap_or_default())
}

fn variants<T>(
    body: &Object,
    field: &str,
    decode: impl Fn(&Value, &str) -> ClientResult<T>,
) -> ClientResult<Vec<Variant<T>>> {
    let map = body
        .get(field)
        .and_then(Value::as_object)
        .ok_or_else(|| ClientError::malformed(field))?;
    map.iter()
        .map(|(name, value)| {
            let value = decode(value, &format!("{field}.{name}"))?;
            Ok(Variant {
                name: name.clone(),
                value,
            })
        })
        .collect()
}
