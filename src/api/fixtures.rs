//! Canned backend responses.
//!
//! Used by [`FixtureTransport`](super::FixtureTransport) and as the fallback
//! set of [`FallbackTransport`](super::FallbackTransport). Every payload holds
//! media that actually decodes (a 1×1 PNG, short silent WAV clips, a
//! tetrahedron) so the workbench renders end to end without a backend.

use std::io::Cursor;

use base64::Engine;
use hound::{SampleFormat, WavSpec, WavWriter};
use serde_json::{json, Value};

use super::{Endpoint, Operation};
use crate::media::MediaCategory;

/// A 1×1 RGBA PNG.
pub const SAMPLE_PNG_BASE64: &str =
    "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR4nGNoaGj4DwAFhAKAjM1mJgAAAABJRU5ErkJggg==";

pub const SAMPLE_SAMPLE_RATE: u32 = 8000;

/// Look up the fixture for an endpoint.
pub fn fixture(endpoint: &Endpoint) -> Option<Value> {
    let Endpoint::Media(category, op) = endpoint else {
        return None;
    };
    Some(match (category, op) {
        (MediaCategory::Text, Operation::Upload) => text_upload(),
        (MediaCategory::Text, Operation::Preprocess) => text_preprocess(),
        (MediaCategory::Text, Operation::Augment) => text_augment(),
        (MediaCategory::Image, Operation::Upload) => image_upload(),
        (MediaCategory::Image, Operation::Preprocess) => image_preprocess(),
        (MediaCategory::Image, Operation::Augment) => image_augment(),
        (MediaCategory::Audio, Operation::Upload) => audio_upload(),
        (MediaCategory::Audio, Operation::Preprocess) => audio_preprocess(),
        (MediaCategory::Audio, Operation::Augment) => audio_augment(),
        (MediaCategory::Mesh, Operation::Upload) => mesh_upload(),
        (MediaCategory::Mesh, Operation::Preprocess) => mesh_preprocess(),
        (MediaCategory::Mesh, Operation::Augment) => mesh_augment(),
    })
}

fn text_upload() -> Value {
    json!({
        "text_content": "Sample text content",
        "validation": { "length": 19, "word_count": 3, "line_count": 1, "is_valid": true }
    })
}

fn text_preprocess() -> Value {
    json!({
        "processed_text": "preprocessed sample text content\nwith multiple lines\nand normalized structure",
        "original_text": "Sample Text Content\nWith Multiple Lines\nAnd Different Structure",
        "steps": [
            "Removed leading/trailing whitespace",
            "Normalized whitespace",
            "Converted to lowercase",
            "Removed special characters",
            "Split into sentences",
            "Tokenized words",
            "Removed stop words",
            "Lemmatized tokens",
            "Reconstructed sentences"
        ]
    })
}

fn text_augment() -> Value {
    json!({
        "augmented_texts": {
            "reversed": "content text sample",
            "shuffled": "text sample content",
            "simplified": "simple text content",
            "expanded": "Sample text content\n\nExpanded version:\nSample text content"
        },
        "steps": ["Reversed text", "Shuffled sentences", "Simplified text", "Expanded text"]
    })
}

fn image_upload() -> Value {
    json!({
        "image_data": SAMPLE_PNG_BASE64,
        "validation": { "format": "PNG", "size": [800, 600], "mode": "RGBA" }
    })
}

fn image_preprocess() -> Value {
    json!({
        "processed_image": SAMPLE_PNG_BASE64,
        "original_size": [800, 600],
        "processed_size": [400, 300],
        "steps": [
            "Converted to RGB",
            "Resized to max 1024px",
            "Normalized pixel values",
            "Applied color correction"
        ]
    })
}

fn image_augment() -> Value {
    json!({
        "augmented_images": {
            "rotated": SAMPLE_PNG_BASE64,
            "flipped": SAMPLE_PNG_BASE64,
            "brightened": SAMPLE_PNG_BASE64,
            "darkened": SAMPLE_PNG_BASE64
        },
        "steps": [
            "90-degree rotation",
            "Horizontal flip",
            "Brightness adjustment (+20%)",
            "Brightness adjustment (-20%)"
        ]
    })
}

fn audio_upload() -> Value {
    json!({
        "audio_data": silent_wav_base64(250),
        "validation": {
            "duration": 0.25,
            "sample_rate": SAMPLE_SAMPLE_RATE,
            "num_channels": 1
        }
    })
}

fn audio_preprocess() -> Value {
    json!({
        "processed_audio": silent_wav_base64(200),
        "sample_rate": SAMPLE_SAMPLE_RATE,
        "steps": [
            "Converted to mono",
            "Normalized audio levels",
            "Removed silence",
            "Reduced noise"
        ]
    })
}

fn audio_augment() -> Value {
    json!({
        "augmented_audio": {
            "time_stretched": silent_wav_base64(375),
            "pitch_shifted": silent_wav_base64(250),
            "reversed": silent_wav_base64(250)
        },
        "sample_rate": SAMPLE_SAMPLE_RATE,
        "steps": [
            "Time stretching (1.5x)",
            "Pitch shifting (+4 semitones)",
            "Audio reversal"
        ]
    })
}

fn mesh_upload() -> Value {
    json!({
        "mesh_data": tetrahedron(|v| v),
        "validation": { "vertex_count": 4, "face_count": 4, "is_watertight": true }
    })
}

fn mesh_preprocess() -> Value {
    json!({
        "processed_mesh": tetrahedron(|v| v),
        "statistics": {
            "original": { "vertices": 12, "faces": 4 },
            "processed": { "vertices": 4, "faces": 4, "is_watertight": true },
            "improvements": { "vertices_reduced": 8, "faces_reduced": 0 }
        },
        "steps": [
            "Removed duplicate vertices",
            "Fixed surface normals",
            "Filled holes",
            "Optimized mesh"
        ]
    })
}

fn mesh_augment() -> Value {
    json!({
        "augmented_meshes": {
            "scaled": tetrahedron(|[x, y, z]| [x * 1.5, y * 1.5, z * 1.5]),
            "rotated": tetrahedron(|[x, y, z]| [z, y, -x]),
            "mirrored": tetrahedron(|[x, y, z]| [-x, y, z])
        },
        "steps": ["Scaled by 1.5", "Rotated 90° on Y-axis", "Mirrored along X-axis"]
    })
}

fn tetrahedron(transform: impl Fn([f64; 3]) -> [f64; 3]) -> Value {
    let vertices: Vec<[f64; 3]> = [
        [1.0, 1.0, 1.0],
        [-1.0, -1.0, 1.0],
        [-1.0, 1.0, -1.0],
        [1.0, -1.0, -1.0],
    ]
    .into_iter()
    .map(transform)
    .collect();
    json!({
        "vertices": vertices,
        "faces": [[0, 2, 1], [0, 1, 3], [0, 3, 2], [1, 2, 3]]
    })
}

fn silent_wav_base64(duration_ms: u32) -> String {
    match wav_bytes(SAMPLE_SAMPLE_RATE, duration_ms) {
        Ok(bytes) => base64::engine::general_purpose::STANDARD.encode(bytes),
        Err(e) => {
            tracing::warn!(error = %e, "failed to build sample WAV");
            String::new()
        }
    }
}

/// Mono 16-bit PCM WAV of silence.
pub fn wav_bytes(sample_rate: u32, duration_ms: u32) -> Result<Vec<u8>, hound::Error> {
    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let samples = u64::from(sample_rate) * u64::from(duration_ms) / 1000;
    let mut cursor = Cursor::new(Vec::new());
    let mut writer = WavWriter::new(&mut cursor, spec)?;
    for _ in 0..samples {
        writer.write_sample(0i16)?;
    }
    writer.finalize()?;
    Ok(cursor.into_inner())
}
