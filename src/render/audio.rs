//! Audio results.

use std::io::Cursor;

use super::{
    decode_media, facts, format_megabytes, panel, steps_list, variant_item, variants_container,
    MediaBlob, RenderError, Rendered,
};
use crate::api::response::{AudioAugmented, AudioOriginal, AudioPreprocessed};
use crate::api::EncodedMedia;

/// Sniff the audio MIME type from magic bytes, defaulting to WAV.
pub fn sniff_mime(bytes: &[u8]) -> &'static str {
    match infer::get(bytes) {
        Some(kind) if kind.matcher_type() == infer::MatcherType::Audio => {
            match kind.mime_type() {
                "audio/x-wav" => "audio/wav",
                "audio/x-flac" => "audio/flac",
                other => other,
            }
        }
        _ => "audio/wav",
    }
}

/// Duration in seconds of a WAV clip, or `None` when it is not a readable WAV.
pub fn wav_duration(bytes: &[u8]) -> Option<f64> {
    let reader = hound::WavReader::new(Cursor::new(bytes)).ok()?;
    let rate = reader.spec().sample_rate;
    if rate == 0 {
        return None;
    }
    Some(f64::from(reader.duration()) / f64::from(rate))
}

fn format_duration(seconds: f64) -> String {
    format!("{seconds:.2} s")
}

fn audio_blob(media: &EncodedMedia, label: &str) -> Result<MediaBlob, RenderError> {
    let bytes = decode_media(media, label)?;
    let mime = sniff_mime(&bytes);
    Ok(MediaBlob::new(label, mime, bytes))
}

/// `<audio>` element plus duration and size facts.
fn player(blob: &MediaBlob, known_duration: Option<f64>, extra: &[(&str, String)]) -> String {
    let mut rows: Vec<(&str, String)> = Vec::new();
    if let Some(duration) = known_duration.or_else(|| wav_duration(&blob.bytes)) {
        rows.push(("Duration", format_duration(duration)));
    }
    rows.push(("Size", format_megabytes(blob.size())));
    rows.extend(extra.iter().cloned());
    format!(
        "<audio controls preload=\"metadata\" src=\"{}\" type=\"{}\"></audio>{}",
        blob.placeholder(),
        blob.mime,
        facts(&rows)
    )
}

pub fn original(result: &AudioOriginal) -> Result<Rendered, RenderError> {
    let blob = audio_blob(&result.data, "original audio")?;
    let validation = &result.validation;
    let mut extra = Vec::new();
    if let Some(rate) = validation.sample_rate {
        extra.push(("Sample rate", format!("{rate} Hz")));
    }
    if let Some(channels) = validation.num_channels {
        extra.push(("Channels", channels.to_string()));
    }
    let body = player(&blob, validation.duration, &extra);
    Ok(Rendered::new(panel("audio", "Original Audio", result.source, &body)).with_blobs(vec![blob]))
}

pub fn preprocessed(result: &AudioPreprocessed) -> Result<Rendered, RenderError> {
    let blob = audio_blob(&result.data, "processed audio")?;
    let extra: Vec<(&str, String)> = result
        .sample_rate
        .map(|rate| ("Sample rate", format!("{rate} Hz")))
        .into_iter()
        .collect();
    let body = format!("{}{}", player(&blob, None, &extra), steps_list(&result.steps));
    Ok(
        Rendered::new(panel("audio", "Processed Audio", result.source, &body))
            .with_blobs(vec![blob]),
    )
}

pub fn augmented(result: &AudioAugmented) -> Result<Rendered, RenderError> {
    let mut blobs = Vec::with_capacity(result.variants.len());
    let mut items = Vec::with_capacity(result.variants.len());
    for variant in &result.variants {
        let blob = audio_blob(&variant.value, &format!("augmented audio {}", variant.name))?;
        items.push(variant_item(&variant.name, &player(&blob, None, &[])));
        blobs.push(blob);
    }
    let body = format!("{}{}", variants_container(&items), steps_list(&result.steps));
    Ok(Rendered::new(panel("audio", "Augmented Audio", result.source, &body)).with_blobs(blobs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::fixtures::wav_bytes;
    use crate::api::response::{AudioValidation, Variant};
    use crate::api::ResponseSource;
    use base64::Engine;

    fn encoded_wav(duration_ms: u32) -> EncodedMedia {
        EncodedMedia::new(
            base64::engine::general_purpose::STANDARD.encode(wav_bytes(8000, duration_ms).unwrap()),
        )
    }

    #[test]
    fn test_wav_duration_from_header() {
        let duration = wav_duration(&wav_bytes(8000, 250).unwrap()).unwrap();
        assert!((duration - 0.25).abs() < 1e-9);
        assert_eq!(wav_duration(b"ID3\x03"), None);
        assert_eq!(wav_duration(b"RIFF\0\0\0\0WAVE"), None);
        assert_eq!(wav_duration(&[]), None);
    }

    #[test]
    fn test_sniff_mime() {
        assert_eq!(sniff_mime(&wav_bytes(8000, 10).unwrap()), "audio/wav");
        assert_eq!(sniff_mime(b"ID3\x04\x00"), "audio/mpeg");
        assert_eq!(sniff_mime(&[0xFF, 0xFB, 0x90, 0x00]), "audio/mpeg");
        assert_eq!(sniff_mime(b"not audio at all"), "audio/wav");
    }

    #[test]
    fn test_original_prefers_reported_duration() {
        let result = AudioOriginal {
            data: encoded_wav(250),
            validation: AudioValidation {
                duration: Some(3.5),
                sample_rate: Some(44100),
                num_channels: Some(2),
            },
            source: ResponseSource::Live,
        };
        let rendered = original(&result).unwrap();
        assert!(rendered.html.contains("3.50 s"));
        assert!(rendered.html.contains("44100 Hz"));
        assert!(rendered.html.contains(" MB"));
    }

    #[test]
    fn test_augmented_renders_playable_variants() {
        let result = AudioAugmented {
            variants: ["time_stretched", "pitch_shifted", "reversed"]
                .iter()
                .map(|name| Variant {
                    name: name.to_string(),
                    value: encoded_wav(250),
                })
                .collect(),
            sample_rate: Some(8000),
            steps: vec!["Time stretching".into()],
            source: ResponseSource::Fixture,
        };
        let rendered = augmented(&result).unwrap();
        assert_eq!(rendered.html.matches("<audio controls").count(), 3);
        assert!(rendered.html.contains(">Time_stretched<"));
        assert!(rendered.html.contains("0.25 s"));
        assert!(rendered.blobs.iter().all(|b| b.mime == "audio/wav"));
    }
}
