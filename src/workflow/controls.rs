//! Per-category processing controls.
//!
//! Controls are revealed when a file of their category becomes active and
//! turned into form parameters when an action is submitted. Range checks
//! happen here, before anything is sent.

use serde::{Deserialize, Serialize};

use crate::api::ParamValue;
use crate::error::{ClientError, ClientResult};
use crate::media::MediaCategory;

pub type Params = Vec<(&'static str, ParamValue)>;

pub const BRIGHTNESS_RANGE: (f64, f64) = (-1.0, 1.0);
pub const SPEED_RANGE: (f64, f64) = (0.5, 2.0);
pub const PITCH_RANGE: (i32, i32) = (-12, 12);

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ImageControls {
    pub resize_width: Option<u32>,
    pub resize_height: Option<u32>,
    pub grayscale: bool,
    pub normalize: bool,
    pub flip: bool,
    pub rotate: bool,
    /// Brightness delta.
    pub brightness: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioControls {
    pub normalize: bool,
    pub remove_silence: bool,
    pub reduce_noise: bool,
    /// Playback speed ratio.
    pub speed: f64,
    /// Semitones.
    pub pitch_shift: i32,
}

impl Default for AudioControls {
    fn default() -> Self {
        Self {
            normalize: true,
            remove_silence: true,
            reduce_noise: true,
            speed: 1.0,
            pitch_shift: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeshControls {
    pub remove_duplicates: bool,
    pub fix_normals: bool,
    pub fill_holes: bool,
}

impl Default for MeshControls {
    fn default() -> Self {
        Self {
            remove_duplicates: true,
            fix_normals: true,
            fill_holes: true,
        }
    }
}

/// The control set shown for the active file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "category", rename_all = "snake_case")]
pub enum Controls {
    Image(ImageControls),
    Audio(AudioControls),
    Text,
    Mesh(MeshControls),
}

impl Controls {
    pub fn defaults(category: MediaCategory) -> Self {
        match category {
            MediaCategory::Image => Controls::Image(ImageControls::default()),
            MediaCategory::Audio => Controls::Audio(AudioControls::default()),
            MediaCategory::Text => Controls::Text,
            MediaCategory::Mesh => Controls::Mesh(MeshControls::default()),
        }
    }

    pub fn category(&self) -> MediaCategory {
        match self {
            Controls::Image(_) => MediaCategory::Image,
            Controls::Audio(_) => MediaCategory::Audio,
            Controls::Text => MediaCategory::Text,
            Controls::Mesh(_) => MediaCategory::Mesh,
        }
    }

    pub fn preprocess_params(&self) -> ClientResult<Params> {
        let mut params = Params::new();
        match self {
            Controls::Image(c) => {
                if let Some(width) = c.resize_width.filter(|w| *w == 0) {
                    return Err(invalid("resize_width", format!("{width} is not a positive size")));
                }
                if let Some(height) = c.resize_height.filter(|h| *h == 0) {
                    return Err(invalid("resize_height", format!("{height} is not a positive size")));
                }
                // Resizing needs both dimensions.
                if let (Some(width), Some(height)) = (c.resize_width, c.resize_height) {
                    params.push(("resize_width", ParamValue::Int(i64::from(width))));
                    params.push(("resize_height", ParamValue::Int(i64::from(height))));
                }
                params.push(("grayscale", ParamValue::Bool(c.grayscale)));
                params.push(("normalize", ParamValue::Bool(c.normalize)));
            }
            Controls::Audio(c) => {
                params.push(("normalize", ParamValue::Bool(c.normalize)));
                params.push(("remove_silence", ParamValue::Bool(c.remove_silence)));
                params.push(("reduce_noise", ParamValue::Bool(c.reduce_noise)));
            }
            Controls::Text => {}
            Controls::Mesh(c) => {
                params.push(("remove_duplicates", ParamValue::Bool(c.remove_duplicates)));
                params.push(("fix_normals", ParamValue::Bool(c.fix_normals)));
                params.push(("fill_holes", ParamValue::Bool(c.fill_holes)));
            }
        }
        Ok(params)
    }

    pub fn augment_params(&self) -> ClientResult<Params> {
        let mut params = Params::new();
        match self {
            Controls::Image(c) => {
                check_range("brightness", c.brightness, BRIGHTNESS_RANGE)?;
                params.push(("flip", ParamValue::Bool(c.flip)));
                params.push(("rotate", ParamValue::Bool(c.rotate)));
                params.push(("brightness", ParamValue::Float(c.brightness)));
            }
            Controls::Audio(c) => {
                check_range("speed", c.speed, SPEED_RANGE)?;
                let (lo, hi) = PITCH_RANGE;
                if !(lo..=hi).contains(&c.pitch_shift) {
                    return Err(invalid(
                        "pitch_shift",
                        format!("{} is outside {lo}..={hi} semitones", c.pitch_shift),
                    ));
                }
                params.push(("speed", ParamValue::Float(c.speed)));
                params.push(("pitch_shift", ParamValue::Int(i64::from(c.pitch_shift))));
            }
            Controls::Text | Controls::Mesh(_) => {}
        }
        Ok(params)
    }
}

fn invalid(name: &'static str, reason: String) -> ClientError {
    ClientError::InvalidParameter { name, reason }
}

fn check_range(name: &'static str, value: f64, (lo, hi): (f64, f64)) -> ClientResult<()> {
    if value.is_finite() && (lo..=hi).contains(&value) {
        Ok(())
    } else {
        Err(invalid(name, format!("{value} is outside {lo}..={hi}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(params: &Params) -> Vec<&'static str> {
        params.iter().map(|(n, _)| *n).collect()
    }

    #[test]
    fn test_defaults_match_category() {
        for category in MediaCategory::ALL {
            assert_eq!(Controls::defaults(category).category(), category);
        }
    }

    #[test]
    fn test_audio_and_mesh_cleanup_default_on() {
        let Controls::Audio(audio) = Controls::defaults(MediaCategory::Audio) else {
            panic!("expected audio controls");
        };
        assert!(audio.normalize && audio.remove_silence && audio.reduce_noise);
        assert_eq!(audio.speed, 1.0);

        let Controls::Mesh(mesh) = Controls::defaults(MediaCategory::Mesh) else {
            panic!("expected mesh controls");
        };
        assert!(mesh.remove_duplicates && mesh.fix_normals && mesh.fill_holes);
    }

    #[test]
    fn test_image_resize_requires_both_dimensions() {
        let only_width = Controls::Image(ImageControls {
            resize_width: Some(400),
            ..ImageControls::default()
        });
        assert_eq!(
            names(&only_width.preprocess_params().unwrap()),
            ["grayscale", "normalize"]
        );

        let both = Controls::Image(ImageControls {
            resize_width: Some(400),
            resize_height: Some(300),
            grayscale: true,
            ..ImageControls::default()
        });
        let params = both.preprocess_params().unwrap();
        assert_eq!(
            names(&params),
            ["resize_width", "resize_height", "grayscale", "normalize"]
        );
        assert_eq!(params[0].1, ParamValue::Int(400));
        assert_eq!(params[2].1, ParamValue::Bool(true));
    }

    #[test]
    fn test_zero_resize_rejected() {
        let controls = Controls::Image(ImageControls {
            resize_width: Some(0),
            resize_height: Some(300),
            ..ImageControls::default()
        });
        assert!(matches!(
            controls.preprocess_params(),
            Err(ClientError::InvalidParameter { name: "resize_width", .. })
        ));
    }

    #[test]
    fn test_brightness_range() {
        let mut image = ImageControls {
            brightness: 1.0,
            ..ImageControls::default()
        };
        assert!(Controls::Image(image.clone()).augment_params().is_ok());

        image.brightness = 1.5;
        let err = Controls::Image(image.clone()).augment_params().unwrap_err();
        assert!(matches!(err, ClientError::InvalidParameter { name: "brightness", .. }));

        image.brightness = f64::NAN;
        assert!(Controls::Image(image).augment_params().is_err());
    }

    #[test]
    fn test_audio_augment_ranges() {
        let ok = Controls::Audio(AudioControls {
            speed: 1.5,
            pitch_shift: 4,
            ..AudioControls::default()
        });
        let params = ok.augment_params().unwrap();
        assert_eq!(params[0], ("speed", ParamValue::Float(1.5)));
        assert_eq!(params[1], ("pitch_shift", ParamValue::Int(4)));

        let slow = Controls::Audio(AudioControls {
            speed: 0.4,
            ..AudioControls::default()
        });
        assert!(matches!(
            slow.augment_params(),
            Err(ClientError::InvalidParameter { name: "speed", .. })
        ));

        let sharp = Controls::Audio(AudioControls {
            pitch_shift: 13,
            ..AudioControls::default()
        });
        assert!(matches!(
            sharp.augment_params(),
            Err(ClientError::InvalidParameter { name: "pitch_shift", .. })
        ));
    }

    #[test]
    fn test_text_and_mesh_augment_have_no_params() {
        assert!(Controls::Text.augment_params().unwrap().is_empty());
        assert!(Controls::defaults(MediaCategory::Mesh)
            .augment_params()
            .unwrap()
            .is_empty());
    }
}
