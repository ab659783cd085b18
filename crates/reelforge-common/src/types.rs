//! Core type definitions for assembly jobs and their options.
//!
//! All enums serialize in lowercase, matching the values accepted on the
//! command line and stored in the database.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle state of an assembly job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Created, waiting for its task to begin.
    Queued,
    /// Stages are running.
    Processing,
    /// Output artifact is available.
    Completed,
    /// No viable artifact could be produced.
    Failed,
}

impl JobStatus {
    /// Whether the job can still change.
    pub fn is_live(&self) -> bool {
        matches!(self, Self::Queued | Self::Processing)
    }

    /// Whether the job reached an absorbing state.
    pub fn is_terminal(&self) -> bool {
        !self.is_live()
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Queued => write!(f, "queued"),
            Self::Processing => write!(f, "processing"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

impl FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "queued" => Ok(Self::Queued),
            "processing" => Ok(Self::Processing),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            _ => Err(format!("Invalid job status: {}", s)),
        }
    }
}

/// Visual style used when joining two segments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransitionType {
    #[default]
    Fade,
    Wipe,
    Dissolve,
    SlideDown,
    SlideUp,
}

impl fmt::Display for TransitionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fade => write!(f, "fade"),
            Self::Wipe => write!(f, "wipe"),
            Self::Dissolve => write!(f, "dissolve"),
            Self::SlideDown => write!(f, "slidedown"),
            Self::SlideUp => write!(f, "slideup"),
        }
    }
}

impl FromStr for TransitionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fade" => Ok(Self::Fade),
            "wipe" => Ok(Self::Wipe),
            "dissolve" => Ok(Self::Dissolve),
            "slidedown" => Ok(Self::SlideDown),
            "slideup" => Ok(Self::SlideUp),
            _ => Err(format!("Unknown transition type: {}", s)),
        }
    }
}

/// Vertical placement of caption overlays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptionPosition {
    Top,
    Center,
    #[default]
    Bottom,
}

impl fmt::Display for CaptionPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Top => write!(f, "top"),
            Self::Center => write!(f, "center"),
            Self::Bottom => write!(f, "bottom"),
        }
    }
}

impl FromStr for CaptionPosition {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "top" => Ok(Self::Top),
            "center" | "middle" => Ok(Self::Center),
            "bottom" => Ok(Self::Bottom),
            _ => Err(format!("Unknown caption position: {}", s)),
        }
    }
}

/// Distribution platform the final artifact is tuned for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Tiktok,
    Instagram,
    #[default]
    Youtube,
    /// Skip the optimization stage.
    None,
}

impl Platform {
    /// Whether the optimization stage should run for this target.
    pub fn is_enabled(&self) -> bool {
        !matches!(self, Self::None)
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tiktok => write!(f, "tiktok"),
            Self::Instagram => write!(f, "instagram"),
            Self::Youtube => write!(f, "youtube"),
            Self::None => write!(f, "none"),
        }
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "tiktok" => Ok(Self::Tiktok),
            "instagram" => Ok(Self::Instagram),
            "youtube" => Ok(Self::Youtube),
            "" | "none" => Ok(Self::None),
            _ => Err(format!("Unknown platform: {}", s)),
        }
    }
}

/// Fully-resolved assembly options carried by every job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssemblyOptions {
    pub add_transitions: bool,
    pub transition_type: TransitionType,
    /// Transition length in seconds.
    pub transition_duration: f64,
    pub add_captions: bool,
    pub caption_position: CaptionPosition,
    pub caption_font_size: u32,
    pub optimize_platform: Platform,
}

impl Default for AssemblyOptions {
    fn default() -> Self {
        Self {
            add_transitions: true,
            transition_type: TransitionType::Fade,
            transition_duration: 0.8,
            add_captions: true,
            caption_position: CaptionPosition::Bottom,
            caption_font_size: 48,
            optimize_platform: Platform::Youtube,
        }
    }
}

impl AssemblyOptions {
    /// Check values that serde cannot rule out on its own.
    pub fn validate(&self) -> Result<(), String> {
        if !self.transition_duration.is_finite() || self.transition_duration <= 0.0 {
            return Err(format!(
                "transition_duration must be a positive number of seconds, got {}",
                self.transition_duration
            ));
        }
        if self.caption_font_size == 0 {
            return Err("caption_font_size must be greater than zero".to_string());
        }
        Ok(())
    }
}

/// Options as submitted by a caller; unset fields take defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssemblyRequestOptions {
    pub add_transitions: Option<bool>,
    pub transition_type: Option<TransitionType>,
    pub transition_duration: Option<f64>,
    pub add_captions: Option<bool>,
    pub caption_position: Option<CaptionPosition>,
    pub caption_font_size: Option<u32>,
    pub optimize_platform: Option<Platform>,
}

impl AssemblyRequestOptions {
    /// Apply the built-in defaults to every unset field.
    pub fn resolve(&self) -> AssemblyOptions {
        self.resolve_over(&AssemblyOptions::default())
    }

    /// Apply `base` to every unset field.
    pub fn resolve_over(&self, base: &AssemblyOptions) -> AssemblyOptions {
        AssemblyOptions {
            add_transitions: self.add_transitions.unwrap_or(base.add_transitions),
            transition_type: self.transition_type.unwrap_or(base.transition_type),
            transition_duration: self.transition_duration.unwrap_or(base.transition_duration),
            add_captions: self.add_captions.unwrap_or(base.add_captions),
            caption_position: self.caption_position.unwrap_or(base.caption_position),
            caption_font_size: self.caption_font_size.unwrap_or(base.caption_font_size),
            optimize_platform: self.optimize_platform.unwrap_or(base.optimize_platform),
        }
    }
}

/// Technical properties of a probed video artifact.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct VideoMetadata {
    pub duration_seconds: f64,
    pub width: u32,
    pub height: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame_rate: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_codec: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_codec: Option<String>,
    pub size_bytes: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bit_rate: Option<u64>,
    pub format_name: String,
}

impl VideoMetadata {
    /// Whether the artifact carries an audio stream.
    pub fn has_audio(&self) -> bool {
        self.audio_codec.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_status_display_and_parse() {
        for status in [
            JobStatus::Queued,
            JobStatus::Processing,
            JobStatus::Completed,
            JobStatus::Failed,
        ] {
            assert_eq!(status.to_string().parse::<JobStatus>().unwrap(), status);
        }
        assert!("cancelled".parse::<JobStatus>().is_err());
    }

    #[test]
    fn test_job_status_liveness() {
        assert!(JobStatus::Queued.is_live());
        assert!(JobStatus::Processing.is_live());
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
    }

    #[test]
    fn test_transition_type_serde() {
        let json = serde_json::to_string(&TransitionType::SlideDown).unwrap();
        assert_eq!(json, "\"slidedown\"");
        let parsed: TransitionType = serde_json::from_str("\"wipe\"").unwrap();
        assert_eq!(parsed, TransitionType::Wipe);
        assert_eq!("SlideUp".parse::<TransitionType>().unwrap(), TransitionType::SlideUp);
        assert!("spin".parse::<TransitionType>().is_err());
    }

    #[test]
    fn test_platform_parse() {
        assert_eq!("tiktok".parse::<Platform>().unwrap(), Platform::Tiktok);
        assert_eq!("none".parse::<Platform>().unwrap(), Platform::None);
        assert_eq!("".parse::<Platform>().unwrap(), Platform::None);
        assert!(!Platform::None.is_enabled());
        assert!(Platform::Youtube.is_enabled());
        assert!("vimeo".parse::<Platform>().is_err());
    }

    #[test]
    fn test_caption_position_parse() {
        assert_eq!("middle".parse::<CaptionPosition>().unwrap(), CaptionPosition::Center);
        assert_eq!(CaptionPosition::default(), CaptionPosition::Bottom);
    }

    #[test]
    fn test_default_options() {
        let options = AssemblyOptions::default();
        assert!(options.add_transitions);
        assert_eq!(options.transition_type, TransitionType::Fade);
        assert!((options.transition_duration - 0.8).abs() < f64::EPSILON);
        assert!(options.add_captions);
        assert_eq!(options.caption_position, CaptionPosition::Bottom);
        assert_eq!(options.caption_font_size, 48);
        assert_eq!(options.optimize_platform, Platform::Youtube);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_request_options_resolve_partial() {
        let request: AssemblyRequestOptions =
            serde_json::from_str(r#"{"add_transitions": false, "optimize_platform": "none"}"#)
                .unwrap();
        let options = request.resolve();
        assert!(!options.add_transitions);
        assert_eq!(options.optimize_platform, Platform::None);
        assert_eq!(options.caption_font_size, 48);
    }

    #[test]
    fn test_options_validation() {
        let mut options = AssemblyOptions::default();
        options.transition_duration = 0.0;
        assert!(options.validate().is_err());

        options.transition_duration = f64::NAN;
        assert!(options.validate().is_err());

        let mut options = AssemblyOptions::default();
        options.caption_font_size = 0;
        assert!(options.validate().is_err());
    }
}
