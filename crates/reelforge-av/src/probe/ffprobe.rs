//! FFprobe-based metadata probing.

use crate::command::ToolCommand;
use crate::{Error, Result};
use reelforge_common::VideoMetadata;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    format: FfprobeFormat,
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    format_name: String,
    duration: Option<String>,
    size: Option<String>,
    bit_rate: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: String,
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    duration: Option<String>,
}

/// Probe a media file using ffprobe.
pub async fn probe_with_ffprobe(
    ffprobe: &Path,
    path: &Path,
    timeout: Option<Duration>,
) -> Result<VideoMetadata> {
    if !path.exists() {
        return Err(Error::file_not_found(path));
    }

    let output = ToolCommand::new(ffprobe.to_path_buf())
        .args([
            "-v",
            "quiet",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
        ])
        .path_arg(path)
        .timeout(timeout)
        .execute()
        .await?;

    parse_ffprobe_json(&output.stdout)
}

/// Parse the JSON document printed by `ffprobe -show_format -show_streams`.
pub fn parse_ffprobe_json(json: &str) -> Result<VideoMetadata> {
    let output: FfprobeOutput = serde_json::from_str(json)?;

    let video = output
        .streams
        .iter()
        .find(|s| s.codec_type == "video")
        .ok_or_else(|| Error::parse_error("ffprobe", "no video stream"))?;
    let audio = output.streams.iter().find(|s| s.codec_type == "audio");

    // Some containers only report duration per stream.
    let duration_seconds = output
        .format
        .duration
        .as_deref()
        .or(video.duration.as_deref())
        .and_then(|s| s.parse::<f64>().ok())
        .ok_or_else(|| Error::parse_error("ffprobe", "missing duration"))?;

    Ok(VideoMetadata {
        duration_seconds,
        width: video.width.unwrap_or(0),
        height: video.height.unwrap_or(0),
        frame_rate: video.r_frame_rate.as_deref().and_then(parse_frame_rate),
        video_codec: video.codec_name.clone(),
        audio_codec: audio.and_then(|a| a.codec_name.clone()),
        size_bytes: output
            .format
            .size
            .and_then(|s| s.parse().ok())
            .unwrap_or(0),
        bit_rate: output.format.bit_rate.and_then(|s| s.parse().ok()),
        format_name: output.format.format_name,
    })
}

fn parse_frame_rate(rate_str: &str) -> Option<f64> {
    let parts: Vec<&str> = rate_str.split('/').collect();
    if parts.len() == 2 {
        let num: f64 = parts[0].parse().ok()?;
        let den: f64 = parts[1].parse().ok()?;
        if den != 0.0 {
            return Some(num / den);
        }
        return None;
    }
    rate_str.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "streams": [
            {"index": 0, "codec_type": "video", "codec_name": "h264",
             "width": 1920, "height": 1080, "r_frame_rate": "30000/1001"},
            {"index": 1, "codec_type": "audio", "codec_name": "aac"}
        ],
        "format": {
            "filename": "out.mp4",
            "format_name": "mov,mp4,m4a,3gp,3g2,mj2",
            "duration": "12.480000",
            "size": "5242880",
            "bit_rate": "3360000"
        }
    }"#;

    #[test]
    fn test_parse_full_output() {
        let meta = parse_ffprobe_json(SAMPLE).unwrap();
        assert!((meta.duration_seconds - 12.48).abs() < 1e-9);
        assert_eq!(meta.width, 1920);
        assert_eq!(meta.height, 1080);
        assert_eq!(meta.video_codec.as_deref(), Some("h264"));
        assert_eq!(meta.audio_codec.as_deref(), Some("aac"));
        assert_eq!(meta.size_bytes, 5_242_880);
        assert_eq!(meta.bit_rate, Some(3_360_000));
        assert!(meta.has_audio());
        let fps = meta.frame_rate.unwrap();
        assert!((fps - 29.97).abs() < 0.01);
    }

    #[test]
    fn test_parse_silent_clip_with_stream_duration() {
        let json = r#"{
            "streams": [{"codec_type": "video", "codec_name": "vp9",
                         "width": 640, "height": 360, "duration": "3.5"}],
            "format": {"format_name": "webm"}
        }"#;
        let meta = parse_ffprobe_json(json).unwrap();
        assert!((meta.duration_seconds - 3.5).abs() < f64::EPSILON);
        assert!(!meta.has_audio());
        assert_eq!(meta.size_bytes, 0);
    }

    #[test]
    fn test_parse_rejects_audio_only() {
        let json = r#"{
            "streams": [{"codec_type": "audio", "codec_name": "mp3"}],
            "format": {"format_name": "mp3", "duration": "1.0"}
        }"#;
        assert!(matches!(
            parse_ffprobe_json(json),
            Err(Error::ParseError { .. })
        ));
    }

    #[test]
    fn test_parse_frame_rate() {
        assert_eq!(parse_frame_rate("30/1"), Some(30.0));
        assert_eq!(parse_frame_rate("25"), Some(25.0));
        assert_eq!(parse_frame_rate("0/0"), None);
        assert_eq!(parse_frame_rate("invalid"), None);
    }

    #[tokio::test]
    async fn test_probe_missing_file() {
        let result = probe_with_ffprobe(
            Path::new("ffprobe"),
            Path::new("/nonexistent/clip.mp4"),
            None,
        )
        .await;
        assert!(matches!(result, Err(Error::FileNotFound { .. })));
    }
}
