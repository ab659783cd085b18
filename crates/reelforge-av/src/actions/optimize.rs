//! Platform-specific transcoding.

use super::{require_input, require_output};
use crate::toolchain::FfmpegToolchain;
use crate::{Error, Result};
use reelforge_common::Platform;
use std::path::{Path, PathBuf};

/// Frame size and bitrates targeted for a platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlatformProfile {
    pub width: u32,
    pub height: u32,
    pub video_kbps: u32,
    pub audio_kbps: u32,
}

/// Encoding profile for `platform`, or `None` when optimization is off.
pub fn profile_for(platform: Platform) -> Option<PlatformProfile> {
    match platform {
        Platform::Tiktok => Some(PlatformProfile {
            width: 1080,
            height: 1920,
            video_kbps: 6000,
            audio_kbps: 128,
        }),
        Platform::Instagram => Some(PlatformProfile {
            width: 1080,
            height: 1080,
            video_kbps: 5000,
            audio_kbps: 128,
        }),
        Platform::Youtube => Some(PlatformProfile {
            width: 1920,
            height: 1080,
            video_kbps: 8000,
            audio_kbps: 192,
        }),
        Platform::None => None,
    }
}

impl PlatformProfile {
    /// Letterbox into the target frame without distorting the source.
    pub fn video_filter(&self) -> String {
        let (w, h) = (self.width, self.height);
        format!(
            "scale={w}:{h}:force_original_aspect_ratio=decrease,\
             pad={w}:{h}:(ow-iw)/2:(oh-ih)/2:color=black,setsar=1"
        )
    }

    fn encoder_args(&self) -> Vec<String> {
        vec![
            "-c:v".into(),
            "libx264".into(),
            "-preset".into(),
            "medium".into(),
            "-pix_fmt".into(),
            "yuv420p".into(),
            "-b:v".into(),
            format!("{}k", self.video_kbps),
            "-maxrate".into(),
            format!("{}k", self.video_kbps),
            "-bufsize".into(),
            format!("{}k", self.video_kbps * 2),
            "-c:a".into(),
            "aac".into(),
            "-b:a".into(),
            format!("{}k", self.audio_kbps),
            "-movflags".into(),
            "+faststart".into(),
        ]
    }
}

/// Transcode `input` to the profile of `platform`.
pub async fn optimize_for_platform(
    tools: &FfmpegToolchain,
    input: &Path,
    output: &Path,
    platform: Platform,
) -> Result<PathBuf> {
    let profile = profile_for(platform)
        .ok_or_else(|| Error::InvalidInput(format!("no encoding profile for {platform}")))?;
    require_input(input)?;

    #[cfg(feature = "tracing")]
    tracing::info!("Optimizing {:?} for {}", input, platform);

    tools
        .ffmpeg()
        .arg("-i")
        .path_arg(input)
        .arg("-vf")
        .arg(profile.video_filter())
        .args(profile.encoder_args())
        .path_arg(output)
        .execute()
        .await?;

    require_output(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profiles() {
        let tiktok = profile_for(Platform::Tiktok).unwrap();
        assert_eq!((tiktok.width, tiktok.height), (1080, 1920));
        assert_eq!(tiktok.video_kbps, 6000);

        let instagram = profile_for(Platform::Instagram).unwrap();
        assert_eq!((instagram.width, instagram.height), (1080, 1080));

        let youtube = profile_for(Platform::Youtube).unwrap();
        assert_eq!(youtube.audio_kbps, 192);

        assert!(profile_for(Platform::None).is_none());
    }

    #[test]
    fn test_video_filter() {
        let filter = profile_for(Platform::Instagram).unwrap().video_filter();
        assert_eq!(
            filter,
            "scale=1080:1080:force_original_aspect_ratio=decrease,\
             pad=1080:1080:(ow-iw)/2:(oh-ih)/2:color=black,setsar=1"
        );
    }

    #[test]
    fn test_encoder_args_carry_bitrates() {
        let args = profile_for(Platform::Youtube).unwrap().encoder_args();
        let joined = args.join(" ");
        assert!(joined.contains("-b:v 8000k"));
        assert!(joined.contains("-bufsize 16000k"));
        assert!(joined.contains("-b:a 192k"));
        assert!(joined.ends_with("-movflags +faststart"));
    }

    #[tokio::test]
    async fn test_none_platform_rejected() {
        let tools = FfmpegToolchain::with_paths("ffmpeg", "ffprobe");
        let p = Path::new("a.mp4");
        let err = optimize_for_platform(&tools, p, p, Platform::None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }
}
