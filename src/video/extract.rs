use std::ffi::OsString;
use std::path::Path;
use std::process::Command;
use std::time::Duration;

use serde::Deserialize;

use crate::{Error, Result};

use super::hash::HashVariant;

/// Invokes the external `ffmpeg` frame producer.
///
/// Frames are sampled at a fixed rate, pre-scaled to the resolution the selected
/// hash variant requires, and emitted on stdout as one stream of concatenated
/// JPEG images for the demuxer to split.
#[derive(Clone, Copy, Debug)]
pub struct Extractor {
    variant: HashVariant,
    fps: u32,
}

impl Extractor {
    pub fn new(variant: HashVariant, fps: u32) -> Self {
        Self { variant, fps }
    }

    /// Extracts `window` of frames starting at `start` from the given video.
    ///
    /// Returns the raw concatenated frame stream. A failing producer is reported
    /// with its trimmed stderr output.
    pub fn extract(
        &self,
        path: impl AsRef<Path>,
        start: Duration,
        window: Duration,
    ) -> Result<Vec<u8>> {
        let args = self.ffmpeg_args(path.as_ref(), start, window);
        tracing::debug!(
            "running: ffmpeg {}",
            args.iter()
                .map(|a| a.to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join(" ")
        );

        let output = Command::new("ffmpeg").args(&args).output()?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::ExtractionFailed(stderr.trim().to_string()));
        }

        Ok(output.stdout)
    }

    fn ffmpeg_args(&self, path: &Path, start: Duration, window: Duration) -> Vec<OsString> {
        let (width, height) = self.variant.sampling_resolution();
        vec![
            "-hide_banner".into(),
            "-loglevel".into(),
            "error".into(),
            "-ss".into(),
            format!("{}", start.as_secs_f32()).into(),
            "-i".into(),
            path.as_os_str().to_owned(),
            // Video only, re-encoded to MJPEG so every frame is self-delimiting.
            "-an".into(),
            "-c:v".into(),
            "mjpeg".into(),
            "-f".into(),
            "image2pipe".into(),
            "-vf".into(),
            format!("fps={},scale={}:{}", self.fps, width, height).into(),
            "-pix_fmt".into(),
            "yuvj422p".into(),
            "-q".into(),
            "1".into(),
            "-t".into(),
            format!("{}", window.as_secs_f32()).into(),
            "pipe:1".into(),
        ]
    }
}

/// Video stream properties reported by `ffprobe`.
#[derive(Clone, Debug, Deserialize)]
pub struct Metadata {
    pub width: u32,
    pub height: u32,
    #[serde(rename = "pix_fmt")]
    pub pixel_format: String,
    #[serde(rename = "r_frame_rate", deserialize_with = "frame_rate_from_ratio")]
    pub frame_rate: f64,
    #[serde(deserialize_with = "duration_from_secs")]
    pub duration: Duration,
}

impl Metadata {
    /// Probes the first video stream of the given file.
    pub fn probe(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let output = Command::new("ffprobe")
            .args([
                "-v",
                "error",
                "-of",
                "json",
                "-select_streams",
                "v:0",
                "-show_entries",
                "stream=width,height,pix_fmt,r_frame_rate,duration",
            ])
            .arg(path)
            .output()?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::ExtractionFailed(stderr.trim().to_string()));
        }

        #[derive(Deserialize)]
        struct ProbeOutput {
            #[serde(default)]
            streams: Vec<Metadata>,
        }

        let parsed: ProbeOutput = serde_json::from_slice(&output.stdout)?;
        parsed
            .streams
            .into_iter()
            .next()
            .ok_or_else(|| Error::MissingVideoStream(path.to_owned()))
    }
}

fn frame_rate_from_ratio<'de, D>(deserializer: D) -> std::result::Result<f64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error as _;

    let raw = String::deserialize(deserializer)?;
    let (num, den) = raw
        .split_once('/')
        .ok_or_else(|| D::Error::custom(format!("frame rate is not a ratio: {}", raw)))?;
    let num: f64 = num.parse().map_err(D::Error::custom)?;
    let den: f64 = den.parse().map_err(D::Error::custom)?;
    if den == 0.0 {
        return Err(D::Error::custom("frame rate denominator is zero"));
    }
    Ok(num / den)
}

fn duration_from_secs<'de, D>(deserializer: D) -> std::result::Result<Duration, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error as _;

    let raw = String::deserialize(deserializer)?;
    let secs: f64 = raw.parse().map_err(D::Error::custom)?;
    Ok(Duration::from_secs_f64(secs))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_ffmpeg_args_follow_variant_resolution() {
        let extractor = Extractor::new(HashVariant::Difference, 3);
        let args = extractor.ffmpeg_args(
            Path::new("episode.mkv"),
            Duration::ZERO,
            Duration::from_secs(20),
        );

        let args: Vec<String> = args
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert!(args.contains(&"image2pipe".to_string()));
        assert!(args.contains(&"fps=3,scale=9:8".to_string()));
        assert!(args.contains(&"episode.mkv".to_string()));
        assert_eq!(args.last().unwrap(), "pipe:1");

        let extractor = Extractor::new(HashVariant::Perceptual, 2);
        let args = extractor.ffmpeg_args(
            Path::new("episode.mkv"),
            Duration::ZERO,
            Duration::from_secs(20),
        );
        assert!(args
            .iter()
            .any(|a| a.to_string_lossy() == "fps=2,scale=32:32"));
    }

    #[test]
    fn test_metadata_parses_ffprobe_output() {
        let raw = r#"{
            "streams": [
                {
                    "width": 1920,
                    "height": 1080,
                    "pix_fmt": "yuv420p",
                    "r_frame_rate": "30000/1001",
                    "duration": "1320.480000"
                }
            ]
        }"#;

        #[derive(Deserialize)]
        struct ProbeOutput {
            streams: Vec<Metadata>,
        }

        let parsed: ProbeOutput = serde_json::from_str(raw).unwrap();
        let meta = &parsed.streams[0];
        assert_eq!(meta.width, 1920);
        assert_eq!(meta.height, 1080);
        assert_eq!(meta.pixel_format, "yuv420p");
        assert!((meta.frame_rate - 29.97).abs() < 0.01);
        assert_eq!(meta.duration, Duration::from_secs_f64(1320.48));
    }

    #[test]
    fn test_metadata_rejects_malformed_frame_rate() {
        let raw = r#"{
            "width": 1280,
            "height": 720,
            "pix_fmt": "yuv420p",
            "r_frame_rate": "not-a-ratio",
            "duration": "60.0"
        }"#;
        assert!(serde_json::from_str::<Metadata>(raw).is_err());

        let raw = r#"{
            "width": 1280,
            "height": 720,
            "pix_fmt": "yuv420p",
            "r_frame_rate": "25/0",
            "duration": "60.0"
        }"#;
        assert!(serde_json::from_str::<Metadata>(raw).is_err());
    }
}
