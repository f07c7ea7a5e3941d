use std::path::{Path, PathBuf};

use crate::Result;

use super::data::Scene;

/// Renders a [Scene] as an EDL cut line.
///
/// The single line marks `[start, end]` as a skippable segment using action code
/// 3 (commercial break), which players like Kodi and mpv act on when the file
/// sits next to the video.
pub fn edl(scene: &Scene) -> String {
    format!(
        "{:.2} {:.2} 3\n",
        scene.start.as_secs_f32(),
        scene.end.as_secs_f32()
    )
}

/// Renders a [Scene] as an M3U playlist that plays around the detected segment.
///
/// VLC start/stop options split playback into a pre-intro entry (omitted when
/// the segment starts the file) and a post-intro entry. Offsets are truncated to
/// whole seconds here since the VLC options take integers.
pub fn m3u(scene: &Scene, video: &Path) -> String {
    let name = video
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| video.display().to_string());
    let start = scene.start.as_secs();
    let end = scene.end.as_secs();

    let mut out = String::from("#EXTM3U\n");
    if start > 0 {
        out.push_str(&format!(
            "#EXTVLCOPT:start-time=0\n#EXTVLCOPT:stop-time={}\n#EXTINF:,Pre-intro\n{}\n",
            start, name
        ));
    }
    out.push_str(&format!(
        "#EXTVLCOPT:start-time={}\n#EXTINF:,Post-intro\n{}\n",
        end, name
    ));
    out
}

/// Writes the EDL marker next to the video, returning the marker path.
pub fn write_edl(video: impl AsRef<Path>, scene: &Scene) -> Result<PathBuf> {
    let path = video.as_ref().with_extension("edl");
    std::fs::write(&path, edl(scene))?;
    Ok(path)
}

/// Writes the M3U playlist next to the video, returning the playlist path.
pub fn write_m3u(video: impl AsRef<Path>, scene: &Scene) -> Result<PathBuf> {
    let video = video.as_ref();
    let path = video.with_extension("m3u");
    std::fs::write(&path, m3u(scene, video))?;
    Ok(path)
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use super::*;
    use crate::video::data::{Similarity, SimilarityMatrix};

    fn scene(start: Duration, end: Duration) -> Scene {
        Scene {
            start,
            end,
            similarity: Similarity {
                matrix: SimilarityMatrix::from_cells(1, 1, vec![true]),
                start_index: 0,
                end_index: 1,
            },
        }
    }

    #[test]
    fn test_edl_line() {
        let s = scene(Duration::from_secs(5), Duration::from_secs(8));
        assert_eq!(edl(&s), "5.00 8.00 3\n");
    }

    #[test]
    fn test_edl_keeps_subsecond_precision() {
        let s = scene(Duration::from_millis(5250), Duration::from_millis(8750));
        assert_eq!(edl(&s), "5.25 8.75 3\n");
    }

    #[test]
    fn test_m3u_with_leading_content() {
        let s = scene(Duration::from_millis(5900), Duration::from_secs(90));
        let out = m3u(&s, Path::new("/videos/episode-2.mkv"));
        assert_eq!(
            out,
            "#EXTM3U\n\
             #EXTVLCOPT:start-time=0\n\
             #EXTVLCOPT:stop-time=5\n\
             #EXTINF:,Pre-intro\n\
             episode-2.mkv\n\
             #EXTVLCOPT:start-time=90\n\
             #EXTINF:,Post-intro\n\
             episode-2.mkv\n"
        );
    }

    #[test]
    fn test_m3u_when_intro_starts_the_file() {
        let s = scene(Duration::from_millis(400), Duration::from_secs(30));
        let out = m3u(&s, Path::new("episode-2.mkv"));
        assert_eq!(
            out,
            "#EXTM3U\n\
             #EXTVLCOPT:start-time=30\n\
             #EXTINF:,Post-intro\n\
             episode-2.mkv\n"
        );
    }
}
