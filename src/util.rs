use std::io::Read;
use std::path::Path;
use std::time::Duration;

/// Formats the given [Duration] as "MM:SSs"
pub fn format_time(t: Duration) -> String {
    let minutes = t.as_secs() / 60;
    let seconds = t.as_secs() % 60;
    format!("{:02}:{:02}s", minutes, seconds)
}

/// Checks if the given path points to a valid video file.
///
/// Only the file header is inspected. This is a very cheap operation, but it
/// does not guarantee that the full contents are decodable.
pub fn is_valid_video_file(path: impl AsRef<Path>) -> bool {
    let mut buf = [0u8; 8192];
    let mut f = match std::fs::File::open(path.as_ref()) {
        Ok(f) => f,
        Err(_) => return false,
    };
    let n = match f.read(&mut buf) {
        Ok(n) => n,
        Err(_) => return false,
    };
    infer::is_video(&buf[..n])
}
