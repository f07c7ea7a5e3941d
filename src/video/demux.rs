/// JPEG start-of-image marker. Every frame in the producer's stream begins with
/// this two-byte sequence.
const FRAME_START: [u8; 2] = [0xff, 0xd8];
/// JPEG end-of-image marker.
const FRAME_END: [u8; 2] = [0xff, 0xd9];

/// Splits a raw stream of concatenated still-image frames into per-frame slices.
///
/// Scans forward for a start marker, then for the next end marker, and slices
/// the delimited range including both markers. A trailing start marker with no
/// matching end marker is dropped: the producer flushes whole frames, so a
/// dangling marker only occurs on a truncated tail.
pub(crate) fn split_frames(stream: &[u8]) -> Vec<&[u8]> {
    let mut frames = Vec::new();
    let mut cursor = 0;

    while cursor < stream.len() {
        let tail = &stream[cursor..];
        let start = match find_marker(tail, &FRAME_START) {
            Some(offset) => offset,
            None => break,
        };
        let end = match find_marker(&tail[start..], &FRAME_END) {
            Some(offset) => start + offset + FRAME_END.len(),
            None => break,
        };
        frames.push(&tail[start..end]);
        cursor += end;
    }

    frames
}

fn find_marker(haystack: &[u8], marker: &[u8; 2]) -> Option<usize> {
    haystack.windows(marker.len()).position(|w| w == marker)
}
