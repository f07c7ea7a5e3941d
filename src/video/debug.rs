use std::path::Path;

use crate::Result;

use super::data::SimilarityMatrix;

const CHECKER: image::Rgba<u8> = image::Rgba([0xaa, 0xaa, 0xaa, 0xaa]);
const WHITE: image::Rgba<u8> = image::Rgba([0xff, 0xff, 0xff, 0xff]);
const LINE_5S: image::Rgba<u8> = image::Rgba([0xff, 0xae, 0x98, 0xff]);
const LINE_30S: image::Rgba<u8> = image::Rgba([0x98, 0xbc, 0xff, 0xff]);
const SIMILAR: image::Rgba<u8> = image::Rgba([0xa4, 0x1c, 0xaf, 0xff]);

/// Renders the similarity grid as a bitmap for visual inspection.
///
/// Source frames run along the x axis, target frames along the y axis. A
/// checkerboard backs the grid, gridlines mark 5 s and 30 s multiples of the
/// sampling rate, and similar cells are painted on top. A shared segment shows
/// up as a diagonal streak.
pub fn render_matrix(matrix: &SimilarityMatrix, fps: u32) -> image::RgbaImage {
    let fps = fps.max(1) as usize;
    let mut img = image::RgbaImage::new(matrix.rows() as u32, matrix.cols() as u32);

    for row in 0..matrix.rows() {
        for col in 0..matrix.cols() {
            let mut pixel = if (row + col) % 2 == 0 { CHECKER } else { WHITE };
            if row % (5 * fps) == 0 || col % (5 * fps) == 0 {
                pixel = LINE_5S;
            }
            if row % (30 * fps) == 0 || col % (30 * fps) == 0 {
                pixel = LINE_30S;
            }
            if matrix.get(row, col) {
                pixel = SIMILAR;
            }
            img.put_pixel(row as u32, col as u32, pixel);
        }
    }

    img
}

/// Renders the similarity grid and writes it to `path` as a PNG.
pub fn write_matrix_image(
    path: impl AsRef<Path>,
    matrix: &SimilarityMatrix,
    fps: u32,
) -> Result<()> {
    let img = render_matrix(matrix, fps);
    img.save_with_format(path.as_ref(), image::ImageFormat::Png)?;
    Ok(())
}
