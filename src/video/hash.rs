use image_hasher::{HashAlg, HasherConfig};

use super::data::FrameHash;

/// Perceptual hash algorithm selection.
///
/// Each variant implies the frame resolution the producer must pre-scale sampled
/// frames to before they are hashed; see [HashVariant::sampling_resolution].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum HashVariant {
    /// Difference hash: compares neighboring pixels along each row. Fast and
    /// robust against scaling, the default.
    Difference,
    /// Average hash: compares each pixel against the frame mean. Fastest, least
    /// precise.
    Average,
    /// Perceptual hash: DCT-based, most tolerant to small edits at the cost of
    /// compute.
    Perceptual,
}

impl HashVariant {
    /// The frame resolution (width, height) this variant expects its input at.
    pub fn sampling_resolution(&self) -> (u32, u32) {
        match self {
            HashVariant::Difference => (9, 8),
            HashVariant::Average => (8, 8),
            HashVariant::Perceptual => (32, 32),
        }
    }

    fn hasher(&self) -> image_hasher::Hasher {
        let config = HasherConfig::new().hash_size(8, 8);
        match self {
            HashVariant::Difference => config.hash_alg(HashAlg::Gradient),
            HashVariant::Average => config.hash_alg(HashAlg::Mean),
            HashVariant::Perceptual => config.hash_alg(HashAlg::Mean).preproc_dct(),
        }
        .to_hasher()
    }
}

/// Raised when a decoded frame does not match the resolution the selected hash
/// variant requires.
#[derive(thiserror::Error, Debug)]
#[error("frame is {actual_width}x{actual_height}, expected {expected_width}x{expected_height}")]
pub struct FrameRejected {
    pub expected_width: u32,
    pub expected_height: u32,
    pub actual_width: u32,
    pub actual_height: u32,
}

/// Computes fixed-length perceptual hashes for decoded frames.
///
/// Frames are expected pre-scaled to the variant's sampling resolution; anything
/// else is rejected rather than silently rescaled, since a resolution mismatch
/// means the producer was configured for a different variant.
#[derive(Clone, Copy, Debug)]
pub struct FrameHasher {
    variant: HashVariant,
}

impl FrameHasher {
    pub fn new(variant: HashVariant) -> Self {
        Self { variant }
    }

    pub fn variant(&self) -> HashVariant {
        self.variant
    }

    pub fn hash(
        &self,
        image: &image::DynamicImage,
    ) -> std::result::Result<FrameHash, FrameRejected> {
        use image::GenericImageView;

        let (expected_width, expected_height) = self.variant.sampling_resolution();
        let (actual_width, actual_height) = image.dimensions();
        if (actual_width, actual_height) != (expected_width, expected_height) {
            return Err(FrameRejected {
                expected_width,
                expected_height,
                actual_width,
                actual_height,
            });
        }

        let hash = self.variant.hasher().hash_image(image);
        Ok(FrameHash::new(hash.as_bytes().to_vec()))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn gray_frame(width: u32, height: u32) -> image::DynamicImage {
        let buf = image::GrayImage::from_fn(width, height, |x, y| {
            image::Luma([((x * 31 + y * 17) % 256) as u8])
        });
        image::DynamicImage::ImageLuma8(buf)
    }

    #[test]
    fn test_hash_is_deterministic() {
        let hasher = FrameHasher::new(HashVariant::Difference);
        let frame = gray_frame(9, 8);
        assert_eq!(hasher.hash(&frame).unwrap(), hasher.hash(&frame).unwrap());
    }

    #[test]
    fn test_variants_expect_their_resolution() {
        for variant in [
            HashVariant::Difference,
            HashVariant::Average,
            HashVariant::Perceptual,
        ] {
            let hasher = FrameHasher::new(variant);
            let (width, height) = variant.sampling_resolution();
            assert!(hasher.hash(&gray_frame(width, height)).is_ok());
        }
    }

    #[test]
    fn test_wrong_resolution_is_rejected() {
        let hasher = FrameHasher::new(HashVariant::Difference);
        let err = hasher.hash(&gray_frame(4, 4)).unwrap_err();
        assert_eq!((err.expected_width, err.expected_height), (9, 8));
        assert_eq!((err.actual_width, err.actual_height), (4, 4));
    }

    #[test]
    fn test_similar_frames_hash_close() {
        let hasher = FrameHasher::new(HashVariant::Difference);
        let base = gray_frame(9, 8);
        let mut tweaked = base.to_luma8();
        tweaked.put_pixel(0, 0, image::Luma([255]));
        let tweaked = image::DynamicImage::ImageLuma8(tweaked);

        let d = hasher
            .hash(&base)
            .unwrap()
            .distance(&hasher.hash(&tweaked).unwrap())
            .unwrap();
        assert!(d <= 8, "single-pixel change moved {} bits", d);
    }
}
