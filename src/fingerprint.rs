//! Perceptual fingerprints for image files.
//!
//! A fingerprint is a 64-bit DCT-based mean hash (pHash): visually similar
//! images produce hashes with small Hamming distance even across minor
//! recompression or resizing, while distinct images land far apart with high
//! probability.

use crate::error::{DecodeError, DecodeFailure};
use image::{DynamicImage, ImageReader};
use image_hasher::{HashAlg, Hasher, HasherConfig, ImageHash};
use std::path::Path;

/// Width of the fingerprint in bits.
pub const FINGERPRINT_BITS: u32 = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fingerprint(ImageHash);

impl Fingerprint {
    /// Hamming distance: number of differing bits.
    pub fn distance(&self, other: &Fingerprint) -> u32 {
        self.0.dist(&other.0)
    }

    pub fn to_base64(&self) -> String {
        self.0.to_base64()
    }

    /// Rebuild a fingerprint from its raw bytes (8 bytes for a 64-bit hash).
    pub fn from_bytes(bytes: &[u8]) -> Option<Fingerprint> {
        ImageHash::from_bytes(bytes).ok().map(Fingerprint)
    }
}

/// Computes fingerprints. One extractor is built per scan and shared across
/// worker threads; hashing has no mutable state.
pub struct FingerprintExtractor {
    hasher: Hasher,
}

impl FingerprintExtractor {
    pub fn new() -> Self {
        let hasher = HasherConfig::new()
            .hash_size(8, 8)
            .preproc_dct()
            .hash_alg(HashAlg::Mean)
            .to_hasher();
        Self { hasher }
    }

    /// Decode the file at `path` and fingerprint it.
    ///
    /// Failure means the file takes no part in grouping; callers must treat
    /// this as skip-and-continue, not scan termination.
    pub fn fingerprint_file(&self, path: &Path) -> Result<(DynamicImage, Fingerprint), DecodeError> {
        let image = decode(path)?;
        let fingerprint = self.fingerprint_image(&image);
        Ok((image, fingerprint))
    }

    pub fn fingerprint_image(&self, image: &DynamicImage) -> Fingerprint {
        Fingerprint(self.hasher.hash_image(image))
    }
}

impl Default for FingerprintExtractor {
    fn default() -> Self {
        Self::new()
    }
}

fn decode(path: &Path) -> Result<DynamicImage, DecodeError> {
    let wrap = |source: DecodeFailure| DecodeError {
        path: path.to_path_buf(),
        source,
    };
    let reader = ImageReader::open(path).map_err(|e| wrap(e.into()))?;
    reader.decode().map_err(|e| wrap(DecodeFailure::Image(e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;
    use std::fs;
    use tempfile::TempDir;

    fn gradient(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, _| {
            let v = (x * 255 / width.max(1)) as u8;
            image::Rgb([v, v, v])
        }))
    }

    fn checkerboard(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
            if (x / 8 + y / 8) % 2 == 0 {
                image::Rgb([255, 255, 255])
            } else {
                image::Rgb([0, 0, 0])
            }
        }))
    }

    #[test]
    fn self_distance_is_zero() {
        let extractor = FingerprintExtractor::new();
        let fp = extractor.fingerprint_image(&gradient(64, 64));
        assert_eq!(fp.distance(&fp), 0);
    }

    #[test]
    fn byte_identical_files_share_a_fingerprint() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("a.png");
        let b = dir.path().join("b.png");
        gradient(64, 64).save(&a).unwrap();
        fs::copy(&a, &b).unwrap();

        let extractor = FingerprintExtractor::new();
        let (_, fp_a) = extractor.fingerprint_file(&a).unwrap();
        let (_, fp_b) = extractor.fingerprint_file(&b).unwrap();
        assert_eq!(fp_a, fp_b);
        assert_eq!(fp_a.distance(&fp_b), 0);
    }

    #[test]
    fn structurally_different_images_differ() {
        let extractor = FingerprintExtractor::new();
        let a = extractor.fingerprint_image(&gradient(64, 64));
        let b = extractor.fingerprint_image(&checkerboard(64, 64));
        assert!(a.distance(&b) > 0);
    }

    #[test]
    fn distance_is_symmetric() {
        let extractor = FingerprintExtractor::new();
        let a = extractor.fingerprint_image(&gradient(64, 64));
        let b = extractor.fingerprint_image(&checkerboard(64, 64));
        assert_eq!(a.distance(&b), b.distance(&a));
    }

    #[test]
    fn corrupt_file_reports_decode_error() {
        let dir = TempDir::new().unwrap();
        let bad = dir.path().join("bad.jpg");
        fs::write(&bad, b"definitely not a jpeg").unwrap();

        let extractor = FingerprintExtractor::new();
        let err = extractor.fingerprint_file(&bad).unwrap_err();
        assert_eq!(err.path, bad);
    }

    #[test]
    fn missing_file_reports_decode_error() {
        let extractor = FingerprintExtractor::new();
        let err = extractor
            .fingerprint_file(Path::new("/nonexistent/photo.png"))
            .unwrap_err();
        assert!(matches!(err.source, DecodeFailure::Io(_)));
    }

    #[test]
    fn fingerprint_round_trips_through_bytes() {
        let fp = Fingerprint::from_bytes(&[0b1010_1010; 8]).unwrap();
        assert_eq!(fp.distance(&fp), 0);
        let other = Fingerprint::from_bytes(&[0b1010_1011; 8]).unwrap();
        assert_eq!(fp.distance(&other), 8);
    }
}
