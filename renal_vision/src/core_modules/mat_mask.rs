// THEORY:
// MAT mask extraction turns the first image-shaped array of a MATLAB file into an
// 8-bit greyscale mask. It must never block the pipeline on a malformed scientific
// file, so every failure ends in a freshly generated random mask instead of an
// error. The random mask is an explicit `Outcome::Fallback`, never stale data.
//
// What `variables` holds in each case:
// 1.  **Loaded**: every non-metadata variable name, in file order.
// 2.  **Loaded, nothing usable**: still every non-metadata name; the container was
//     readable, the caller should see what it contained.
// 3.  **Unreadable**: empty; nothing was discovered.

use std::path::Path;

use image::{GrayImage, Luma};
use rand::Rng;
use tracing::warn;

use crate::core_modules::mat_file::{MAX_INFLATED_LEN, MatContainer, MatVariable};
use crate::core_modules::outcome::{FallbackReason, Outcome};
use crate::errors::VisionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractConfig {
    /// Width of the random mask produced when a file cannot be used.
    pub width: u32,
    /// Height of the random mask produced when a file cannot be used.
    pub height: u32,
    /// Ceiling on the bytes the file's compressed elements may inflate to.
    pub max_inflated: u64,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            width: 256,
            height: 256,
            max_inflated: MAX_INFLATED_LEN,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedMask {
    pub mask: GrayImage,
    /// Non-metadata variable names discovered in the file.
    pub variables: Vec<String>,
    /// The variable the mask came from, `None` for a random mask.
    pub source: Option<String>,
}

/// Loads `path` and converts its first array variable to a mask, falling back to
/// a random mask drawn from `rng` when that is not possible.
pub fn extract_mask<R: Rng>(
    path: &Path,
    config: &ExtractConfig,
    rng: &mut R,
) -> Outcome<ExtractedMask> {
    let container = match MatContainer::open_with_limit(path, config.max_inflated) {
        Ok(container) => container,
        Err(err) => {
            warn!(path = %path.display(), error = %err, "MAT load failed, using random mask");
            return fallback(
                config,
                rng,
                Vec::new(),
                FallbackReason::Unreadable(err.to_string()),
            );
        }
    };
    mask_from_container(&container, config, rng)
}

pub fn mask_from_container<R: Rng>(
    container: &MatContainer,
    config: &ExtractConfig,
    rng: &mut R,
) -> Outcome<ExtractedMask> {
    let variables = container.usable_names();
    let Some(variable) = container.first_array() else {
        warn!(?variables, "no array-valued MAT variable, using random mask");
        return fallback(config, rng, variables, FallbackReason::NoArrayVariable);
    };
    match variable_to_gray(variable) {
        Ok(mask) => Outcome::Genuine(ExtractedMask {
            mask,
            variables,
            source: Some(variable.name.clone()),
        }),
        Err(err) => {
            warn!(variable = %variable.name, error = %err, "MAT variable unusable, using random mask");
            fallback(config, rng, variables, FallbackReason::Unreadable(err.to_string()))
        }
    }
}

/// Narrows a 2-D numeric variable to bytes and transposes it from column-major
/// storage into a row-major image (width = columns, height = rows).
pub fn variable_to_gray(variable: &MatVariable) -> Result<GrayImage, VisionError> {
    let data = variable.numeric().map(|d| d.to_u8_wrapping()).unwrap_or_default();
    let (rows, cols) = variable.shape_2d().unwrap_or((0, 0));
    let (width, height) = (
        u32::try_from(cols).unwrap_or(u32::MAX),
        u32::try_from(rows).unwrap_or(u32::MAX),
    );
    if rows == 0 || cols == 0 || rows.checked_mul(cols) != Some(data.len()) {
        return Err(VisionError::BufferSize {
            width,
            height,
            len: data.len(),
        });
    }
    Ok(GrayImage::from_fn(width, height, |x, y| {
        Luma([data[x as usize * rows + y as usize]])
    }))
}

/// A mask of uniformly random bytes.
pub fn random_mask<R: Rng>(config: &ExtractConfig, rng: &mut R) -> GrayImage {
    GrayImage::from_fn(config.width, config.height, |_, _| Luma([rng.random::<u8>()]))
}

fn fallback<R: Rng>(
    config: &ExtractConfig,
    rng: &mut R,
    variables: Vec<String>,
    reason: FallbackReason,
) -> Outcome<ExtractedMask> {
    Outcome::Fallback {
        value: ExtractedMask {
            mask: random_mask(config, rng),
            variables,
            source: None,
        },
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::mat_file::{ByteOrder, MatClass, MatHeader, MatPayload, NumericData};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn variable(name: &str, dims: Vec<usize>, payload: MatPayload) -> MatVariable {
        MatVariable {
            name: name.to_string(),
            class: MatClass::Double,
            dims,
            complex: false,
            global: false,
            logical: false,
            payload,
        }
    }

    fn container(variables: Vec<MatVariable>) -> MatContainer {
        MatContainer {
            header: MatHeader {
                description: String::new(),
                version: 0x0100,
                byte_order: ByteOrder::Little,
            },
            variables,
        }
    }

    #[test]
    fn column_major_data_is_transposed() {
        // 2 rows x 3 cols: [[1, 3, 5], [2, 4, 6]] stored as 1..=6
        let var = variable(
            "mask",
            vec![2, 3],
            MatPayload::Numeric(NumericData::Float((1..=6).map(f64::from).collect())),
        );
        let gray = variable_to_gray(&var).unwrap();
        assert_eq!(gray.dimensions(), (3, 2));
        assert_eq!(gray.get_pixel(0, 0).0[0], 1);
        assert_eq!(gray.get_pixel(1, 0).0[0], 3);
        assert_eq!(gray.get_pixel(2, 0).0[0], 5);
        assert_eq!(gray.get_pixel(0, 1).0[0], 2);
        assert_eq!(gray.get_pixel(2, 1).0[0], 6);
    }

    #[test]
    fn genuine_mask_lists_all_usable_names() {
        let mat = container(vec![
            variable("__header__", vec![1, 1], MatPayload::Skipped),
            variable("notes", vec![1, 4], MatPayload::Skipped),
            variable("mask", vec![1, 2], MatPayload::Numeric(NumericData::UInt(vec![0, 255]))),
        ]);
        let mut rng = StdRng::seed_from_u64(0);
        let outcome = mask_from_container(&mat, &ExtractConfig::default(), &mut rng);
        assert!(!outcome.is_fallback());
        let extracted = outcome.into_value();
        assert_eq!(extracted.variables, vec!["notes", "mask"]);
        assert_eq!(extracted.source.as_deref(), Some("mask"));
        assert_eq!(extracted.mask.as_raw(), &vec![0, 255]);
    }

    #[test]
    fn no_array_variable_falls_back_but_keeps_names() {
        let mat = container(vec![variable("notes", vec![1, 4], MatPayload::Skipped)]);
        let mut rng = StdRng::seed_from_u64(0);
        let outcome = mask_from_container(&mat, &ExtractConfig::default(), &mut rng);
        assert_eq!(outcome.fallback_reason(), Some(&FallbackReason::NoArrayVariable));
        let extracted = outcome.value();
        assert_eq!(extracted.variables, vec!["notes"]);
        assert_eq!(extracted.mask.dimensions(), (256, 256));
        assert_eq!(extracted.source, None);
    }

    #[test]
    fn unreadable_file_falls_back_with_no_names() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.mat");
        std::fs::write(&path, b"definitely not a MAT file").unwrap();

        let mut rng = StdRng::seed_from_u64(5);
        let outcome = extract_mask(&path, &ExtractConfig::default(), &mut rng);
        assert!(matches!(outcome.fallback_reason(), Some(FallbackReason::Unreadable(_))));
        assert!(outcome.value().variables.is_empty());
        assert_eq!(outcome.value().mask.dimensions(), (256, 256));
    }

    #[test]
    fn oversized_compressed_data_falls_back() {
        use flate2::Compression;
        use flate2::write::ZlibEncoder;
        use std::io::Write;

        // Header plus one compressed element inflating to 2 MiB of zeros.
        let mut file = vec![b' '; 128];
        file[..10].copy_from_slice(b"MATLAB 5.0");
        file[124..126].copy_from_slice(&0x0100u16.to_le_bytes());
        file[126..128].copy_from_slice(b"IM");
        let mut enc = ZlibEncoder::new(Vec::new(), Compression::default());
        enc.write_all(&vec![0u8; 2 << 20]).unwrap();
        let packed = enc.finish().unwrap();
        file.extend_from_slice(&15u32.to_le_bytes());
        file.extend_from_slice(&(packed.len() as u32).to_le_bytes());
        file.extend_from_slice(&packed);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bomb.mat");
        std::fs::write(&path, file).unwrap();

        let config = ExtractConfig {
            max_inflated: 1 << 20,
            ..ExtractConfig::default()
        };
        let outcome = extract_mask(&path, &config, &mut StdRng::seed_from_u64(1));
        match outcome.fallback_reason() {
            Some(FallbackReason::Unreadable(detail)) => assert!(detail.contains("limit"), "{detail}"),
            other => panic!("expected an unreadable fallback, got {other:?}"),
        }
        assert!(outcome.value().variables.is_empty());
        assert_eq!(outcome.value().mask.dimensions(), (256, 256));
    }

    #[test]
    fn missing_file_falls_back() {
        let mut rng = StdRng::seed_from_u64(5);
        let outcome = extract_mask(
            Path::new("/no/such/file.mat"),
            &ExtractConfig::default(),
            &mut rng,
        );
        assert!(outcome.is_fallback());
    }

    #[test]
    fn random_mask_is_seeded_and_fresh() {
        let config = ExtractConfig {
            width: 16,
            height: 8,
            ..ExtractConfig::default()
        };
        let a = random_mask(&config, &mut StdRng::seed_from_u64(9));
        let b = random_mask(&config, &mut StdRng::seed_from_u64(9));
        let c = random_mask(&config, &mut StdRng::seed_from_u64(10));
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.dimensions(), (16, 8));
    }
}
