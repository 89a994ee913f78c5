use std::path::Path;

use glam::Vec3;
use image::imageops::{self, FilterType};
use image::{ImageFormat, Rgb32FImage};

use crate::error::EnvironmentError;

/// An equirectangular radiance map, used both as the background and as the
/// source of image based lighting.
#[derive(Debug, Clone)]
pub struct EnvironmentMap {
    pub name: String,
    pub width: u32,
    pub height: u32,
    /// Row-major, top row first.
    pub texels: Vec<Vec3>,
    pub average_radiance: Vec3,
}

impl EnvironmentMap {
    /// Resamples `image` down to `target_width`, keeping its aspect ratio.
    /// Images narrower than the target are kept at their size.
    pub fn from_image(
        name: impl Into<String>,
        image: &Rgb32FImage,
        target_width: u32,
    ) -> Result<Self, EnvironmentError> {
        let (source_width, source_height) = image.dimensions();
        if source_width == 0 || source_height == 0 {
            return Err(EnvironmentError::Empty);
        }

        let width = target_width.clamp(1, source_width);
        let height = ((source_height as u64 * width as u64) / source_width as u64).max(1) as u32;

        // Float resampling saturates at 1.0, so filter in [0, 1] and rescale
        let peak = image
            .pixels()
            .flat_map(|pixel| pixel.0)
            .fold(0.0f32, f32::max)
            .max(f32::MIN_POSITIVE);
        let mut normalized = image.clone();
        for pixel in normalized.pixels_mut() {
            pixel.0 = pixel.0.map(|channel| channel.max(0.0) / peak);
        }

        let resized = imageops::resize(&normalized, width, height, FilterType::Triangle);
        let texels = resized
            .pixels()
            .map(|pixel| Vec3::from_array(pixel.0) * peak)
            .collect::<Vec<_>>();
        let average_radiance = texels.iter().copied().sum::<Vec3>() / texels.len() as f32;

        Ok(Self {
            name: name.into(),
            width,
            height,
            texels,
            average_radiance,
        })
    }

    pub fn texel(&self, x: u32, y: u32) -> Option<Vec3> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.texels.get((y * self.width + x) as usize).copied()
    }
}

/// Loads a Radiance HDR file from disk.
pub fn load_equirect_hdr(
    source: impl AsRef<Path>,
    target_width: u32,
) -> Result<EnvironmentMap, EnvironmentError> {
    let path = source.as_ref();
    let display = path.to_string_lossy();
    if display.starts_with("http://") || display.starts_with("https://") {
        return Err(EnvironmentError::UnsupportedSource(display.into_owned()));
    }

    let bytes = std::fs::read(path).map_err(|source| EnvironmentError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let image = image::load_from_memory_with_format(&bytes, ImageFormat::Hdr)?.to_rgb32f();
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| display.into_owned());

    let map = EnvironmentMap::from_image(name, &image, target_width)?;
    log::info!(
        "Loaded environment {} ({}x{} -> {}x{})",
        map.name,
        image.width(),
        image.height(),
        map.width,
        map.height
    );
    Ok(map)
}

#[cfg(test)]
mod tests {
    use glam::Vec3;
    use image::{Rgb, Rgb32FImage};

    use super::{load_equirect_hdr, EnvironmentMap};
    use crate::error::EnvironmentError;

    #[test]
    fn downsampling_keeps_radiance_above_one() {
        let image = Rgb32FImage::from_pixel(8, 4, Rgb([6.0, 3.0, 0.5]));

        let map = EnvironmentMap::from_image("bright", &image, 4).unwrap();
        assert_eq!((map.width, map.height), (4, 2));
        assert_eq!(map.texels.len(), 8);
        for texel in &map.texels {
            assert!(texel.abs_diff_eq(Vec3::new(6.0, 3.0, 0.5), 1e-4), "{:?}", texel);
        }
        assert!(map.average_radiance.abs_diff_eq(Vec3::new(6.0, 3.0, 0.5), 1e-4));
        assert_eq!(map.texel(4, 0), None);
    }

    #[test]
    fn downsampling_blends_neighbouring_texels() {
        let image = Rgb32FImage::from_fn(8, 2, |x, _| {
            if x < 4 {
                Rgb([4.0, 0.0, 0.0])
            } else {
                Rgb([0.0, 0.0, 2.0])
            }
        });

        let map = EnvironmentMap::from_image("split", &image, 2).unwrap();
        assert_eq!((map.width, map.height), (2, 1));
        let left = map.texel(0, 0).unwrap();
        let right = map.texel(1, 0).unwrap();
        assert!(left.x > 2.0 && left.x <= 4.0 + 1e-4);
        assert!(right.z > 1.0 && right.z <= 2.0 + 1e-4);
        assert!(left.x > right.x && right.z > left.z);
    }

    #[test]
    fn small_images_are_not_upscaled() {
        let image = Rgb32FImage::from_pixel(3, 1, Rgb([0.25, 0.25, 0.25]));
        let map = EnvironmentMap::from_image("small", &image, 256).unwrap();
        assert_eq!((map.width, map.height), (3, 1));
    }

    #[test]
    fn empty_image_is_rejected() {
        let image = Rgb32FImage::new(0, 0);
        assert!(matches!(
            EnvironmentMap::from_image("empty", &image, 16),
            Err(EnvironmentError::Empty)
        ));
    }

    #[test]
    fn remote_sources_are_unsupported() {
        assert!(matches!(
            load_equirect_hdr("https://example.com/sky.hdr", 256),
            Err(EnvironmentError::UnsupportedSource(_))
        ));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        assert!(matches!(
            load_equirect_hdr("/no/such/sky.hdr", 256),
            Err(EnvironmentError::Read { .. })
        ));
    }
}
