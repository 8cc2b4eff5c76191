//! # Source Image Module
//!
//! The image that gets copied into both eyes every frame: either a
//! file given on the command line, or a generated gamma calibration
//! pattern.
//!
//! ## Plain English
//!
//! A gamma chart works like this: the top half is a smooth gradient
//! from black to white. The bottom half alternates full-black and
//! full-white pixel columns, which your eye (and the headset optics)
//! blur into a 50% gray. If the pipeline handles sRGB correctly, that
//! blur lines up with the gradient's perceptual midpoint. If not, the
//! two halves visibly disagree - which is the whole diagnosis.

use std::path::Path;

use image::imageops::FilterType;
use log::info;

use crate::error::{GammaProbeError, GammaProbeResult, ResourceErrorKind};
use crate::geometry::Sizei;

// ============================================
// SOURCE IMAGE
// ============================================

/// A decoded RGBA8 image sized to one eye viewport.
#[derive(Clone, Debug)]
pub struct SourceImage {
    width: u32,
    height: u32,
    rgba: Vec<u8>,
}

impl SourceImage {
    /// Loads and decodes a file, resizing exactly to `size`.
    ///
    /// Any format the `image` crate can decode works, DDS included.
    /// The exact resize keeps later full-resource GPU copies
    /// well-formed: source and eye slots must match in dimensions.
    pub fn load(path: &Path, size: Sizei) -> GammaProbeResult<Self> {
        let decoded = image::open(path).map_err(|e| {
            GammaProbeError::Resource(ResourceErrorKind::SourceImageDecode(format!(
                "{}: {}",
                path.display(),
                e
            )))
        })?;

        let rgba = decoded
            .resize_exact(size.w as u32, size.h as u32, FilterType::Triangle)
            .to_rgba8();

        info!("Loaded source image {} ({}x{})", path.display(), size.w, size.h);

        Ok(Self {
            width: size.w as u32,
            height: size.h as u32,
            rgba: rgba.into_raw(),
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// The raw RGBA8 pixels, row-major.
    pub fn rgba8(&self) -> &[u8] {
        &self.rgba
    }

    /// The pixels swizzled to BGRA8, matching the pipeline's
    /// B8G8R8A8 texture formats.
    pub fn to_bgra8(&self) -> Vec<u8> {
        let mut out = self.rgba.clone();
        for px in out.chunks_exact_mut(4) {
            px.swap(0, 2);
        }
        out
    }
}

// ============================================
// BUILT-IN TEST PATTERN
// ============================================

/// Generator for the built-in gamma calibration pattern.
pub struct TestPattern;

impl TestPattern {
    /// Generates the pattern at the given size.
    ///
    /// Top half: horizontal black-to-white gradient. Bottom half:
    /// alternating black/white single-pixel columns whose optical
    /// average is 50% - the reference the gradient is judged against.
    pub fn generate(size: Sizei) -> SourceImage {
        let (w, h) = (size.w as u32, size.h as u32);
        let mut rgba = Vec::with_capacity((w * h * 4) as usize);

        for y in 0..h {
            for x in 0..w {
                let v = if y < h / 2 {
                    // Gradient: 0 at the left edge, 255 at the right.
                    if w > 1 {
                        ((x * 255) / (w - 1)) as u8
                    } else {
                        0
                    }
                } else if x % 2 == 0 {
                    0
                } else {
                    255
                };
                rgba.extend_from_slice(&[v, v, v, 255]);
            }
        }

        SourceImage {
            width: w,
            height: h,
            rgba,
        }
    }
}

/// Resolves the source image: the configured file if given, the
/// generated pattern otherwise.
pub fn resolve_source(path: Option<&Path>, eye_size: Sizei) -> GammaProbeResult<SourceImage> {
    match path {
        Some(p) => SourceImage::load(p, eye_size),
        None => {
            info!(
                "No -texture given, generating gamma pattern at {}x{}",
                eye_size.w, eye_size.h
            );
            Ok(TestPattern::generate(eye_size))
        }
    }
}

// ============================================
// GPU UPLOAD (Windows only)
// ============================================

#[cfg(windows)]
mod upload {
    use windows::Win32::Graphics::Direct3D11::{
        ID3D11Device, ID3D11Texture2D, D3D11_BIND_SHADER_RESOURCE, D3D11_SUBRESOURCE_DATA,
        D3D11_TEXTURE2D_DESC, D3D11_USAGE_IMMUTABLE,
    };
    use windows::Win32::Graphics::Dxgi::Common::DXGI_SAMPLE_DESC;

    use super::SourceImage;
    use crate::config::PixelFormat;
    use crate::error::{GammaProbeError, GammaProbeResult, ResourceErrorKind};

    impl SourceImage {
        /// Uploads the image as an immutable single-mip texture in
        /// the selected pipeline format.
        pub fn upload(
            &self,
            device: &ID3D11Device,
            format: PixelFormat,
        ) -> GammaProbeResult<ID3D11Texture2D> {
            let bgra = self.to_bgra8();

            let desc = D3D11_TEXTURE2D_DESC {
                Width: self.width(),
                Height: self.height(),
                MipLevels: 1,
                ArraySize: 1,
                Format: format.to_dxgi(),
                SampleDesc: DXGI_SAMPLE_DESC {
                    Count: 1,
                    Quality: 0,
                },
                Usage: D3D11_USAGE_IMMUTABLE,
                BindFlags: D3D11_BIND_SHADER_RESOURCE.0 as u32,
                CPUAccessFlags: 0,
                MiscFlags: 0,
            };

            let data = D3D11_SUBRESOURCE_DATA {
                pSysMem: bgra.as_ptr() as *const _,
                SysMemPitch: self.width() * 4,
                SysMemSlicePitch: 0,
            };

            let mut texture: Option<ID3D11Texture2D> = None;
            unsafe { device.CreateTexture2D(&desc, Some(&data), Some(&mut texture)) }.map_err(
                |e| {
                    GammaProbeError::Resource(ResourceErrorKind::SourceTextureUpload(e.message()))
                },
            )?;

            texture.ok_or_else(|| {
                GammaProbeError::Resource(ResourceErrorKind::SourceTextureUpload(
                    "driver returned no texture".to_string(),
                ))
            })
        }
    }
}

// ============================================
// TESTS
// ============================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_dimensions() {
        let img = TestPattern::generate(Sizei::new(8, 6));
        assert_eq!(img.width(), 8);
        assert_eq!(img.height(), 6);
        assert_eq!(img.rgba8().len(), 8 * 6 * 4);
    }

    #[test]
    fn test_gradient_endpoints() {
        let img = TestPattern::generate(Sizei::new(4, 4));
        let rgba = img.rgba8();

        // Row 0 is in the gradient half: x=0 black, x=3 white.
        assert_eq!(rgba[0], 0);
        let last = (3 * 4) as usize;
        assert_eq!(rgba[last], 255);
        // Interior steps are evenly spaced.
        assert_eq!(rgba[4], 85);
        assert_eq!(rgba[8], 170);
    }

    #[test]
    fn test_alternating_columns() {
        let img = TestPattern::generate(Sizei::new(4, 4));
        let rgba = img.rgba8();

        // Row 2 is in the alternating half: black, white, black, white.
        let row = (2 * 4 * 4) as usize;
        assert_eq!(rgba[row], 0);
        assert_eq!(rgba[row + 4], 255);
        assert_eq!(rgba[row + 8], 0);
        assert_eq!(rgba[row + 12], 255);
    }

    #[test]
    fn test_alpha_is_opaque() {
        let img = TestPattern::generate(Sizei::new(2, 2));
        for px in img.rgba8().chunks_exact(4) {
            assert_eq!(px[3], 255);
        }
    }

    #[test]
    fn test_bgra_swizzle() {
        let img = SourceImage {
            width: 1,
            height: 1,
            rgba: vec![10, 20, 30, 40],
        };
        assert_eq!(img.to_bgra8(), vec![30, 20, 10, 40]);
    }

    #[test]
    fn test_resolve_source_defaults_to_pattern() {
        let img = resolve_source(None, Sizei::new(4, 4)).unwrap();
        assert_eq!(img.width(), 4);
    }

    #[test]
    fn test_load_missing_file_is_typed_error() {
        let err = resolve_source(
            Some(Path::new("definitely/not/here.dds")),
            Sizei::new(4, 4),
        )
        .unwrap_err();
        assert!(format!("{}", err).contains("Resource"));
    }
}
