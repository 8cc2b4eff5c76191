//! # Mirror Texture
//!
//! The on-monitor preview of what the compositor was just given.
//!
//! OpenXR exposes no runtime-built mirror of the distorted output, so
//! the preview is composed here from the two submitted eye images,
//! side by side: left eye left, right eye right, jointly covering the
//! full display width.

use log::info;
use windows::Win32::Graphics::Direct3D11::{
    ID3D11Device, ID3D11DeviceContext, ID3D11Texture2D, D3D11_TEXTURE2D_DESC,
    D3D11_USAGE_DEFAULT,
};
use windows::Win32::Graphics::Dxgi::Common::DXGI_SAMPLE_DESC;

use crate::config::PixelFormat;
use crate::error::{GammaProbeError, GammaProbeResult, ResourceErrorKind};
use crate::geometry::Sizei;

/// A window-sized texture holding the latest stereo preview.
pub struct MirrorTexture {
    texture: ID3D11Texture2D,
    size: Sizei,
}

impl MirrorTexture {
    /// Allocates the mirror at the display size.
    pub fn create(
        device: &ID3D11Device,
        size: Sizei,
        format: PixelFormat,
    ) -> GammaProbeResult<Self> {
        let desc = D3D11_TEXTURE2D_DESC {
            Width: size.w as u32,
            Height: size.h as u32,
            MipLevels: 1,
            ArraySize: 1,
            Format: format.to_dxgi(),
            SampleDesc: DXGI_SAMPLE_DESC {
                Count: 1,
                Quality: 0,
            },
            Usage: D3D11_USAGE_DEFAULT,
            // Copy source/target only; never bound to the pipeline.
            BindFlags: 0,
            CPUAccessFlags: 0,
            MiscFlags: 0,
        };

        let mut texture: Option<ID3D11Texture2D> = None;
        unsafe { device.CreateTexture2D(&desc, None, Some(&mut texture)) }.map_err(|e| {
            GammaProbeError::Resource(ResourceErrorKind::MirrorTextureCreation(e.message()))
        })?;
        let texture = texture.ok_or_else(|| {
            GammaProbeError::Resource(ResourceErrorKind::MirrorTextureCreation(
                "driver returned no texture".to_string(),
            ))
        })?;

        info!("Created mirror texture {}x{}", size.w, size.h);

        Ok(Self { texture, size })
    }

    /// Copies the two submitted eye slots into the mirror, left eye
    /// at x=0 and right eye at x=width/2.
    pub fn update(
        &self,
        context: &ID3D11DeviceContext,
        left_eye: &ID3D11Texture2D,
        right_eye: &ID3D11Texture2D,
    ) {
        let half = (self.size.w / 2) as u32;
        unsafe {
            context.CopySubresourceRegion(&self.texture, 0, 0, 0, 0, left_eye, 0, None);
            context.CopySubresourceRegion(&self.texture, 0, half, 0, 0, right_eye, 0, None);
        }
    }

    /// The preview texture, copied into the back buffer each frame.
    pub fn texture(&self) -> &ID3D11Texture2D {
        &self.texture
    }

    pub fn size(&self) -> Sizei {
        self.size
    }
}
