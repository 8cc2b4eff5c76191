//! # Per-Eye Texture Ring
//!
//! A small ring of GPU color targets, one ring per eye.
//!
//! ## Plain English
//!
//! The compositor may still be reading the image we submitted last
//! frame while we want to write the next one. So each eye owns a few
//! textures and we rotate through them: advance to the next slot,
//! write into it, submit it. The rotation itself is plain modulo
//! arithmetic, kept in [`SlotCursor`] so it can be tested without a
//! GPU.

mod cursor;

pub use cursor::SlotCursor;

#[cfg(windows)]
pub use texture_ring::EyeTextureRing;

// ============================================
// GPU-BACKED RING (Windows only)
// ============================================

#[cfg(windows)]
mod texture_ring {
    use log::info;
    use windows::Win32::Graphics::Direct3D11::{
        ID3D11Device, ID3D11RenderTargetView, ID3D11Texture2D, D3D11_BIND_RENDER_TARGET,
        D3D11_BIND_SHADER_RESOURCE, D3D11_TEXTURE2D_DESC, D3D11_USAGE_DEFAULT,
    };
    use windows::Win32::Graphics::Dxgi::Common::DXGI_SAMPLE_DESC;

    use super::SlotCursor;
    use crate::config::PixelFormat;
    use crate::error::{GammaProbeError, GammaProbeResult, ResourceErrorKind};
    use crate::geometry::Sizei;

    /// A multi-slot color target set for one eye.
    ///
    /// Every slot is usable both as a render target and as a copy /
    /// sampling source, with no multisampling. Render-target views
    /// are created once and cached alongside the textures.
    pub struct EyeTextureRing {
        textures: Vec<ID3D11Texture2D>,
        views: Vec<ID3D11RenderTargetView>,
        cursor: SlotCursor,
        size: Sizei,
    }

    impl EyeTextureRing {
        /// Allocates `slots` textures sized to the eye viewport.
        ///
        /// Allocation failures are typed and fatal; an unreported
        /// failure here would just render black in the headset.
        pub fn create(
            viewport_size: Sizei,
            device: &ID3D11Device,
            format: PixelFormat,
            slots: usize,
        ) -> GammaProbeResult<Self> {
            let desc = D3D11_TEXTURE2D_DESC {
                Width: viewport_size.w as u32,
                Height: viewport_size.h as u32,
                MipLevels: 1,
                ArraySize: 1,
                Format: format.to_dxgi(),
                // No multi-sampling allowed
                SampleDesc: DXGI_SAMPLE_DESC {
                    Count: 1,
                    Quality: 0,
                },
                Usage: D3D11_USAGE_DEFAULT,
                BindFlags: (D3D11_BIND_SHADER_RESOURCE.0 | D3D11_BIND_RENDER_TARGET.0) as u32,
                CPUAccessFlags: 0,
                MiscFlags: 0,
            };

            let mut textures = Vec::with_capacity(slots);
            let mut views = Vec::with_capacity(slots);

            for _ in 0..slots {
                let mut texture: Option<ID3D11Texture2D> = None;
                unsafe { device.CreateTexture2D(&desc, None, Some(&mut texture)) }.map_err(
                    |e| {
                        GammaProbeError::Resource(ResourceErrorKind::RingTextureAllocation(
                            e.message(),
                        ))
                    },
                )?;
                let texture = texture.ok_or_else(|| {
                    GammaProbeError::Resource(ResourceErrorKind::RingTextureAllocation(
                        "driver returned no texture".to_string(),
                    ))
                })?;

                let mut view: Option<ID3D11RenderTargetView> = None;
                unsafe { device.CreateRenderTargetView(&texture, None, Some(&mut view)) }
                    .map_err(|e| {
                        GammaProbeError::Resource(ResourceErrorKind::RingViewCreation(e.message()))
                    })?;
                let view = view.ok_or_else(|| {
                    GammaProbeError::Resource(ResourceErrorKind::RingViewCreation(
                        "driver returned no view".to_string(),
                    ))
                })?;

                textures.push(texture);
                views.push(view);
            }

            info!(
                "Created eye texture ring: {} slots at {}x{}",
                slots, viewport_size.w, viewport_size.h
            );

            Ok(Self {
                textures,
                views,
                cursor: SlotCursor::new(slots),
                size: viewport_size,
            })
        }

        /// Rotates to the next slot.
        ///
        /// Call exactly once per frame, before writing or submitting
        /// anything that references "current".
        pub fn advance(&mut self) {
            self.cursor.advance();
        }

        /// The texture currently designated as write target.
        pub fn current_slot(&self) -> &ID3D11Texture2D {
            &self.textures[self.cursor.current()]
        }

        /// The cached render-target view for the current slot.
        pub fn current_view(&self) -> &ID3D11RenderTargetView {
            &self.views[self.cursor.current()]
        }

        /// Index of the current slot.
        pub fn current_index(&self) -> usize {
            self.cursor.current()
        }

        /// Number of slots in the ring.
        pub fn slot_count(&self) -> usize {
            self.cursor.slot_count()
        }

        /// The viewport size the slots were allocated for.
        pub fn size(&self) -> Sizei {
            self.size
        }
    }

    // Textures and views are COM references; dropping the ring
    // releases them through the windows crate.
}
