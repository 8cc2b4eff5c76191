//! # Application Assembly
//!
//! Wires the display surface, the per-eye rings, the compositor and
//! the source texture into the [`FrameApp`] the driver runs. Windows
//! only.
//!
//! ## Plain English
//!
//! Startup happens in the strict order the runtime demands: detect
//! the headset, open the mirror window and device, allocate the eye
//! rings, start the compositor session, create the mirror, upload the
//! test image. Teardown is the exact reverse, expressed through field
//! declaration order.

use log::info;

use crate::config::Config;
use crate::display::DisplaySurface;
use crate::driver::FrameApp;
use crate::error::GammaProbeResult;
use crate::geometry::{eye_viewports, Recti, EYE_COUNT};
use crate::hmd::{Compositor, EyeFrame, HmdRuntime, MirrorTexture, SubmitOutcome};
use crate::ring::EyeTextureRing;
use crate::source::resolve_source;

use windows::Win32::Graphics::Direct3D11::ID3D11Texture2D;

/// The assembled gamma probe.
///
/// Field order is teardown order: mirror first, then the eye rings,
/// then the compositor session and runtime, and the window last.
pub struct GammaTestApp {
    mirror: MirrorTexture,
    rings: [EyeTextureRing; EYE_COUNT],
    source_texture: ID3D11Texture2D,
    compositor: Compositor,
    _runtime: HmdRuntime,
    surface: DisplaySurface,
    viewports: [Recti; EYE_COUNT],
}

impl GammaTestApp {
    /// Runs the whole setup chain. Any failure is returned for the
    /// caller to report fatally; there is no partial-failure mode.
    pub fn new(config: &Config) -> GammaProbeResult<Self> {
        if let Some(err) = config.validate().into_iter().next() {
            return Err(err.into());
        }

        let format = config.pixel_format();
        info!(
            "Starting gamma probe: sRGB {}, format {:?}",
            config.srgb, format
        );

        let runtime = HmdRuntime::initialize()?;
        let display_size = runtime.display_size();

        let surface = DisplaySurface::initialize(display_size, format, &config.window_title)?;

        let viewports = eye_viewports(display_size);

        let left_ring = EyeTextureRing::create(
            viewports[0].size,
            surface.device(),
            format,
            config.ring_slots,
        )?;
        let right_ring = EyeTextureRing::create(
            viewports[1].size,
            surface.device(),
            format,
            config.ring_slots,
        )?;

        let compositor = Compositor::create(&runtime, surface.device(), surface.context(), format)?;

        let mirror = MirrorTexture::create(surface.device(), display_size, format)?;

        let source = resolve_source(config.texture_path.as_deref(), viewports[0].size)?;
        let source_texture = source.upload(surface.device(), format)?;

        Ok(Self {
            mirror,
            rings: [left_ring, right_ring],
            source_texture,
            compositor,
            _runtime: runtime,
            surface,
            viewports,
        })
    }
}

impl FrameApp for GammaTestApp {
    fn pump_events(&mut self) -> bool {
        self.surface.pump_events()
    }

    /// One full frame cycle:
    /// 1. Advance each eye ring, then copy the source image into the
    ///    fresh current slot.
    /// 2. Submit both (slot, viewport) pairs as one stereo frame.
    /// 3. Refresh the mirror and flip it to the window.
    fn run_frame(&mut self) -> GammaProbeResult<()> {
        let context = self.surface.context().clone();

        for ring in self.rings.iter_mut() {
            // Rotate strictly before writing this frame's content.
            ring.advance();
            unsafe { context.CopyResource(ring.current_slot(), &self.source_texture) };
        }

        let outcome = self.compositor.submit([
            EyeFrame {
                texture: self.rings[0].current_slot(),
                viewport: self.viewports[0],
            },
            EyeFrame {
                texture: self.rings[1].current_slot(),
                viewport: self.viewports[1],
            },
        ])?;

        if outcome == SubmitOutcome::Submitted {
            self.mirror.update(
                &context,
                self.rings[0].current_slot(),
                self.rings[1].current_slot(),
            );
        }

        unsafe { context.CopyResource(self.surface.back_buffer(), self.mirror.texture()) };
        self.surface.present();

        Ok(())
    }
}
