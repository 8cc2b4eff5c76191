//! # HMD Compositor Module
//!
//! Talks to the headset runtime: initialization, the render session,
//! per-eye submission swapchains and the stereo frame submission.
//! Windows only.
//!
//! ## Plain English
//!
//! The compositor is the runtime service that takes one color image
//! per eye, applies lens distortion and timing magic, and lights up
//! the headset panels. We hand it our current ring slots once per
//! loop iteration as a single atomic stereo frame.
//!
//! Creation order is strict - runtime, session, tracking space, eye
//! swapchains - and teardown happens in exact reverse through the
//! field drop order.

mod mirror;

pub use mirror::MirrorTexture;

use std::mem::ManuallyDrop;
use std::time::{Duration as StdDuration, Instant};

use log::{info, warn};
use openxr as xr;
use windows::core::Interface;
use windows::Win32::Graphics::Direct3D11::{
    ID3D11Device, ID3D11DeviceContext, ID3D11Texture2D,
};

use crate::config::PixelFormat;
use crate::error::{
    GammaProbeError, GammaProbeResult, SetupErrorKind, SubmissionErrorKind,
};
use crate::geometry::{Recti, Sizei, EYE_COUNT};

const VIEW_TYPE: xr::ViewConfigurationType = xr::ViewConfigurationType::PRIMARY_STEREO;

/// How long to wait for the runtime to mark the session ready.
const SESSION_READY_TIMEOUT: StdDuration = StdDuration::from_secs(10);

// ============================================
// RUNTIME HANDLE
// ============================================

/// The initialized HMD runtime and detected headset.
pub struct HmdRuntime {
    instance: xr::Instance,
    system: xr::SystemId,
    blend_mode: xr::EnvironmentBlendMode,
    eye_size: Sizei,
}

impl HmdRuntime {
    /// Loads the runtime, creates the instance and detects the HMD.
    ///
    /// Fatal if no runtime is installed, if it cannot share a D3D11
    /// device, or if no head-mounted display is attached.
    pub fn initialize() -> GammaProbeResult<Self> {
        let entry = unsafe { xr::Entry::load() }.map_err(|e| {
            setup(SetupErrorKind::RuntimeInitialization(format!(
                "OpenXR loader not found: {}",
                e
            )))
        })?;

        let available = entry
            .enumerate_extensions()
            .map_err(|e| setup(SetupErrorKind::RuntimeInitialization(e.to_string())))?;
        if !available.khr_d3d11_enable {
            return Err(setup(SetupErrorKind::RuntimeInitialization(
                "runtime does not support D3D11".to_string(),
            )));
        }

        let mut enabled = xr::ExtensionSet::default();
        enabled.khr_d3d11_enable = true;

        let instance = entry
            .create_instance(
                &xr::ApplicationInfo {
                    application_name: "gamma-probe",
                    application_version: 0,
                    engine_name: "gamma-probe",
                    engine_version: 0,
                },
                &enabled,
                &[],
            )
            .map_err(|e| setup(SetupErrorKind::RuntimeInitialization(e.to_string())))?;

        let props = instance
            .properties()
            .map_err(|e| setup(SetupErrorKind::RuntimeInitialization(e.to_string())))?;
        info!(
            "HMD runtime: {} {}",
            props.runtime_name, props.runtime_version
        );

        let system = instance
            .system(xr::FormFactor::HEAD_MOUNTED_DISPLAY)
            .map_err(|e| setup(SetupErrorKind::HmdNotDetected(e.to_string())))?;

        let system_props = instance
            .system_properties(system)
            .map_err(|e| setup(SetupErrorKind::HmdNotDetected(e.to_string())))?;
        info!("Detected HMD: {}", system_props.system_name);

        let views = instance
            .enumerate_view_configuration_views(system, VIEW_TYPE)
            .map_err(|e| setup(SetupErrorKind::HmdNotDetected(e.to_string())))?;
        if views.len() < EYE_COUNT {
            return Err(setup(SetupErrorKind::HmdNotDetected(format!(
                "stereo view configuration reports {} views",
                views.len()
            ))));
        }

        let blend_mode = instance
            .enumerate_environment_blend_modes(system, VIEW_TYPE)
            .map_err(|e| setup(SetupErrorKind::HmdNotDetected(e.to_string())))?[0];

        let eye_size = Sizei::new(
            views[0].recommended_image_rect_width as i32,
            views[0].recommended_image_rect_height as i32,
        );

        Ok(Self {
            instance,
            system,
            blend_mode,
            eye_size,
        })
    }

    /// Recommended per-eye render size.
    pub fn eye_size(&self) -> Sizei {
        self.eye_size
    }

    /// Mirror display size: both eyes side by side.
    pub fn display_size(&self) -> Sizei {
        Sizei::new(self.eye_size.w * 2, self.eye_size.h)
    }
}

// ============================================
// COMPOSITOR SESSION
// ============================================

/// One eye's (slot texture, viewport) pair for a stereo submission.
pub struct EyeFrame<'a> {
    pub texture: &'a ID3D11Texture2D,
    pub viewport: Recti,
}

/// What happened to a submitted frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The compositor accepted the stereo frame.
    Submitted,
    /// The runtime declined rendering this cycle; nothing was shown.
    Skipped,
}

/// A per-eye compositor swapchain plus its runtime-owned images.
struct EyeSwapchain {
    handle: xr::Swapchain<xr::D3D11>,
    /// Raw D3D11 texture pointers owned by the runtime. Never
    /// released by us; wrapped in ManuallyDrop when used.
    images: Vec<usize>,
}

/// The active compositor session.
pub struct Compositor {
    swapchains: Vec<EyeSwapchain>,
    stage: xr::Space,
    frame_stream: xr::FrameStream<xr::D3D11>,
    frame_wait: xr::FrameWaiter,
    session: xr::Session<xr::D3D11>,
    instance: xr::Instance,
    context: ID3D11DeviceContext,
    blend_mode: xr::EnvironmentBlendMode,
    event_storage: xr::EventDataBuffer,
    session_running: bool,
}

impl Compositor {
    /// Creates the session on the shared D3D11 device, configures the
    /// tracking space, waits for the session to become ready and
    /// creates one submission swapchain per eye.
    pub fn create(
        runtime: &HmdRuntime,
        device: &ID3D11Device,
        context: &ID3D11DeviceContext,
        format: PixelFormat,
    ) -> GammaProbeResult<Self> {
        // The runtime requires this query before session creation.
        let requirements = runtime
            .instance
            .graphics_requirements::<xr::D3D11>(runtime.system)
            .map_err(|e| setup(SetupErrorKind::SessionCreation(e.to_string())))?;
        info!(
            "Runtime wants D3D11 feature level {:?} minimum",
            requirements.min_feature_level
        );

        let (session, frame_wait, frame_stream) = unsafe {
            runtime.instance.create_session::<xr::D3D11>(
                runtime.system,
                &xr::d3d::SessionCreateInfoD3D11 {
                    device: device.as_raw() as *mut _,
                },
            )
        }
        .map_err(|e| setup(SetupErrorKind::SessionCreation(e.to_string())))?;

        let stage = session
            .create_reference_space(xr::ReferenceSpaceType::STAGE, xr::Posef::IDENTITY)
            .map_err(|e| setup(SetupErrorKind::TrackingConfiguration(e.to_string())))?;

        let mut swapchains = Vec::with_capacity(EYE_COUNT);
        for eye in 0..EYE_COUNT {
            let handle = session
                .create_swapchain(&xr::SwapchainCreateInfo {
                    create_flags: xr::SwapchainCreateFlags::EMPTY,
                    usage_flags: xr::SwapchainUsageFlags::COLOR_ATTACHMENT
                        | xr::SwapchainUsageFlags::SAMPLED,
                    format: format.to_dxgi().0 as u32,
                    // No multi-sampling allowed
                    sample_count: 1,
                    width: runtime.eye_size.w as u32,
                    height: runtime.eye_size.h as u32,
                    face_count: 1,
                    array_size: 1,
                    mip_count: 1,
                })
                .map_err(|e| {
                    setup(SetupErrorKind::EyeSwapchainCreation(format!(
                        "eye {}: {}",
                        eye, e
                    )))
                })?;

            let images = handle
                .enumerate_images()
                .map_err(|e| setup(SetupErrorKind::EyeSwapchainCreation(e.to_string())))?
                .into_iter()
                .map(|ptr| ptr as usize)
                .collect();

            swapchains.push(EyeSwapchain { handle, images });
        }

        let mut compositor = Self {
            swapchains,
            stage,
            frame_stream,
            frame_wait,
            session,
            instance: runtime.instance.clone(),
            context: context.clone(),
            blend_mode: runtime.blend_mode,
            event_storage: xr::EventDataBuffer::new(),
            session_running: false,
        };

        compositor.wait_until_ready()?;
        info!("Compositor session running");

        Ok(compositor)
    }

    /// Pumps runtime events until the session is begun.
    fn wait_until_ready(&mut self) -> GammaProbeResult<()> {
        let deadline = Instant::now() + SESSION_READY_TIMEOUT;
        while !self.session_running {
            if Instant::now() > deadline {
                return Err(setup(SetupErrorKind::SessionCreation(
                    "session did not become ready".to_string(),
                )));
            }
            self.poll_events()?;
            if !self.session_running {
                std::thread::sleep(StdDuration::from_millis(10));
            }
        }
        Ok(())
    }

    /// Drains runtime events, beginning/ending the session as the
    /// runtime asks.
    fn poll_events(&mut self) -> GammaProbeResult<()> {
        while let Some(event) = self
            .instance
            .poll_event(&mut self.event_storage)
            .map_err(|e| setup(SetupErrorKind::SessionCreation(e.to_string())))?
        {
            use xr::Event::*;
            match event {
                SessionStateChanged(e) => match e.state() {
                    xr::SessionState::READY => {
                        self.session.begin(VIEW_TYPE).map_err(|err| {
                            setup(SetupErrorKind::SessionCreation(err.to_string()))
                        })?;
                        self.session_running = true;
                    }
                    xr::SessionState::STOPPING => {
                        if let Err(err) = self.session.end() {
                            warn!("Failed to end session cleanly: {}", err);
                        }
                        self.session_running = false;
                    }
                    xr::SessionState::EXITING | xr::SessionState::LOSS_PENDING => {
                        self.session_running = false;
                    }
                    _ => {}
                },
                InstanceLossPending(_) => {
                    self.session_running = false;
                }
                EventsLost(e) => warn!("Runtime lost {} events", e.lost_event_count()),
                _ => {}
            }
        }
        Ok(())
    }

    /// Submits one atomic stereo frame: both current eye slots plus
    /// their viewports.
    ///
    /// The current slot of each ring must have been advanced and
    /// written before this call. Rejections surface as
    /// [`GammaProbeError::Submission`], which the frame driver logs
    /// and ignores.
    pub fn submit(&mut self, eyes: [EyeFrame<'_>; EYE_COUNT]) -> GammaProbeResult<SubmitOutcome> {
        self.poll_events()?;
        if !self.session_running {
            return Ok(SubmitOutcome::Skipped);
        }

        let frame_state = self
            .frame_wait
            .wait()
            .map_err(|e| submission(SubmissionErrorKind::FrameWaitFailed(e.to_string())))?;
        self.frame_stream
            .begin()
            .map_err(|e| submission(SubmissionErrorKind::FrameWaitFailed(e.to_string())))?;

        if !frame_state.should_render {
            self.frame_stream
                .end(frame_state.predicted_display_time, self.blend_mode, &[])
                .map_err(|e| {
                    submission(SubmissionErrorKind::FrameRejected(e.to_string()))
                })?;
            return Ok(SubmitOutcome::Skipped);
        }

        // Copy each eye's current ring slot into the acquired
        // compositor image.
        for (swapchain, frame) in self.swapchains.iter_mut().zip(eyes.iter()) {
            let index = swapchain
                .handle
                .acquire_image()
                .map_err(|e| submission(SubmissionErrorKind::ImageCycleFailed(e.to_string())))?;
            swapchain
                .handle
                .wait_image(xr::Duration::INFINITE)
                .map_err(|e| submission(SubmissionErrorKind::ImageCycleFailed(e.to_string())))?;

            // Runtime-owned texture: borrow without taking a
            // reference count.
            let target = ManuallyDrop::new(unsafe {
                ID3D11Texture2D::from_raw(swapchain.images[index as usize] as *mut _)
            });
            unsafe { self.context.CopyResource(&*target, frame.texture) };

            swapchain
                .handle
                .release_image()
                .map_err(|e| submission(SubmissionErrorKind::ImageCycleFailed(e.to_string())))?;
        }

        let (_, views) = self
            .session
            .locate_views(VIEW_TYPE, frame_state.predicted_display_time, &self.stage)
            .map_err(|e| submission(SubmissionErrorKind::FrameRejected(e.to_string())))?;
        if views.len() < EYE_COUNT {
            self.frame_stream
                .end(frame_state.predicted_display_time, self.blend_mode, &[])
                .map_err(|e| {
                    submission(SubmissionErrorKind::FrameRejected(e.to_string()))
                })?;
            return Ok(SubmitOutcome::Skipped);
        }

        let rects: Vec<xr::Rect2Di> = eyes.iter().map(|f| to_xr_rect(f.viewport)).collect();

        self.frame_stream
            .end(
                frame_state.predicted_display_time,
                self.blend_mode,
                &[&xr::CompositionLayerProjection::new()
                    .space(&self.stage)
                    .views(&[
                        xr::CompositionLayerProjectionView::new()
                            .pose(views[0].pose)
                            .fov(views[0].fov)
                            .sub_image(
                                xr::SwapchainSubImage::new()
                                    .swapchain(&self.swapchains[0].handle)
                                    .image_array_index(0)
                                    .image_rect(rects[0]),
                            ),
                        xr::CompositionLayerProjectionView::new()
                            .pose(views[1].pose)
                            .fov(views[1].fov)
                            .sub_image(
                                xr::SwapchainSubImage::new()
                                    .swapchain(&self.swapchains[1].handle)
                                    .image_array_index(0)
                                    .image_rect(rects[1]),
                            ),
                    ])],
            )
            .map_err(|e| submission(SubmissionErrorKind::FrameRejected(e.to_string())))?;

        Ok(SubmitOutcome::Submitted)
    }
}

fn to_xr_rect(vp: Recti) -> xr::Rect2Di {
    xr::Rect2Di {
        offset: xr::Offset2Di {
            x: vp.pos.x,
            y: vp.pos.y,
        },
        extent: xr::Extent2Di {
            width: vp.size.w,
            height: vp.size.h,
        },
    }
}

fn setup(kind: SetupErrorKind) -> GammaProbeError {
    GammaProbeError::Setup(kind)
}

fn submission(kind: SubmissionErrorKind) -> GammaProbeError {
    GammaProbeError::Submission(kind)
}
