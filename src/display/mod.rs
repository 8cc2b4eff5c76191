//! # Display Surface Module
//!
//! The native mirror window plus its D3D11 device, swap chain and
//! back buffer. Windows only.
//!
//! ## Plain English
//!
//! The headset shows the real output; this window is the on-monitor
//! preview. It owns the graphics device everything else borrows, a
//! double-buffered swap chain in the selected pixel format, and the
//! keyboard state that lets Escape or Ctrl+Q quit the tool.
//!
//! The window procedure finds its owning surface through an explicit
//! context pointer stored in the window's user-data slot - no global
//! window-to-object table.

use log::{info, warn};
use windows::core::{Interface, PCWSTR};
use windows::Win32::Foundation::{HINSTANCE, HMODULE, HWND, LPARAM, LRESULT, RECT, WPARAM};
use windows::Win32::Graphics::Direct3D::D3D_DRIVER_TYPE_UNKNOWN;
use windows::Win32::Graphics::Direct3D11::{
    D3D11CreateDevice, ID3D11Device, ID3D11DeviceContext, ID3D11RenderTargetView,
    ID3D11Texture2D, D3D11_CREATE_DEVICE_BGRA_SUPPORT, D3D11_SDK_VERSION,
};
use windows::Win32::Graphics::Dxgi::Common::{
    DXGI_MODE_DESC, DXGI_RATIONAL, DXGI_SAMPLE_DESC,
};
use windows::Win32::Graphics::Dxgi::{
    CreateDXGIFactory1, IDXGIDevice1, IDXGIFactory1, IDXGISwapChain, DXGI_PRESENT,
    DXGI_SWAP_CHAIN_DESC, DXGI_SWAP_EFFECT_SEQUENTIAL, DXGI_USAGE_RENDER_TARGET_OUTPUT,
};
use windows::Win32::System::LibraryLoader::GetModuleHandleW;
use windows::Win32::UI::Input::KeyboardAndMouse::{VK_CONTROL, VK_ESCAPE};
use windows::Win32::UI::WindowsAndMessaging::{
    AdjustWindowRect, CreateWindowExW, DefWindowProcW, DestroyWindow, DispatchMessageW,
    GetWindowLongPtrW, PeekMessageW, RegisterClassW, SetWindowLongPtrW, TranslateMessage,
    UnregisterClassW, CW_USEDEFAULT, GWLP_USERDATA, MSG, PM_REMOVE, WINDOW_EX_STYLE,
    WINDOW_STYLE, WM_DESTROY, WM_KEYDOWN, WM_KEYUP, WNDCLASSW, WS_OVERLAPPEDWINDOW,
    WS_THICKFRAME, WS_VISIBLE,
};

use crate::config::PixelFormat;
use crate::error::{GammaProbeError, GammaProbeResult, SetupErrorKind};
use crate::geometry::Sizei;

const WINDOW_CLASS_NAME: &str = "GammaProbeWindow";

// ============================================
// INPUT / LIFECYCLE STATE
// ============================================

/// State the window procedure mutates.
///
/// Boxed by the surface so its address stays stable for the context
/// pointer stored in GWLP_USERDATA.
struct WindowState {
    running: bool,
    keys: [bool; 256],
}

impl WindowState {
    fn wants_quit(&self) -> bool {
        const KEY_Q: usize = b'Q' as usize;
        (self.keys[KEY_Q] && self.keys[VK_CONTROL.0 as usize])
            || self.keys[VK_ESCAPE.0 as usize]
    }
}

// ============================================
// WINDOW PROCEDURE
// ============================================

unsafe extern "system" fn window_proc(
    hwnd: HWND,
    msg: u32,
    wparam: WPARAM,
    lparam: LPARAM,
) -> LRESULT {
    let state = unsafe { GetWindowLongPtrW(hwnd, GWLP_USERDATA) } as *mut WindowState;
    if state.is_null() {
        // Messages delivered before the context pointer is attached.
        return unsafe { DefWindowProcW(hwnd, msg, wparam, lparam) };
    }
    let state = unsafe { &mut *state };

    match msg {
        WM_KEYDOWN => state.keys[wparam.0 & 0xff] = true,
        WM_KEYUP => state.keys[wparam.0 & 0xff] = false,
        WM_DESTROY => state.running = false,
        _ => return unsafe { DefWindowProcW(hwnd, msg, wparam, lparam) },
    }

    if state.wants_quit() {
        state.running = false;
    }

    LRESULT(0)
}

fn wide(s: &str) -> Vec<u16> {
    s.encode_utf16().chain(Some(0)).collect()
}

// ============================================
// DISPLAY SURFACE
// ============================================

/// The mirror window, graphics device and swap chain.
pub struct DisplaySurface {
    state: Box<WindowState>,
    hwnd: HWND,
    size: Sizei,
    device: ID3D11Device,
    context: ID3D11DeviceContext,
    swap_chain: IDXGISwapChain,
    back_buffer: ID3D11Texture2D,
    _back_buffer_view: ID3D11RenderTargetView,
}

impl DisplaySurface {
    /// Creates the window, device, swap chain and back buffer view.
    ///
    /// Every step failure is a typed, fatal setup error. The swap
    /// chain is double-buffered in the requested format, and the
    /// render-ahead queue is bounded to one frame to keep the mirror
    /// from adding latency in this low-latency HMD context.
    pub fn initialize(
        size: Sizei,
        format: PixelFormat,
        title: &str,
    ) -> GammaProbeResult<Self> {
        let mut state = Box::new(WindowState {
            running: true,
            keys: [false; 256],
        });

        let class_name = wide(WINDOW_CLASS_NAME);
        let title_wide = wide(title);

        let instance: HINSTANCE = unsafe { GetModuleHandleW(None) }
            .map_err(|e| setup(SetupErrorKind::WindowCreation(e.message())))?
            .into();

        let wc = WNDCLASSW {
            lpfnWndProc: Some(window_proc),
            hInstance: instance,
            lpszClassName: PCWSTR(class_name.as_ptr()),
            ..Default::default()
        };
        if unsafe { RegisterClassW(&wc) } == 0 {
            return Err(setup(SetupErrorKind::WindowClassRegistration));
        }

        // Fixed-size: overlapped window minus the sizing frame.
        let style = WINDOW_STYLE(WS_OVERLAPPEDWINDOW.0 & !WS_THICKFRAME.0);
        let mut rect = RECT {
            left: 0,
            top: 0,
            right: size.w,
            bottom: size.h,
        };
        unsafe { AdjustWindowRect(&mut rect, style, false.into()) }
            .map_err(|e| setup(SetupErrorKind::WindowCreation(e.message())))?;

        let hwnd = unsafe {
            CreateWindowExW(
                WINDOW_EX_STYLE::default(),
                PCWSTR(class_name.as_ptr()),
                PCWSTR(title_wide.as_ptr()),
                WINDOW_STYLE(style.0 | WS_VISIBLE.0),
                CW_USEDEFAULT,
                CW_USEDEFAULT,
                rect.right - rect.left,
                rect.bottom - rect.top,
                None,
                None,
                instance,
                None,
            )
        }
        .map_err(|e| setup(SetupErrorKind::WindowCreation(e.message())))?;

        // Context pointer for the window procedure, through the
        // platform's user-data mechanism.
        unsafe {
            SetWindowLongPtrW(hwnd, GWLP_USERDATA, state.as_mut() as *mut WindowState as isize);
        }

        // Adapter 0 is where the HMD's output lives for this tool.
        let factory: IDXGIFactory1 = unsafe { CreateDXGIFactory1() }
            .map_err(|e| setup(SetupErrorKind::AdapterEnumeration(e.message())))?;
        let adapter = unsafe { factory.EnumAdapters(0) }
            .map_err(|e| setup(SetupErrorKind::AdapterEnumeration(e.message())))?;

        let mut device: Option<ID3D11Device> = None;
        let mut context: Option<ID3D11DeviceContext> = None;
        unsafe {
            D3D11CreateDevice(
                &adapter,
                D3D_DRIVER_TYPE_UNKNOWN,
                HMODULE::default(),
                D3D11_CREATE_DEVICE_BGRA_SUPPORT,
                None,
                D3D11_SDK_VERSION,
                Some(&mut device),
                None,
                Some(&mut context),
            )
        }
        .map_err(|e| setup(SetupErrorKind::DeviceCreation(e.message())))?;
        let device =
            device.ok_or_else(|| setup(SetupErrorKind::DeviceCreation("no device".into())))?;
        let context =
            context.ok_or_else(|| setup(SetupErrorKind::DeviceCreation("no context".into())))?;

        let sc_desc = DXGI_SWAP_CHAIN_DESC {
            BufferDesc: DXGI_MODE_DESC {
                Width: size.w as u32,
                Height: size.h as u32,
                RefreshRate: DXGI_RATIONAL {
                    Numerator: 0,
                    Denominator: 1,
                },
                Format: format.to_dxgi(),
                ..Default::default()
            },
            SampleDesc: DXGI_SAMPLE_DESC {
                Count: 1,
                Quality: 0,
            },
            BufferUsage: DXGI_USAGE_RENDER_TARGET_OUTPUT,
            BufferCount: 2,
            OutputWindow: hwnd,
            Windowed: true.into(),
            SwapEffect: DXGI_SWAP_EFFECT_SEQUENTIAL,
            Flags: 0,
        };
        let mut swap_chain: Option<IDXGISwapChain> = None;
        unsafe { factory.CreateSwapChain(&device, &sc_desc, &mut swap_chain) }
            .ok()
            .map_err(|e| setup(SetupErrorKind::SwapChainCreation(e.message())))?;
        let swap_chain = swap_chain
            .ok_or_else(|| setup(SetupErrorKind::SwapChainCreation("no swap chain".into())))?;

        let back_buffer: ID3D11Texture2D = unsafe { swap_chain.GetBuffer(0) }
            .map_err(|e| setup(SetupErrorKind::RenderTargetView(e.message())))?;
        let mut view: Option<ID3D11RenderTargetView> = None;
        unsafe { device.CreateRenderTargetView(&back_buffer, None, Some(&mut view)) }
            .map_err(|e| setup(SetupErrorKind::RenderTargetView(e.message())))?;
        let back_buffer_view =
            view.ok_or_else(|| setup(SetupErrorKind::RenderTargetView("no view".into())))?;

        // At most one frame queued ahead of the GPU.
        let dxgi_device: IDXGIDevice1 = device
            .cast()
            .map_err(|e| setup(SetupErrorKind::FrameLatencyConfiguration(e.message())))?;
        unsafe { dxgi_device.SetMaximumFrameLatency(1) }
            .map_err(|e| setup(SetupErrorKind::FrameLatencyConfiguration(e.message())))?;

        info!(
            "Display surface up: {}x{}, {:?}, frame latency 1",
            size.w, size.h, format
        );

        Ok(Self {
            state,
            hwnd,
            size,
            device,
            context,
            swap_chain,
            back_buffer,
            _back_buffer_view: back_buffer_view,
        })
    }

    /// Drains all pending window messages without blocking.
    ///
    /// Returns false once the surface should stop running (window
    /// destroyed, Escape, or Ctrl+Q).
    pub fn pump_events(&mut self) -> bool {
        let mut msg = MSG::default();
        unsafe {
            while PeekMessageW(&mut msg, None, 0, 0, PM_REMOVE).as_bool() {
                let _ = TranslateMessage(&msg);
                DispatchMessageW(&msg);
            }
        }
        self.state.running
    }

    /// Flips the back buffer to the screen, no vsync wait.
    pub fn present(&self) {
        if let Err(e) = unsafe { self.swap_chain.Present(0, DXGI_PRESENT(0)) }.ok() {
            warn!("Present failed: {}", e.message());
        }
    }

    pub fn device(&self) -> &ID3D11Device {
        &self.device
    }

    pub fn context(&self) -> &ID3D11DeviceContext {
        &self.context
    }

    pub fn back_buffer(&self) -> &ID3D11Texture2D {
        &self.back_buffer
    }

    /// Client-area size in pixels.
    pub fn size(&self) -> Sizei {
        self.size
    }
}

impl Drop for DisplaySurface {
    fn drop(&mut self) {
        // Detach the context pointer before the state box dies.
        unsafe {
            SetWindowLongPtrW(self.hwnd, GWLP_USERDATA, 0);
            let _ = DestroyWindow(self.hwnd);
            if let Ok(module) = GetModuleHandleW(None) {
                let class_name = wide(WINDOW_CLASS_NAME);
                let _ = UnregisterClassW(PCWSTR(class_name.as_ptr()), HINSTANCE::from(module));
            }
        }
    }
}

fn setup(kind: SetupErrorKind) -> GammaProbeError {
    GammaProbeError::Setup(kind)
}
