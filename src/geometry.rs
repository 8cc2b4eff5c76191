//! # Geometry Types
//!
//! Small integer value types for sizes, offsets and viewport
//! rectangles, plus the per-eye viewport derivation.
//!
//! ## Plain English
//!
//! The headset display is one wide panel that both eyes share.
//! We split it down the middle: the left eye gets the left half,
//! the right eye gets the right half, both at full height.

// ============================================
// VALUE TYPES
// ============================================

/// A 2D size in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Sizei {
    pub w: i32,
    pub h: i32,
}

impl Sizei {
    pub fn new(w: i32, h: i32) -> Self {
        Self { w, h }
    }
}

/// A 2D integer offset.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Vector2i {
    pub x: i32,
    pub y: i32,
}

/// An axis-aligned rectangle: offset plus size.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Recti {
    pub pos: Vector2i,
    pub size: Sizei,
}

impl Recti {
    /// A rectangle anchored at the origin.
    pub fn at_origin(size: Sizei) -> Self {
        Self {
            pos: Vector2i::default(),
            size,
        }
    }
}

// ============================================
// EYE VIEWPORT DERIVATION
// ============================================

/// Number of eyes in a stereo pair. Always two.
pub const EYE_COUNT: usize = 2;

/// Derives the per-eye render viewports from the display size.
///
/// Each eye renders into its own texture ring, so both viewports sit
/// at the origin of their respective targets: half the display width,
/// full height. Together they span the full display when composed
/// side by side in the mirror.
///
/// ## Example
/// ```
/// # use gamma_probe::geometry::{eye_viewports, Sizei};
/// let vps = eye_viewports(Sizei::new(1920, 1080));
/// assert_eq!(vps[0].size, Sizei::new(960, 1080));
/// ```
pub fn eye_viewports(display: Sizei) -> [Recti; EYE_COUNT] {
    let eye_size = Sizei::new(display.w / 2, display.h);
    [Recti::at_origin(eye_size), Recti::at_origin(eye_size)]
}

// ============================================
// TESTS
// ============================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_viewport_size_is_half_width_full_height() {
        let vps = eye_viewports(Sizei::new(1920, 1080));

        for vp in &vps {
            assert_eq!(vp.pos, Vector2i::default());
            assert_eq!(vp.size, Sizei::new(960, 1080));
        }
    }

    #[test]
    fn test_viewports_jointly_span_display_width() {
        let display = Sizei::new(2160, 1200);
        let vps = eye_viewports(display);

        // Composed side by side the eyes cover the display exactly,
        // with no overlap between the halves.
        let left_end = vps[0].size.w;
        let right_start = left_end;
        let right_end = right_start + vps[1].size.w;

        assert_eq!(right_end, display.w);
        assert!(right_start >= left_end);
    }

    #[test]
    fn test_rect_at_origin() {
        let r = Recti::at_origin(Sizei::new(10, 20));
        assert_eq!(r.pos.x, 0);
        assert_eq!(r.pos.y, 0);
        assert_eq!(r.size.w, 10);
        assert_eq!(r.size.h, 20);
    }
}
