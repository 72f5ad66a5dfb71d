//! PPU (Picture Processing Unit)
//!
//! Two independent halves:
//! - the dot/scanline stepper that keeps the 3:1 PPU/CPU clock relationship
//!   (341 dots per scanline, 262 scanlines per NTSC frame)
//! - a [`FrameSource`] that fills the frame buffer for a given tick. The
//!   default [`TestPattern`] is a synthetic stand-in for a pixel pipeline
//!   and does not look at any register state.

use std::fmt;

/// Visible frame width in pixels
pub const FRAME_WIDTH: usize = 256;
/// Visible frame height in pixels
pub const FRAME_HEIGHT: usize = 240;
/// Bytes per pixel (RGB)
pub const BYTES_PER_PIXEL: usize = 3;

/// Dots per scanline
pub const DOTS_PER_SCANLINE: u16 = 341;
/// Scanlines per NTSC frame
pub const SCANLINES_PER_FRAME: u16 = 262;

/// Ticks each test pattern stays on screen
const PATTERN_PERIOD: u64 = 60;

const COLOR_BARS: [[u8; 3]; 8] = [
    [255, 0, 0],   // Red
    [255, 128, 0], // Orange
    [255, 255, 0], // Yellow
    [0, 255, 0],   // Green
    [0, 255, 255], // Cyan
    [0, 0, 255],   // Blue
    [128, 0, 255], // Purple
    [255, 0, 255], // Magenta
];

/// RGB frame buffer, row-major, `height x width x 3`
#[derive(Clone, PartialEq, Eq)]
pub struct FrameBuffer {
    pixels: Vec<u8>,
}

impl FrameBuffer {
    pub fn new() -> Self {
        Self {
            pixels: vec![0; FRAME_WIDTH * FRAME_HEIGHT * BYTES_PER_PIXEL],
        }
    }

    pub fn width(&self) -> usize {
        FRAME_WIDTH
    }

    pub fn height(&self) -> usize {
        FRAME_HEIGHT
    }

    /// Raw RGB bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.pixels
    }

    pub fn pixel(&self, x: usize, y: usize) -> [u8; 3] {
        let i = Self::index(x, y);
        [self.pixels[i], self.pixels[i + 1], self.pixels[i + 2]]
    }

    pub fn set_pixel(&mut self, x: usize, y: usize, rgb: [u8; 3]) {
        let i = Self::index(x, y);
        self.pixels[i..i + BYTES_PER_PIXEL].copy_from_slice(&rgb);
    }

    fn index(x: usize, y: usize) -> usize {
        assert!(x < FRAME_WIDTH && y < FRAME_HEIGHT, "pixel ({}, {}) out of frame", x, y);
        (y * FRAME_WIDTH + x) * BYTES_PER_PIXEL
    }
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for FrameBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameBuffer")
            .field("width", &FRAME_WIDTH)
            .field("height", &FRAME_HEIGHT)
            .finish_non_exhaustive()
    }
}

/// Something that produces a frame for a tick
pub trait FrameSource {
    /// Fill `frame` for `tick`. Implementations must be deterministic in `tick`.
    fn render(&mut self, tick: u64, frame: &mut FrameBuffer);
}

/// Which synthetic pattern a tick shows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pattern {
    ScrollingGradient,
    Checkerboard,
    SineWave,
    ColorBars,
}

impl Pattern {
    /// Patterns rotate every 60 ticks
    pub fn for_tick(tick: u64) -> Self {
        match (tick / PATTERN_PERIOD) % 4 {
            0 => Pattern::ScrollingGradient,
            1 => Pattern::Checkerboard,
            2 => Pattern::SineWave,
            _ => Pattern::ColorBars,
        }
    }
}

/// Diagnostic frame source cycling through four procedural patterns
#[derive(Debug, Clone, Copy, Default)]
pub struct TestPattern;

impl TestPattern {
    /// Color of one pixel; pure in (`tick`, `x`, `y`)
    pub fn pixel(tick: u64, x: usize, y: usize) -> [u8; 3] {
        let (x64, y64) = (x as u64, y as u64);
        match Pattern::for_tick(tick) {
            Pattern::ScrollingGradient => [
                (x64.wrapping_add(tick.wrapping_mul(2)) % 256) as u8,
                (y64.wrapping_add(tick) % 256) as u8,
                ((x64 * y64 / 256).wrapping_add(tick.wrapping_mul(3)) % 256) as u8,
            ],
            Pattern::Checkerboard => {
                let color: u8 = if (x / 16 + y / 16) % 2 == 1 { 255 } else { 0 };
                let shift = (tick.wrapping_mul(4) % 256) as u8;
                [color, color.wrapping_add(shift), shift]
            }
            Pattern::SineWave => {
                let phase = (x as f64 + (tick as f64) * 2.0) * 0.05;
                let wave = (128.0 + 127.0 * phase.sin()) as i32 as u8;
                [wave, 255 - wave, (tick.wrapping_mul(2) % 256) as u8]
            }
            Pattern::ColorBars => COLOR_BARS[(x / 32) % COLOR_BARS.len()],
        }
    }
}

impl FrameSource for TestPattern {
    fn render(&mut self, tick: u64, frame: &mut FrameBuffer) {
        for y in 0..FRAME_HEIGHT {
            for x in 0..FRAME_WIDTH {
                frame.set_pixel(x, y, Self::pixel(tick, x, y));
            }
        }
    }
}

/// PPU state
#[derive(Debug, Clone)]
pub struct Ppu<S = TestPattern> {
    frame: FrameBuffer,
    /// Dot position (0-340)
    dot: u16,
    /// Scanline position (0-261)
    scanline: u16,
    /// Frames rendered since the last counter reset
    frame_count: u64,
    source: S,
}

impl Ppu<TestPattern> {
    /// Create a new PPU instance with the test pattern source
    pub fn new() -> Self {
        Self::with_source(TestPattern)
    }
}

impl Default for Ppu<TestPattern> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: FrameSource> Ppu<S> {
    pub fn with_source(source: S) -> Self {
        Self {
            frame: FrameBuffer::new(),
            dot: 0,
            scanline: 0,
            frame_count: 0,
            source,
        }
    }

    /// Step the PPU by one dot
    pub fn step(&mut self) {
        self.dot += 1;

        if self.dot >= DOTS_PER_SCANLINE {
            self.dot = 0;
            self.scanline += 1;

            if self.scanline >= SCANLINES_PER_FRAME {
                self.scanline = 0;
            }
        }
    }

    /// Render the frame for `tick` and return it
    pub fn render_frame(&mut self, tick: u64) -> &FrameBuffer {
        self.source.render(tick, &mut self.frame);
        self.frame_count += 1;
        &self.frame
    }

    /// Last rendered frame
    pub fn frame(&self) -> &FrameBuffer {
        &self.frame
    }

    pub fn reset_frame_count(&mut self) {
        self.frame_count = 0;
    }

    pub fn dot(&self) -> u16 {
        self.dot
    }

    pub fn scanline(&self) -> u16 {
        self.scanline
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn source(&self) -> &S {
        &self.source
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dot_wraps_into_next_scanline() {
        let mut ppu = Ppu::new();
        for _ in 0..340 {
            ppu.step();
        }
        assert_eq!((ppu.scanline(), ppu.dot()), (0, 340));
        ppu.step();
        assert_eq!((ppu.scanline(), ppu.dot()), (1, 0));
    }

    #[test]
    fn test_full_frame_wraps_to_origin() {
        let mut ppu = Ppu::new();
        for _ in 0..(341 * 262) {
            ppu.step();
        }
        assert_eq!((ppu.scanline(), ppu.dot()), (0, 0));
    }

    #[test]
    fn test_pattern_selection() {
        assert_eq!(Pattern::for_tick(0), Pattern::ScrollingGradient);
        assert_eq!(Pattern::for_tick(59), Pattern::ScrollingGradient);
        assert_eq!(Pattern::for_tick(60), Pattern::Checkerboard);
        assert_eq!(Pattern::for_tick(120), Pattern::SineWave);
        assert_eq!(Pattern::for_tick(180), Pattern::ColorBars);
        assert_eq!(Pattern::for_tick(240), Pattern::ScrollingGradient);
    }

    #[test]
    fn test_gradient_pixels() {
        assert_eq!(TestPattern::pixel(1, 0, 0), [2, 1, 3]);
        // 255 * 239 / 256 = 238
        assert_eq!(TestPattern::pixel(10, 255, 239), [19, 249, 12]);
    }

    #[test]
    fn test_checkerboard_pixels() {
        assert_eq!(TestPattern::pixel(60, 0, 0), [0, 240, 240]);
        assert_eq!(TestPattern::pixel(60, 16, 0), [255, 239, 240]);
    }

    #[test]
    fn test_sine_pixels_stay_in_range() {
        for x in 0..FRAME_WIDTH {
            let [r, g, b] = TestPattern::pixel(130, x, 0);
            assert!(r >= 1);
            assert_eq!(g, 255 - r);
            assert_eq!(b, 4);
        }
    }

    #[test]
    fn test_color_bars() {
        assert_eq!(TestPattern::pixel(200, 0, 100), [255, 0, 0]);
        assert_eq!(TestPattern::pixel(200, 255, 0), [255, 0, 255]);
    }

    #[test]
    fn test_render_frame_counts() {
        let mut ppu = Ppu::new();
        ppu.render_frame(1);
        ppu.render_frame(2);
        assert_eq!(ppu.frame_count(), 2);
        ppu.reset_frame_count();
        assert_eq!(ppu.frame_count(), 0);
    }
}
