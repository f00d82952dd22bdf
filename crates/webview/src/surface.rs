//! Surface and pixel buffer ownership
//!
//! The surface is the render target the engine draws into; the pixel buffer
//! mirrors it after every capture. Both are sized for one viewport and are
//! replaced as a pair, never resized in place.

use image::{Rgba, RgbaImage};
use webtexture_config::MAX_SURFACE_DIMENSION;
use webtexture_frontend_core::pixels::rgba_len;
use webtexture_frontend_core::{BrowserEngine, Frame};

use crate::error::WebviewError;

/// A render target and the buffer that mirrors it, allocated together
#[derive(Debug)]
pub struct SurfacePair {
    surface: RgbaImage,
    buffer: Vec<u8>,
}

impl SurfacePair {
    pub fn width(&self) -> u32 {
        self.surface.width()
    }

    pub fn height(&self) -> u32 {
        self.surface.height()
    }

    pub fn buffer(&self) -> &[u8] {
        &self.buffer
    }
}

/// Owns the current surface pair. Lives on the surface-owning thread only.
#[derive(Debug, Default)]
pub struct SurfaceBufferManager {
    pair: Option<SurfacePair>,
}

impl SurfaceBufferManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a zeroed surface and buffer for `width` x `height`
    pub fn allocate(width: u32, height: u32) -> Result<SurfacePair, WebviewError> {
        if width == 0
            || height == 0
            || width > MAX_SURFACE_DIMENSION
            || height > MAX_SURFACE_DIMENSION
        {
            return Err(WebviewError::InvalidDimensions { width, height });
        }
        let len =
            rgba_len(width, height).ok_or(WebviewError::InvalidDimensions { width, height })?;

        let surface = RgbaImage::from_raw(width, height, zeroed(width, height, len)?)
            .ok_or_else(|| WebviewError::Allocation {
                width,
                height,
                reason: "surface size mismatch".to_string(),
            })?;
        let buffer = zeroed(width, height, len)?;

        Ok(SurfacePair { surface, buffer })
    }

    /// Replace the current pair with a fresh one.
    ///
    /// The new pair is allocated before the old one is released, so on error
    /// the previous pair stays in place and remains usable.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), WebviewError> {
        let pair = Self::allocate(width, height)?;
        self.pair = Some(pair);
        Ok(())
    }

    pub fn dimensions(&self) -> Option<(u32, u32)> {
        self.pair.as_ref().map(|p| (p.width(), p.height()))
    }

    pub fn pair(&self) -> Option<&SurfacePair> {
        self.pair.as_ref()
    }

    /// Paint the background, let the engine draw, mirror into the buffer,
    /// and hand back a snapshot the caller owns outright.
    pub fn render_frame(
        &mut self,
        background: [u8; 4],
        engine: &mut dyn BrowserEngine,
    ) -> Result<Frame, WebviewError> {
        let pair = self.pair.as_mut().ok_or(WebviewError::NoSurface)?;

        for pixel in pair.surface.pixels_mut() {
            *pixel = Rgba(background);
        }
        engine.render(&mut pair.surface)?;
        pair.buffer.copy_from_slice(pair.surface.as_raw());

        Ok(Frame {
            pixels: pair.buffer.clone(),
            width: pair.surface.width(),
            height: pair.surface.height(),
        })
    }

    /// Drop the pair; later renders fail with `NoSurface`
    pub fn release(&mut self) {
        self.pair = None;
    }
}

fn zeroed(width: u32, height: u32, len: usize) -> Result<Vec<u8>, WebviewError> {
    let mut bytes = Vec::new();
    bytes
        .try_reserve_exact(len)
        .map_err(|e| WebviewError::Allocation {
            width,
            height,
            reason: e.to_string(),
        })?;
    bytes.resize(len, 0);
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use webtexture_frontend_core::{FrontendError, ScriptCallback};
    use webtexture_ipc::{KeyboardEvent, PointerEvent};

    /// Paints the top-left pixel red, or fails on demand
    struct DotEngine {
        fail: bool,
    }

    impl BrowserEngine for DotEngine {
        fn load_url(&mut self, _url: &str) {}
        fn go_back(&mut self) {}
        fn go_forward(&mut self) {}
        fn can_go_back(&self) -> bool {
            false
        }
        fn can_go_forward(&self) -> bool {
            false
        }
        fn reload(&mut self) {}
        fn stop_loading(&mut self) {}
        fn resize(&mut self, _width: u32, _height: u32) {}
        fn render(&mut self, target: &mut RgbaImage) -> Result<(), FrontendError> {
            if self.fail {
                return Err(FrontendError::CaptureFailed("boom".into()));
            }
            target.put_pixel(0, 0, Rgba([255, 0, 0, 255]));
            Ok(())
        }
        fn dispatch_pointer(&mut self, _event: PointerEvent) {}
        fn dispatch_key(&mut self, _event: &KeyboardEvent) {}
        fn evaluate_script(&mut self, _script: &str, _on_result: Option<ScriptCallback>) {}
    }

    #[test]
    fn test_allocate_is_zeroed_and_sized() {
        let pair = SurfaceBufferManager::allocate(8, 4).unwrap();
        assert_eq!((pair.width(), pair.height()), (8, 4));
        assert_eq!(pair.buffer().len(), 8 * 4 * 4);
        assert!(pair.buffer().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_allocate_rejects_zero_and_oversized() {
        assert!(matches!(
            SurfaceBufferManager::allocate(0, 10),
            Err(WebviewError::InvalidDimensions { .. })
        ));
        assert!(matches!(
            SurfaceBufferManager::allocate(MAX_SURFACE_DIMENSION + 1, 10),
            Err(WebviewError::InvalidDimensions { .. })
        ));
    }

    #[test]
    fn test_failed_resize_keeps_previous_pair() {
        let mut manager = SurfaceBufferManager::new();
        manager.resize(100, 100).unwrap();

        assert!(manager.resize(0, 50).is_err());
        assert_eq!(manager.dimensions(), Some((100, 100)));

        manager.resize(50, 50).unwrap();
        assert_eq!(manager.dimensions(), Some((50, 50)));
        assert_eq!(manager.pair().unwrap().buffer().len(), 50 * 50 * 4);
    }

    #[test]
    fn test_render_frame_paints_background_then_content() {
        let mut manager = SurfaceBufferManager::new();
        manager.resize(2, 2).unwrap();

        let frame = manager
            .render_frame([255, 255, 255, 255], &mut DotEngine { fail: false })
            .unwrap();

        assert_eq!(frame.pixels.len(), 2 * 2 * 4);
        assert_eq!(&frame.pixels[0..4], &[255, 0, 0, 255]);
        assert_eq!(&frame.pixels[4..8], &[255, 255, 255, 255]);
        assert_eq!(manager.pair().unwrap().buffer(), frame.pixels.as_slice());
    }

    #[test]
    fn test_render_frame_without_surface_or_with_failing_engine() {
        let mut manager = SurfaceBufferManager::new();
        assert!(matches!(
            manager.render_frame([0; 4], &mut DotEngine { fail: false }),
            Err(WebviewError::NoSurface)
        ));

        manager.resize(2, 2).unwrap();
        assert!(matches!(
            manager.render_frame([0; 4], &mut DotEngine { fail: true }),
            Err(WebviewError::Frontend(_))
        ));
    }
}
