//! WebKit capture using Cairo snapshots

use std::cell::RefCell;
use std::rc::Rc;
use std::time::{Duration, Instant};

use cairo::{Format, ImageSurface};
use gio::Cancellable;
use webkit2gtk::{SnapshotOptions, SnapshotRegion, WebViewExt};
use webtexture_frontend_core::pixels::{bgra_premultiplied_to_rgba, BYTES_PER_PIXEL};
use webtexture_frontend_core::FrontendError;

use crate::WebKitEngine;

/// How long a render may pump GTK waiting for the snapshot callback
pub const SNAPSHOT_DEADLINE: Duration = Duration::from_millis(80);

type SnapshotSlot = Rc<RefCell<Option<Result<image::RgbaImage, FrontendError>>>>;

impl WebKitEngine {
    /// Snapshot the visible viewport as straight-alpha RGBA
    ///
    /// WebKit delivers snapshots asynchronously; this pumps the GTK main
    /// loop until the callback fires or [`SNAPSHOT_DEADLINE`] passes. A
    /// snapshot that completes after the deadline is discarded.
    pub fn snapshot(&mut self) -> Result<image::RgbaImage, FrontendError> {
        let slot: SnapshotSlot = Rc::new(RefCell::new(None));
        let result_slot = slot.clone();
        let (width, height) = self.size;

        // Use Visible region to capture exactly the viewport (not the full document)
        self.webkit_webview.snapshot(
            SnapshotRegion::Visible,
            SnapshotOptions::TRANSPARENT_BACKGROUND,
            Cancellable::NONE,
            move |result| {
                let converted = result
                    .map_err(|e| FrontendError::CaptureFailed(e.to_string()))
                    .and_then(|surface| cairo_surface_to_rgba(&surface, width, height));
                *result_slot.borrow_mut() = Some(converted);
            },
        );

        let deadline = Instant::now() + SNAPSHOT_DEADLINE;
        while slot.borrow().is_none() {
            if Instant::now() >= deadline {
                return Err(FrontendError::CaptureFailed(format!(
                    "snapshot not delivered within {:?}",
                    SNAPSHOT_DEADLINE
                )));
            }
            if gtk::events_pending() {
                gtk::main_iteration_do(false);
            } else {
                std::thread::sleep(Duration::from_millis(1));
            }
        }

        slot.borrow_mut()
            .take()
            .unwrap_or_else(|| Err(FrontendError::CaptureFailed("snapshot slot empty".into())))
    }
}

/// Convert a Cairo surface to an RGBA image at the specified dimensions
/// Uses explicit width/height instead of extracting from surface for reliable sizing
pub fn cairo_surface_to_rgba(
    surface: &cairo::Surface,
    width: u32,
    height: u32,
) -> Result<image::RgbaImage, FrontendError> {
    let cairo_err =
        |what: &str, e: cairo::Error| FrontendError::CaptureFailed(format!("{what}: {e}"));
    let (w, h) = match (i32::try_from(width), i32::try_from(height)) {
        (Ok(w), Ok(h)) if w > 0 && h > 0 => (w, h),
        _ => return Err(FrontendError::InvalidDimensions { width, height }),
    };

    tracing::trace!("Converting Cairo surface to RGBA at {}x{}", width, height);

    let mut img_surface = ImageSurface::create(Format::ARgb32, w, h)
        .map_err(|e| cairo_err("Failed to create image surface", e))?;

    let ctx = cairo::Context::new(&img_surface)
        .map_err(|e| cairo_err("Failed to create context", e))?;
    ctx.set_source_surface(surface, 0.0, 0.0)
        .map_err(|e| cairo_err("Failed to set source surface", e))?;
    ctx.paint().map_err(|e| cairo_err("Failed to paint", e))?;
    drop(ctx);
    img_surface.flush();

    let stride = img_surface.stride() as usize;
    let row_len = width as usize * BYTES_PER_PIXEL;
    let data = img_surface
        .data()
        .map_err(|e| FrontendError::CaptureFailed(format!("Failed to get surface data: {e}")))?;

    // Rows may be padded past width * 4
    let mut packed = Vec::with_capacity(row_len * height as usize);
    for row in data.chunks(stride).take(height as usize) {
        packed.extend_from_slice(&row[..row_len.min(row.len())]);
    }

    image::RgbaImage::from_raw(width, height, bgra_premultiplied_to_rgba(&packed))
        .ok_or_else(|| FrontendError::CaptureFailed("snapshot size mismatch".into()))
}
