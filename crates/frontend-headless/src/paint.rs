//! Deterministic page painting

use image::{Rgba, RgbaImage};

/// Document-space height of one body stripe
pub const STRIPE_HEIGHT: u32 = 32;

const STRIPE_COLOR: Rgba<u8> = Rgba([230, 230, 230, 255]);
const POINTER_COLOR: Rgba<u8> = Rgba([20, 20, 20, 255]);
const POINTER_RADIUS: i64 = 3;

/// What to draw for the current page
#[derive(Debug, Clone, Copy)]
pub struct PageView<'a> {
    pub url: &'a str,
    pub scroll_y: f64,
    pub pointer: Option<(f32, f32)>,
}

/// Paint `page` over `target`. `about:blank` leaves the background alone.
pub fn paint(target: &mut RgbaImage, page: &PageView<'_>) {
    if page.url == "about:blank" {
        return;
    }

    let (width, height) = target.dimensions();
    let header = (height / 8).max(1);
    let accent = accent_color(page.url);
    let scroll = page.scroll_y.max(0.0) as u32;

    for y in 0..height {
        let doc_y = y.saturating_add(scroll);
        let color = if doc_y < header {
            Some(accent)
        } else if (doc_y / STRIPE_HEIGHT) % 2 == 0 {
            Some(STRIPE_COLOR)
        } else {
            None
        };
        if let Some(color) = color {
            for x in 0..width {
                target.put_pixel(x, y, color);
            }
        }
    }

    if let Some((px, py)) = page.pointer {
        paint_dot(target, px as i64, py as i64);
    }
}

fn paint_dot(target: &mut RgbaImage, cx: i64, cy: i64) {
    let (width, height) = target.dimensions();
    for dy in -POINTER_RADIUS..=POINTER_RADIUS {
        for dx in -POINTER_RADIUS..=POINTER_RADIUS {
            if dx * dx + dy * dy > POINTER_RADIUS * POINTER_RADIUS {
                continue;
            }
            let (x, y) = (cx + dx, cy + dy);
            if (0..width as i64).contains(&x) && (0..height as i64).contains(&y) {
                target.put_pixel(x as u32, y as u32, POINTER_COLOR);
            }
        }
    }
}

/// Stable per-URL header color (FNV-1a over the URL bytes)
pub fn accent_color(url: &str) -> Rgba<u8> {
    let hash = url
        .bytes()
        .fold(0xcbf2_9ce4_8422_2325_u64, |h, b| {
            (h ^ u64::from(b)).wrapping_mul(0x0000_0100_0000_01b3)
        });
    let [r, g, b, ..] = hash.to_le_bytes();
    // Keep the header distinguishable from a white background
    Rgba([r / 2, g / 2, b / 2, 255])
}

#[cfg(test)]
mod tests {
    use super::*;

    const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

    fn page(url: &str) -> PageView<'_> {
        PageView {
            url,
            scroll_y: 0.0,
            pointer: None,
        }
    }

    #[test]
    fn test_blank_page_keeps_background() {
        let mut target = RgbaImage::from_pixel(16, 16, WHITE);
        paint(&mut target, &page("about:blank"));
        assert!(target.pixels().all(|p| *p == WHITE));
    }

    #[test]
    fn test_header_uses_url_accent() {
        let mut target = RgbaImage::from_pixel(16, 64, WHITE);
        paint(&mut target, &page("https://example.com/"));
        assert_eq!(*target.get_pixel(0, 0), accent_color("https://example.com/"));
        assert_ne!(
            accent_color("https://example.com/"),
            accent_color("https://example.org/")
        );
    }

    #[test]
    fn test_scroll_shifts_stripes() {
        let mut top = RgbaImage::from_pixel(4, 256, WHITE);
        let mut scrolled = top.clone();
        paint(&mut top, &page("https://example.com/"));
        paint(
            &mut scrolled,
            &PageView {
                scroll_y: f64::from(STRIPE_HEIGHT),
                ..page("https://example.com/")
            },
        );
        // Row 64 is a painted stripe at the top; one stripe later it is not
        assert_eq!(*top.get_pixel(0, 64), STRIPE_COLOR);
        assert_eq!(*scrolled.get_pixel(0, 64), WHITE);
    }

    #[test]
    fn test_pointer_dot_is_clipped_to_surface() {
        let mut target = RgbaImage::from_pixel(8, 8, WHITE);
        paint(
            &mut target,
            &PageView {
                pointer: Some((0.0, 0.0)),
                ..page("about:srcdoc")
            },
        );
        assert_eq!(*target.get_pixel(0, 0), POINTER_COLOR);
    }
}
