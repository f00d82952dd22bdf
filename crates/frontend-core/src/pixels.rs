//! Pixel channel-order helpers
//!
//! Frames leave the bridge as RGBA8 with straight alpha. Capture primitives
//! that produce something else convert through here.

/// Bytes per RGBA8 pixel
pub const BYTES_PER_PIXEL: usize = 4;

/// Byte length of a `width` x `height` RGBA8 buffer, or `None` on overflow
pub fn rgba_len(width: u32, height: u32) -> Option<usize> {
    (width as usize)
        .checked_mul(height as usize)?
        .checked_mul(BYTES_PER_PIXEL)
}

/// Convert premultiplied BGRA (Cairo ARGB32 on little-endian) to straight RGBA
pub fn bgra_premultiplied_to_rgba(data: &[u8]) -> Vec<u8> {
    let mut rgba = Vec::with_capacity(data.len());

    for chunk in data.chunks_exact(BYTES_PER_PIXEL) {
        let b = chunk[0];
        let g = chunk[1];
        let r = chunk[2];
        let a = chunk[3];

        // Un-premultiply alpha if needed
        let (r, g, b) = if a > 0 && a < 255 {
            (unpremultiply(r, a), unpremultiply(g, a), unpremultiply(b, a))
        } else {
            (r, g, b)
        };

        rgba.extend_from_slice(&[r, g, b, a]);
    }

    rgba
}

fn unpremultiply(channel: u8, alpha: u8) -> u8 {
    let value = (u32::from(channel) * 255 + u32::from(alpha) / 2) / u32::from(alpha);
    value.min(255) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rgba_len() {
        assert_eq!(rgba_len(800, 600), Some(800 * 600 * 4));
        assert_eq!(rgba_len(0, 600), Some(0));
        assert_eq!(rgba_len(u32::MAX, u32::MAX), None);
    }

    #[test]
    fn test_opaque_pixels_swap_red_and_blue() {
        let bgra = [10, 20, 30, 255, 0, 0, 0, 0];
        assert_eq!(bgra_premultiplied_to_rgba(&bgra), vec![30, 20, 10, 255, 0, 0, 0, 0]);
    }

    #[test]
    fn test_translucent_pixels_are_unpremultiplied() {
        // 50% white premultiplied is (128, 128, 128, 128)
        let bgra = [128, 128, 128, 128];
        assert_eq!(bgra_premultiplied_to_rgba(&bgra), vec![255, 255, 255, 128]);
    }

    #[test]
    fn test_trailing_partial_pixel_is_ignored() {
        let bgra = [1, 2, 3, 255, 9, 9];
        assert_eq!(bgra_premultiplied_to_rgba(&bgra).len(), 4);
    }
}
