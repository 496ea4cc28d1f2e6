//! Colorspace Converter: transforms a packed RGB24 buffer of known
//! geometry into RGB24 (identity), packed 4:2:2 UYVY, or planar 4:2:0,
//! per `spec.md` §4.2. BT.601 limited-range coefficients, round-half-to-even.

use thiserror::Error;
use vts_format::Colorspace;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConvertError {
    #[error("input buffer length {actual} does not match declared geometry {width}x{height} ({expected} bytes)")]
    GeometryMismatch {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },
}

/// Converts an RGB24 buffer to the requested colorspace, returning a freshly
/// allocated buffer of the declared size. RGB24 is returned unmodified
/// (copy, not zero-copy, to keep the return type uniform).
pub fn convert(
    rgb: &[u8],
    width: u32,
    height: u32,
    target: Colorspace,
) -> Result<Vec<u8>, ConvertError> {
    let expected = (width as usize) * (height as usize) * 3;
    if rgb.len() != expected {
        return Err(ConvertError::GeometryMismatch {
            width,
            height,
            expected,
            actual: rgb.len(),
        });
    }

    Ok(match target {
        Colorspace::Rgb24 => rgb.to_vec(),
        Colorspace::Yuv422 => rgb_to_uyvy(rgb, width, height),
        Colorspace::Yuv420p => rgb_to_yuv420p(rgb, width, height),
    })
}

/// Round-half-to-even, clamped to `[0, 255]`.
fn round_clamp(x: f64) -> u8 {
    let x = x.clamp(0.0, 255.0);
    let floor = x.floor();
    let diff = x - floor;
    let rounded = if diff < 0.5 {
        floor
    } else if diff > 0.5 {
        floor + 1.0
    } else if (floor as i64) % 2 == 0 {
        floor
    } else {
        floor + 1.0
    };
    rounded as u8
}

fn bt601_y(r: u8, g: u8, b: u8) -> f64 {
    0.299 * r as f64 + 0.587 * g as f64 + 0.114 * b as f64
}

fn bt601_u(r: u8, g: u8, b: u8) -> f64 {
    -0.169 * r as f64 - 0.331 * g as f64 + 0.500 * b as f64 + 128.0
}

fn bt601_v(r: u8, g: u8, b: u8) -> f64 {
    0.500 * r as f64 - 0.419 * g as f64 - 0.081 * b as f64 + 128.0
}

/// Reads the pixel at `(x, y)`, clamping out-of-range coordinates to the
/// last valid row/column. This implements the spec's "duplicate the
/// right-most pixel"/"duplicate the bottom row" edge-case rules without a
/// separate padding pass.
fn pixel_at(rgb: &[u8], width: u32, height: u32, x: u32, y: u32) -> (u8, u8, u8) {
    let x = x.min(width - 1) as usize;
    let y = y.min(height - 1) as usize;
    let idx = (y * width as usize + x) * 3;
    (rgb[idx], rgb[idx + 1], rgb[idx + 2])
}

/// Packed 4:2:2, byte order `U0 Y0 V0 Y1 | U2 Y2 V2 Y3 | ...`.
fn rgb_to_uyvy(rgb: &[u8], width: u32, height: u32) -> Vec<u8> {
    let eff_w = width + (width % 2);
    let mut out = Vec::with_capacity((eff_w as usize) * height as usize * 2);

    for y in 0..height {
        let mut x = 0;
        while x < eff_w {
            let (r0, g0, b0) = pixel_at(rgb, width, height, x, y);
            let (r1, g1, b1) = pixel_at(rgb, width, height, x + 1, y);

            let y0 = round_clamp(bt601_y(r0, g0, b0));
            let y1 = round_clamp(bt601_y(r1, g1, b1));
            let u = round_clamp((bt601_u(r0, g0, b0) + bt601_u(r1, g1, b1)) / 2.0);
            let v = round_clamp((bt601_v(r0, g0, b0) + bt601_v(r1, g1, b1)) / 2.0);

            out.push(u);
            out.push(y0);
            out.push(v);
            out.push(y1);

            x += 2;
        }
    }

    out
}

/// Planar 4:2:0: `[Y][U][V]`, chroma planes at half width/height.
fn rgb_to_yuv420p(rgb: &[u8], width: u32, height: u32) -> Vec<u8> {
    let eff_h = height + (height % 2);
    let eff_w = width + (width % 2);
    let chroma_w = eff_w / 2;
    let chroma_h = eff_h / 2;

    let mut y_plane = Vec::with_capacity((width as usize) * (eff_h as usize));
    let mut u_plane = Vec::with_capacity((chroma_w * chroma_h) as usize);
    let mut v_plane = Vec::with_capacity((chroma_w * chroma_h) as usize);

    for y in 0..eff_h {
        for x in 0..width {
            let (r, g, b) = pixel_at(rgb, width, height, x, y);
            y_plane.push(round_clamp(bt601_y(r, g, b)));
        }
    }

    for cy in 0..chroma_h {
        for cx in 0..chroma_w {
            let x0 = cx * 2;
            let y0 = cy * 2;
            let mut u_sum = 0.0;
            let mut v_sum = 0.0;
            for (dx, dy) in [(0, 0), (1, 0), (0, 1), (1, 1)] {
                let (r, g, b) = pixel_at(rgb, width, height, x0 + dx, y0 + dy);
                u_sum += bt601_u(r, g, b);
                v_sum += bt601_v(r, g, b);
            }
            u_plane.push(round_clamp(u_sum / 4.0));
            v_plane.push(round_clamp(v_sum / 4.0));
        }
    }

    let mut out = y_plane;
    out.extend(u_plane);
    out.extend(v_plane);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid_rgb(width: u32, height: u32, r: u8, g: u8, b: u8) -> Vec<u8> {
        let mut buf = Vec::with_capacity((width * height * 3) as usize);
        for _ in 0..(width * height) {
            buf.push(r);
            buf.push(g);
            buf.push(b);
        }
        buf
    }

    #[test]
    fn rgb24_is_identity() {
        let rgb = solid_rgb(4, 2, 10, 20, 30);
        let out = convert(&rgb, 4, 2, Colorspace::Rgb24).unwrap();
        assert_eq!(out, rgb);
    }

    #[test]
    fn geometry_mismatch_is_an_error() {
        let rgb = solid_rgb(4, 2, 0, 0, 0);
        let err = convert(&rgb[..10], 4, 2, Colorspace::Rgb24).unwrap_err();
        assert!(matches!(err, ConvertError::GeometryMismatch { .. }));
    }

    #[test]
    fn uyvy_size_and_solid_color() {
        let rgb = solid_rgb(4, 2, 255, 255, 255);
        let out = rgb_to_uyvy(&rgb, 4, 2);
        assert_eq!(out.len(), 4 * 2 * 2);
        // White: Y=255, U=128, V=128 (after clamping).
        for chunk in out.chunks(4) {
            assert_eq!(chunk, &[128, 255, 128, 255]);
        }
    }

    #[test]
    fn yuv420p_size_black() {
        let rgb = solid_rgb(4, 4, 0, 0, 0);
        let out = rgb_to_yuv420p(&rgb, 4, 4);
        assert_eq!(out.len(), 4 * 4 + 2 * (2 * 2));
        assert!(out[..16].iter().all(|&b| b == 0));
        assert!(out[16..].iter().all(|&b| b == 128));
    }

    #[test]
    fn odd_width_uyvy_duplicates_last_column() {
        let rgb = solid_rgb(3, 1, 0, 255, 0);
        let out = rgb_to_uyvy(&rgb, 3, 1);
        // effective width rounds up to 4 -> 2 macropixels -> 8 bytes.
        assert_eq!(out.len(), 8);
    }

    #[test]
    fn odd_height_420p_duplicates_bottom_row() {
        let rgb = solid_rgb(2, 3, 0, 0, 255);
        let out = rgb_to_yuv420p(&rgb, 2, 3);
        // Odd height 3 rounds up to an effective height of 4 for both the Y
        // plane (bottom row duplicated) and the chroma planes (2 rows).
        assert_eq!(out.len(), 2 * 4 + 2 * (1 * 2));
    }
}
