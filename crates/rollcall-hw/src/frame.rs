//! Frame type and raw-buffer conversion to intensity.

/// A captured camera frame, converted to intensity.
#[derive(Clone)]
pub struct Frame {
    /// Grayscale pixel data (width * height bytes).
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// Driver frame counter, for log correlation.
    pub sequence: u32,
}

impl Frame {
    /// Average pixel brightness (0.0–255.0).
    pub fn avg_brightness(&self) -> f32 {
        if self.data.is_empty() {
            return 0.0;
        }
        self.data.iter().map(|&b| b as f32).sum::<f32>() / self.data.len() as f32
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("buffer too short: expected {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
}

/// Convert packed YUYV (4:2:2) to intensity by extracting the Y channel.
///
/// YUYV packs two pixels per 4 bytes: [Y0, U, Y1, V].
/// Intensity = every even-indexed byte.
pub fn yuyv_to_intensity(yuyv: &[u8], width: u32, height: u32) -> Result<Vec<u8>, FrameError> {
    let expected = (width * height * 2) as usize;
    if yuyv.len() < expected {
        return Err(FrameError::InvalidLength {
            expected,
            actual: yuyv.len(),
        });
    }
    Ok(yuyv[..expected].iter().step_by(2).copied().collect())
}

/// Convert packed RGB24 to intensity with BT.601 luma weights.
///
/// Fixed-point (77, 150, 29) / 256; the weights sum to exactly 256 so
/// white maps to 255 and gray levels are preserved.
pub fn rgb24_to_intensity(rgb: &[u8], width: u32, height: u32) -> Result<Vec<u8>, FrameError> {
    let pixels = (width * height) as usize;
    let expected = pixels * 3;
    if rgb.len() < expected {
        return Err(FrameError::InvalidLength {
            expected,
            actual: rgb.len(),
        });
    }

    let mut gray = Vec::with_capacity(pixels);
    for px in rgb[..expected].chunks_exact(3) {
        let y = (77 * px[0] as u32 + 150 * px[1] as u32 + 29 * px[2] as u32) >> 8;
        gray.push(y as u8);
    }
    Ok(gray)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_yuyv_to_intensity() {
        // 2x1 image: [Y0=100, U=128, Y1=200, V=128]
        let yuyv = vec![100, 128, 200, 128];
        let gray = yuyv_to_intensity(&yuyv, 2, 1).unwrap();
        assert_eq!(gray, vec![100, 200]);
    }

    #[test]
    fn test_yuyv_to_intensity_4x2() {
        // 4x2 image = 8 pixels, 16 YUYV bytes
        let yuyv: Vec<u8> = (0..16).collect();
        let gray = yuyv_to_intensity(&yuyv, 4, 2).unwrap();
        assert_eq!(gray, vec![0, 2, 4, 6, 8, 10, 12, 14]);
    }

    #[test]
    fn test_yuyv_invalid_length() {
        let yuyv = vec![100, 128]; // too short for 2x1
        assert!(yuyv_to_intensity(&yuyv, 2, 1).is_err());
    }

    #[test]
    fn test_rgb24_primaries() {
        // red, green, blue, white, black in one 5x1 row
        let rgb = vec![
            255, 0, 0, //
            0, 255, 0, //
            0, 0, 255, //
            255, 255, 255, //
            0, 0, 0,
        ];
        let gray = rgb24_to_intensity(&rgb, 5, 1).unwrap();
        assert_eq!(gray, vec![76, 149, 28, 255, 0]);
    }

    #[test]
    fn test_rgb24_gray_preserved() {
        let rgb = vec![128, 128, 128, 7, 7, 7];
        let gray = rgb24_to_intensity(&rgb, 2, 1).unwrap();
        assert_eq!(gray, vec![128, 7]);
    }

    #[test]
    fn test_rgb24_invalid_length() {
        let rgb = vec![255, 0]; // too short for 1x1
        assert!(rgb24_to_intensity(&rgb, 1, 1).is_err());
    }

    #[test]
    fn test_avg_brightness() {
        let frame = Frame {
            data: vec![0, 255, 100, 101],
            width: 2,
            height: 2,
            sequence: 0,
        };
        assert!((frame.avg_brightness() - 114.0).abs() < 0.01);
    }

    #[test]
    fn test_avg_brightness_empty() {
        let frame = Frame {
            data: Vec::new(),
            width: 0,
            height: 0,
            sequence: 0,
        };
        assert_eq!(frame.avg_brightness(), 0.0);
    }
}
