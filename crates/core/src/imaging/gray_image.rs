use crate::shared::frame::Frame;

// BT.601 luma weights in 14-bit fixed point.
const R_WEIGHT: u32 = 4899;
const G_WEIGHT: u32 = 9617;
const B_WEIGHT: u32 = 1868;
const SHIFT: u32 = 14;
const ROUND: u32 = 1 << (SHIFT - 1);

/// 8-bit single-channel image, row-major, no padding.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GrayImage {
    data: Vec<u8>,
    width: u32,
    height: u32,
}

impl GrayImage {
    pub fn new(data: Vec<u8>, width: u32, height: u32) -> Self {
        debug_assert_eq!(
            data.len(),
            width as usize * height as usize,
            "data length must equal width * height"
        );
        Self {
            data,
            width,
            height,
        }
    }

    pub fn from_fn(width: u32, height: u32, f: impl Fn(u32, u32) -> u8) -> Self {
        let mut data = Vec::with_capacity(width as usize * height as usize);
        for y in 0..height {
            for x in 0..width {
                data.push(f(x, y));
            }
        }
        Self::new(data, width, height)
    }

    /// Converts an RGB, RGBA or already-gray frame to luminance.
    pub fn from_frame(frame: &Frame) -> Result<Self, Box<dyn std::error::Error>> {
        if frame.is_empty() {
            return Err("Cannot convert an empty frame to grayscale".into());
        }
        let data = match frame.channels() {
            1 => frame.data().to_vec(),
            c @ (3 | 4) => frame
                .data()
                .chunks_exact(c as usize)
                .map(|px| luma(px[0], px[1], px[2]))
                .collect(),
            c => return Err(format!("Unsupported channel count for grayscale: {c}").into()),
        };
        Ok(Self::new(data, frame.width(), frame.height()))
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn get(&self, x: u32, y: u32) -> u8 {
        self.data[y as usize * self.width as usize + x as usize]
    }

    /// Bilinear resize with pixel-center alignment and edge clamping.
    pub fn resize(&self, width: u32, height: u32) -> GrayImage {
        if width == self.width && height == self.height {
            return self.clone();
        }
        if width == 0 || height == 0 || self.width == 0 || self.height == 0 {
            return GrayImage::new(Vec::new(), 0, 0);
        }

        let sx = self.width as f64 / width as f64;
        let sy = self.height as f64 / height as f64;
        let max_x = self.width as usize - 1;
        let max_y = self.height as usize - 1;
        let stride = self.width as usize;

        // Horizontal taps are shared by every row.
        let x_taps: Vec<(usize, usize, f64)> = (0..width)
            .map(|dx| {
                let fx = ((dx as f64 + 0.5) * sx - 0.5).max(0.0);
                let x0 = (fx.floor() as usize).min(max_x);
                let x1 = (x0 + 1).min(max_x);
                (x0, x1, fx - x0 as f64)
            })
            .collect();

        let mut data = Vec::with_capacity(width as usize * height as usize);
        for dy in 0..height {
            let fy = ((dy as f64 + 0.5) * sy - 0.5).max(0.0);
            let y0 = (fy.floor() as usize).min(max_y);
            let y1 = (y0 + 1).min(max_y);
            let wy = fy - y0 as f64;
            let row0 = &self.data[y0 * stride..(y0 + 1) * stride];
            let row1 = &self.data[y1 * stride..(y1 + 1) * stride];

            for &(x0, x1, wx) in &x_taps {
                let top = row0[x0] as f64 * (1.0 - wx) + row0[x1] as f64 * wx;
                let bottom = row1[x0] as f64 * (1.0 - wx) + row1[x1] as f64 * wx;
                let v = top * (1.0 - wy) + bottom * wy;
                data.push(v.round().clamp(0.0, 255.0) as u8);
            }
        }
        GrayImage::new(data, width, height)
    }
}

fn luma(r: u8, g: u8, b: u8) -> u8 {
    ((r as u32 * R_WEIGHT + g as u32 * G_WEIGHT + b as u32 * B_WEIGHT + ROUND) >> SHIFT) as u8
}
