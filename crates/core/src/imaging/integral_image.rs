//! Summed-area tables for constant-time rectangle sums.
//!
//! All tables are `(height + 1) x (width + 1)` with a zero first row and
//! column, indexed `[[y, x]]`.

use ndarray::Array2;

use crate::imaging::gray_image::GrayImage;

pub struct IntegralImage {
    sum: Array2<i64>,
    sq_sum: Array2<f64>,
    tilted: Option<Array2<i64>>,
    width: u32,
    height: u32,
}

impl IntegralImage {
    /// Builds the upright sum and squared-sum tables, plus the 45° table
    /// when `with_tilted` is set.
    pub fn new(image: &GrayImage, with_tilted: bool) -> Self {
        let w = image.width() as usize;
        let h = image.height() as usize;
        let mut sum = Array2::<i64>::zeros((h + 1, w + 1));
        let mut sq_sum = Array2::<f64>::zeros((h + 1, w + 1));

        for y in 0..h {
            let mut row_sum: i64 = 0;
            let mut row_sq: f64 = 0.0;
            for x in 0..w {
                let v = image.get(x as u32, y as u32) as i64;
                row_sum += v;
                row_sq += (v * v) as f64;
                sum[[y + 1, x + 1]] = sum[[y, x + 1]] + row_sum;
                sq_sum[[y + 1, x + 1]] = sq_sum[[y, x + 1]] + row_sq;
            }
        }

        let tilted = with_tilted.then(|| tilted_table(image));

        Self {
            sum,
            sq_sum,
            tilted,
            width: image.width(),
            height: image.height(),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn has_tilted(&self) -> bool {
        self.tilted.is_some()
    }

    /// Sum of pixels in `[x, x+w) x [y, y+h)`.
    pub fn rect_sum(&self, x: usize, y: usize, w: usize, h: usize) -> i64 {
        let s = &self.sum;
        s[[y + h, x + w]] - s[[y, x + w]] - s[[y + h, x]] + s[[y, x]]
    }

    pub fn rect_sq_sum(&self, x: usize, y: usize, w: usize, h: usize) -> f64 {
        let s = &self.sq_sum;
        s[[y + h, x + w]] - s[[y, x + w]] - s[[y + h, x]] + s[[y, x]]
    }

    /// Sum over a rectangle rotated by 45°, anchored at its top corner
    /// `(x, y)`, extending `w` pixels down-right and `h` pixels down-left.
    ///
    /// Panics if the table was built without `with_tilted`.
    pub fn tilted_rect_sum(&self, x: usize, y: usize, w: usize, h: usize) -> i64 {
        let t = self
            .tilted
            .as_ref()
            .expect("tilted table requested but not computed");
        t[[y, x]] - t[[y + h, x - h]] - t[[y + w, x + w]] + t[[y + w + h, x + w - h]]
    }

    #[cfg(test)]
    fn tilted_at(&self, x: usize, y: usize) -> Option<i64> {
        self.tilted.as_ref().map(|t| t[[y, x]])
    }
}

/// `T(X, Y) = Σ I(x, y)` over `y < Y` and `|x - X + 1| <= Y - y - 1`.
///
/// Computed with the recurrence
/// `T(X,Y) = T(X-1,Y-1) + T(X+1,Y-1) - T(X,Y-2) + I(X-1,Y-1) + I(X-1,Y-2)`
/// on a working table padded by `height + 1` columns on each side, since the
/// triangles fan out past the image borders.
fn tilted_table(image: &GrayImage) -> Array2<i64> {
    let w = image.width() as i64;
    let h = image.height() as i64;
    let pad = h + 1;
    let cols = (w + 1 + 2 * pad) as usize;
    let mut t = Array2::<i64>::zeros((h as usize + 1, cols));

    let pixel = |x: i64, y: i64| -> i64 {
        if x < 0 || y < 0 || x >= w || y >= h {
            0
        } else {
            image.get(x as u32, y as u32) as i64
        }
    };

    for yy in 1..=h {
        for c in 1..(cols as i64 - 1) {
            let x = c - pad;
            let mut v = t[[(yy - 1) as usize, (c - 1) as usize]]
                + t[[(yy - 1) as usize, (c + 1) as usize]]
                + pixel(x - 1, yy - 1)
                + pixel(x - 1, yy - 2);
            if yy >= 2 {
                v -= t[[(yy - 2) as usize, c as usize]];
            }
            t[[yy as usize, c as usize]] = v;
        }
    }

    t.slice(ndarray::s![.., pad as usize..(pad + w + 1) as usize])
        .to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_image() -> GrayImage {
        GrayImage::from_fn(7, 5, |x, y| ((x * 37 + y * 11 + x * y * 5) % 251) as u8)
    }

    fn brute_tilted(image: &GrayImage, big_x: i64, big_y: i64) -> i64 {
        let mut total = 0;
        for y in 0..big_y.min(image.height() as i64) {
            for x in 0..image.width() as i64 {
                if (x - big_x + 1).abs() <= big_y - y - 1 {
                    total += image.get(x as u32, y as u32) as i64;
                }
            }
        }
        total
    }

    #[test]
    fn test_table_dimensions() {
        let img = sample_image();
        let ii = IntegralImage::new(&img, true);
        assert_eq!(ii.width(), 7);
        assert_eq!(ii.height(), 5);
        assert!(ii.has_tilted());
        assert!(ii.tilted_at(7, 5).is_some());
    }

    #[test]
    fn test_rect_sum_matches_brute_force() {
        let img = sample_image();
        let ii = IntegralImage::new(&img, false);
        for (x, y, w, h) in [(0, 0, 7, 5), (1, 2, 3, 2), (6, 4, 1, 1), (2, 0, 4, 5)] {
            let mut expected = 0i64;
            let mut expected_sq = 0f64;
            for yy in y..y + h {
                for xx in x..x + w {
                    let v = img.get(xx as u32, yy as u32) as i64;
                    expected += v;
                    expected_sq += (v * v) as f64;
                }
            }
            assert_eq!(ii.rect_sum(x, y, w, h), expected);
            assert_eq!(ii.rect_sq_sum(x, y, w, h), expected_sq);
        }
    }

    #[test]
    fn test_tilted_table_matches_definition() {
        let img = sample_image();
        let ii = IntegralImage::new(&img, true);
        for y in 0..=5i64 {
            for x in 0..=7i64 {
                assert_eq!(
                    ii.tilted_at(x as usize, y as usize).unwrap(),
                    brute_tilted(&img, x, y),
                    "mismatch at X={x} Y={y}"
                );
            }
        }
    }

    #[test]
    fn test_unit_tilted_rect_covers_two_stacked_pixels() {
        // With unit sides the rotated rect at (x, y) spans (x-1, y) and (x-1, y+1).
        let img = GrayImage::from_fn(6, 6, |x, y| if x == 2 && y == 2 { 9 } else { 0 });
        let ii = IntegralImage::new(&img, true);
        assert_eq!(ii.tilted_rect_sum(3, 1, 1, 1), 9);
        assert_eq!(ii.tilted_rect_sum(3, 2, 1, 1), 9);
        assert_eq!(ii.tilted_rect_sum(3, 3, 1, 1), 0);
        assert_eq!(ii.tilted_rect_sum(2, 2, 1, 1), 0);
    }

    #[test]
    fn test_tilted_rect_sum_of_uniform_image() {
        let img = GrayImage::from_fn(10, 10, |_, _| 1);
        let ii = IntegralImage::new(&img, true);
        // A 2x2 rotated rect fully inside the image covers 2*w*h pixels.
        assert_eq!(ii.tilted_rect_sum(4, 1, 2, 2), 8);
    }

    #[test]
    fn test_without_tilted_reports_none() {
        let ii = IntegralImage::new(&sample_image(), false);
        assert!(!ii.has_tilted());
        assert!(ii.tilted_at(0, 0).is_none());
    }
}
