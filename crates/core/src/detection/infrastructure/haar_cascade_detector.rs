use std::path::Path;

use crate::detection::domain::detection::Detection;
use crate::detection::domain::detection_params::{DetectionParams, ParamsError};
use crate::detection::domain::face_detector::FaceDetector;
use crate::detection::domain::rect_grouper::group_rectangles;
use crate::detection::infrastructure::cascade_model::{CascadeModel, WindowVerdict};
use crate::detection::infrastructure::cascade_xml;
use crate::imaging::gray_image::GrayImage;
use crate::imaging::integral_image::IntegralImage;
use crate::shared::constants::GROUP_EPS;
use crate::shared::math::round_half_even;
use crate::shared::region::Region;

/// One pass of the multi-scale scan.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScaleLevel {
    pub factor: f64,
    /// Detector window in original image pixels.
    pub window: (u32, u32),
    /// Size the image is shrunk to so the base window covers `window`.
    pub scaled: (u32, u32),
}

/// Sliding-window face detector driven by a boosted Haar cascade.
///
/// The image is shrunk by successive powers of `scale_factor` and the
/// fixed-size cascade window slides over each level; hits are mapped back
/// to original coordinates and clustered into [`Detection`]s.
pub struct HaarCascadeDetector {
    cascade: CascadeModel,
    params: DetectionParams,
}

impl HaarCascadeDetector {
    pub fn new(cascade: CascadeModel, params: DetectionParams) -> Result<Self, ParamsError> {
        params.validate()?;
        Ok(Self { cascade, params })
    }

    pub fn from_file(
        path: &Path,
        params: DetectionParams,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let cascade = cascade_xml::load(path)?;
        Ok(Self::new(cascade, params)?)
    }

    pub fn params(&self) -> &DetectionParams {
        &self.params
    }

    pub fn cascade(&self) -> &CascadeModel {
        &self.cascade
    }

    /// Scales visited for an image of the given size, smallest window first.
    ///
    /// Stops once the shrunk image no longer fits the base window or the
    /// window exceeds the maximum size; skips windows below the minimum.
    pub fn scale_plan(&self, width: u32, height: u32) -> Vec<ScaleLevel> {
        let (base_w, base_h) = self.cascade.window_size();
        let (max_w, max_h) = self.params.max_size_for(width, height);
        let (min_w, min_h) = self.params.min_size;

        let mut levels = Vec::new();
        let mut factor = 1.0f64;
        loop {
            let window = (
                round_half_even(base_w as f64 * factor) as u32,
                round_half_even(base_h as f64 * factor) as u32,
            );
            let scaled = (
                round_half_even(width as f64 / factor) as u32,
                round_half_even(height as f64 / factor) as u32,
            );
            if scaled.0 < base_w || scaled.1 < base_h {
                break;
            }
            if window.0 > max_w || window.1 > max_h {
                break;
            }
            if window.0 >= min_w && window.1 >= min_h {
                levels.push(ScaleLevel {
                    factor,
                    window,
                    scaled,
                });
            }
            factor *= self.params.scale_factor;
        }
        levels
    }

    /// Every accepted window across all scales, before grouping.
    pub fn detect_raw(&self, image: &GrayImage) -> Vec<Region> {
        let levels = self.scale_plan(image.width(), image.height());
        log::debug!(
            "Scanning {}x{} image at {} scales",
            image.width(),
            image.height(),
            levels.len()
        );

        let mut hits = Vec::new();
        for level in &levels {
            self.scan_level(image, level, &mut hits);
        }
        hits
    }

    fn scan_level(&self, image: &GrayImage, level: &ScaleLevel, hits: &mut Vec<Region>) {
        let (base_w, base_h) = self.cascade.window_size();
        let scaled = image.resize(level.scaled.0, level.scaled.1);
        let ii = IntegralImage::new(&scaled, self.cascade.has_tilted());

        let step = if level.factor > 2.0 { 1 } else { 2 };
        let span_x = (level.scaled.0 - base_w + 1) as usize;
        let span_y = (level.scaled.1 - base_h + 1) as usize;

        let before = hits.len();
        for y in (0..span_y).step_by(step) {
            let mut x = 0;
            while x < span_x {
                match self.cascade.evaluate(&ii, x, y) {
                    WindowVerdict::Accepted => hits.push(Region::new(
                        round_half_even(x as f64 * level.factor) as i32,
                        round_half_even(y as f64 * level.factor) as i32,
                        level.window.0 as i32,
                        level.window.1 as i32,
                    )),
                    // Rejected outright: the next window almost surely is too.
                    WindowVerdict::Rejected(0) => x += step,
                    WindowVerdict::Rejected(_) => {}
                }
                x += step;
            }
        }
        log::trace!(
            "Scale {:.3} ({}x{} window): {} hits",
            level.factor,
            level.window.0,
            level.window.1,
            hits.len() - before
        );
    }
}

impl FaceDetector for HaarCascadeDetector {
    fn detect_gray(
        &mut self,
        image: &GrayImage,
    ) -> Result<Vec<Detection>, Box<dyn std::error::Error>> {
        let raw = self.detect_raw(image);
        let detections = group_rectangles(&raw, self.params.min_neighbors, GROUP_EPS);
        log::debug!(
            "{} raw hits grouped into {} detections",
            raw.len(),
            detections.len()
        );
        Ok(detections)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::infrastructure::cascade_model::test_support::edge_cascade;
    use crate::detection::infrastructure::cascade_model::{
        HaarFeature, HaarRect, Stage, TreeNode, WeakTree,
    };
    use crate::shared::frame::Frame;

    fn edge_params(min_neighbors: u32) -> DetectionParams {
        DetectionParams {
            scale_factor: 1.2,
            min_neighbors,
            min_size: (0, 0),
            max_size: (6, 6),
        }
    }

    fn edge_image() -> GrayImage {
        GrayImage::from_fn(24, 12, |x, _| if x < 12 { 0 } else { 255 })
    }

    /// Accepts every window; only the scan geometry matters.
    fn accept_all(window: u32) -> CascadeModel {
        let feature = HaarFeature {
            rects: vec![HaarRect {
                x: 0,
                y: 0,
                width: 1,
                height: 1,
                weight: 1.0,
            }],
            tilted: false,
        };
        let tree = WeakTree {
            nodes: vec![TreeNode {
                feature: 0,
                threshold: 0.0,
                left: 0,
                right: 0,
            }],
            leaves: vec![1.0],
        };
        CascadeModel::new(
            window,
            window,
            vec![Stage {
                threshold: 0.0,
                trees: vec![tree],
            }],
            vec![feature],
        )
        .unwrap()
    }

    #[test]
    fn test_invalid_params_rejected() {
        let params = DetectionParams {
            scale_factor: 1.0,
            ..Default::default()
        };
        assert!(HaarCascadeDetector::new(edge_cascade(), params).is_err());
    }

    #[test]
    fn test_scale_plan_for_default_params() {
        let detector = HaarCascadeDetector::new(accept_all(20), DetectionParams::default()).unwrap();
        let plan = detector.scale_plan(640, 480);
        assert_eq!(plan.len(), 11);
        assert_eq!(plan[0].window, (72, 72));
        assert_eq!(plan[10].window, (444, 444));
        approx::assert_relative_eq!(plan[0].factor, 1.2f64.powi(7), epsilon = 1e-9);
        assert_eq!(plan[0].scaled, (179, 134));
    }

    #[test]
    fn test_scale_plan_respects_max_size() {
        let params = DetectionParams {
            min_size: (0, 0),
            max_size: (30, 30),
            ..Default::default()
        };
        let detector = HaarCascadeDetector::new(accept_all(20), params).unwrap();
        let windows: Vec<u32> = detector
            .scale_plan(640, 480)
            .iter()
            .map(|l| l.window.0)
            .collect();
        assert_eq!(windows, vec![20, 24, 29]);
    }

    #[test]
    fn test_max_below_min_finds_nothing() {
        let params = DetectionParams {
            min_size: (40, 40),
            max_size: (30, 30),
            min_neighbors: 0,
            ..Default::default()
        };
        let mut detector = HaarCascadeDetector::new(accept_all(20), params).unwrap();
        assert!(detector.scale_plan(640, 480).is_empty());
        let img = GrayImage::from_fn(64, 64, |_, _| 90);
        assert!(detector.detect_gray(&img).unwrap().is_empty());
    }

    #[test]
    fn test_hit_coordinates_round_ties_to_even() {
        // factor 1.25: x = 2 maps to 2.5 -> 2 and x = 6 to 7.5 -> 8.
        let params = DetectionParams {
            scale_factor: 1.25,
            min_size: (5, 5),
            max_size: (5, 5),
            ..Default::default()
        };
        let detector = HaarCascadeDetector::new(accept_all(4), params).unwrap();
        let plan = detector.scale_plan(15, 10);
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].window, (5, 5));
        assert_eq!(plan[0].scaled, (12, 8));

        let img = GrayImage::from_fn(15, 10, |_, _| 128);
        let hits = detector.detect_raw(&img);
        let xs: Vec<i32> = hits.iter().filter(|r| r.y == 0).map(|r| r.x).collect();
        assert_eq!(xs, vec![0, 2, 5, 8, 10]);
        let ys: Vec<i32> = hits.iter().filter(|r| r.x == 0).map(|r| r.y).collect();
        assert_eq!(ys, vec![0, 2, 5]);
    }

    #[test]
    fn test_image_smaller_than_window_has_no_scales() {
        let detector = HaarCascadeDetector::new(accept_all(20), DetectionParams::default()).unwrap();
        assert!(detector.scale_plan(19, 100).is_empty());
        let tiny = GrayImage::from_fn(10, 10, |_, _| 0);
        assert!(detector.detect_raw(&tiny).is_empty());
    }

    #[test]
    fn test_scan_steps_by_two_at_base_scale() {
        let params = DetectionParams {
            min_size: (0, 0),
            max_size: (4, 4),
            ..Default::default()
        };
        let detector = HaarCascadeDetector::new(accept_all(4), params).unwrap();
        let img = GrayImage::from_fn(8, 6, |_, _| 128);
        let hits = detector.detect_raw(&img);
        // span 5x3 stepped by 2: x in {0, 2, 4}, y in {0, 2}
        assert_eq!(hits.len(), 6);
        assert!(hits.contains(&Region::new(4, 2, 4, 4)));
        assert!(hits.iter().all(|r| r.width == 4 && r.height == 4));
    }

    #[test]
    fn test_raw_hits_on_edge() {
        let detector = HaarCascadeDetector::new(edge_cascade(), edge_params(0)).unwrap();
        let hits = detector.detect_raw(&edge_image());
        let mut expected = Vec::new();
        for y in [0, 2, 4, 6] {
            expected.push(Region::new(8, y, 6, 6));
            expected.push(Region::new(10, y, 6, 6));
        }
        assert_eq!(hits, expected);
    }

    #[test]
    fn test_exposes_cascade_and_params() {
        let detector = HaarCascadeDetector::new(edge_cascade(), edge_params(3)).unwrap();
        assert_eq!(detector.cascade().window_size(), (6, 6));
        assert_eq!(detector.params().min_neighbors, 3);
        assert_eq!(detector.params().max_size, (6, 6));
    }

    #[test]
    fn test_zero_min_neighbors_reports_every_hit() {
        let mut detector = HaarCascadeDetector::new(edge_cascade(), edge_params(0)).unwrap();
        let detections = detector.detect_gray(&edge_image()).unwrap();
        assert_eq!(detections.len(), 8);
        assert!(detections.iter().all(|d| d.neighbors == 1));
    }

    #[test]
    fn test_isolated_hits_are_discarded_by_grouping() {
        // Hits 2px apart with a 6px window fall outside the 1.2px tolerance.
        let mut detector = HaarCascadeDetector::new(edge_cascade(), edge_params(1)).unwrap();
        assert!(detector.detect_gray(&edge_image()).unwrap().is_empty());
    }

    #[test]
    fn test_dense_hits_group_into_one_detection() {
        let params = DetectionParams {
            min_size: (0, 0),
            max_size: (20, 20),
            min_neighbors: 3,
            ..Default::default()
        };
        let mut detector = HaarCascadeDetector::new(accept_all(20), params).unwrap();
        let img = GrayImage::from_fn(24, 24, |_, _| 50);
        let detections = detector.detect_gray(&img).unwrap();
        // span 5x5 stepped by 2 -> 9 hits, all within 4px of each other.
        assert_eq!(detections.len(), 1);
        assert_eq!(detections[0].neighbors, 9);
        assert_eq!(detections[0].region, Region::new(2, 2, 20, 20));
    }

    #[test]
    fn test_detect_converts_rgb_frame() {
        let mut data = Vec::new();
        for _y in 0..12 {
            for x in 0..24 {
                let v = if x < 12 { 0 } else { 255 };
                data.extend_from_slice(&[v, v, v]);
            }
        }
        let frame = Frame::new(data, 24, 12, 3, 0);
        let mut detector = HaarCascadeDetector::new(edge_cascade(), edge_params(0)).unwrap();
        assert_eq!(detector.detect(&frame).unwrap().len(), 8);
    }

    #[test]
    fn test_detect_empty_frame_is_error() {
        let frame = Frame::new(Vec::new(), 0, 0, 3, 0);
        let mut detector = HaarCascadeDetector::new(edge_cascade(), edge_params(0)).unwrap();
        assert!(detector.detect(&frame).is_err());
    }

    #[test]
    fn test_from_file_missing_cascade() {
        let result = HaarCascadeDetector::from_file(
            Path::new("/nonexistent/haarcascade.xml"),
            DetectionParams::default(),
        );
        assert!(result.is_err());
    }
}
