//! In-memory boosted Haar cascade and its per-window evaluation.
//!
//! A cascade is a sequence of stages. Each stage sums the leaf values of its
//! weak trees and rejects the window as soon as that sum falls below the
//! stage threshold. Tree nodes compare a variance-normalized Haar feature
//! against a threshold; child indices `> 0` point at nodes, `<= 0` at leaf
//! `-index`.

use std::path::PathBuf;

use thiserror::Error;

use crate::imaging::integral_image::IntegralImage;

#[derive(Error, Debug)]
pub enum CascadeError {
    #[error("failed to read cascade {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed cascade XML: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("cascade is missing <{0}>")]
    Missing(String),
    #[error("invalid cascade: {0}")]
    Invalid(String),
    #[error("unsupported cascade: {0}")]
    Unsupported(String),
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HaarRect {
    pub x: usize,
    pub y: usize,
    pub width: usize,
    pub height: usize,
    pub weight: f32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct HaarFeature {
    pub rects: Vec<HaarRect>,
    pub tilted: bool,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TreeNode {
    pub feature: usize,
    pub threshold: f32,
    pub left: i32,
    pub right: i32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct WeakTree {
    pub nodes: Vec<TreeNode>,
    pub leaves: Vec<f32>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Stage {
    pub threshold: f32,
    pub trees: Vec<WeakTree>,
}

/// Outcome of running the cascade on one window.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WindowVerdict {
    Accepted,
    /// Rejected by the stage with this index.
    Rejected(usize),
}

#[derive(Clone, Debug)]
pub struct CascadeModel {
    window_width: u32,
    window_height: u32,
    stages: Vec<Stage>,
    features: Vec<HaarFeature>,
    has_tilted: bool,
}

impl CascadeModel {
    /// Builds a cascade, checking every index and rectangle up front so
    /// evaluation can index without bounds failures.
    pub fn new(
        window_width: u32,
        window_height: u32,
        stages: Vec<Stage>,
        features: Vec<HaarFeature>,
    ) -> Result<Self, CascadeError> {
        if window_width < 3 || window_height < 3 {
            return Err(CascadeError::Invalid(format!(
                "window {window_width}x{window_height} is smaller than 3x3"
            )));
        }
        if stages.is_empty() {
            return Err(CascadeError::Invalid("no stages".into()));
        }

        for (fi, feature) in features.iter().enumerate() {
            if feature.rects.is_empty() {
                return Err(CascadeError::Invalid(format!("feature {fi} has no rects")));
            }
            for r in &feature.rects {
                if !rect_fits(r, feature.tilted, window_width as usize, window_height as usize) {
                    return Err(CascadeError::Invalid(format!(
                        "feature {fi} rect {r:?} exceeds the {window_width}x{window_height} window"
                    )));
                }
            }
        }

        for (si, stage) in stages.iter().enumerate() {
            for (ti, tree) in stage.trees.iter().enumerate() {
                validate_tree(tree, features.len())
                    .map_err(|msg| CascadeError::Invalid(format!("stage {si} tree {ti}: {msg}")))?;
            }
        }

        let has_tilted = features.iter().any(|f| f.tilted);
        Ok(Self {
            window_width,
            window_height,
            stages,
            features,
            has_tilted,
        })
    }

    pub fn window_size(&self) -> (u32, u32) {
        (self.window_width, self.window_height)
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn features(&self) -> &[HaarFeature] {
        &self.features
    }

    /// Whether evaluation needs the 45° integral table.
    pub fn has_tilted(&self) -> bool {
        self.has_tilted
    }

    /// Runs every stage on the window whose top-left corner is `(x, y)`.
    ///
    /// The caller guarantees the window lies inside `ii`.
    pub fn evaluate(&self, ii: &IntegralImage, x: usize, y: usize) -> WindowVerdict {
        let norm = self.variance_norm_factor(ii, x, y);

        for (si, stage) in self.stages.iter().enumerate() {
            let mut sum = 0.0f64;
            for tree in &stage.trees {
                sum += self.eval_tree(tree, ii, x, y, norm) as f64;
            }
            if sum < stage.threshold as f64 {
                return WindowVerdict::Rejected(si);
            }
        }
        WindowVerdict::Accepted
    }

    /// `1 / sqrt(area * Σv² - (Σv)²)` over the window inset by one pixel,
    /// or 1 for a flat window.
    fn variance_norm_factor(&self, ii: &IntegralImage, x: usize, y: usize) -> f64 {
        let w = self.window_width as usize - 2;
        let h = self.window_height as usize - 2;
        let area = (w * h) as f64;
        let sum = ii.rect_sum(x + 1, y + 1, w, h) as f64;
        let sq_sum = ii.rect_sq_sum(x + 1, y + 1, w, h);
        let nf = area * sq_sum - sum * sum;
        if nf > 0.0 {
            1.0 / nf.sqrt()
        } else {
            1.0
        }
    }

    fn eval_tree(&self, tree: &WeakTree, ii: &IntegralImage, x: usize, y: usize, norm: f64) -> f32 {
        let mut idx = 0i32;
        loop {
            let node = &tree.nodes[idx as usize];
            let value = self.feature_value(&self.features[node.feature], ii, x, y) * norm;
            idx = if value < node.threshold as f64 {
                node.left
            } else {
                node.right
            };
            if idx <= 0 {
                return tree.leaves[(-idx) as usize];
            }
        }
    }

    fn feature_value(&self, feature: &HaarFeature, ii: &IntegralImage, x: usize, y: usize) -> f64 {
        feature
            .rects
            .iter()
            .map(|r| {
                let s = if feature.tilted {
                    ii.tilted_rect_sum(x + r.x, y + r.y, r.width, r.height)
                } else {
                    ii.rect_sum(x + r.x, y + r.y, r.width, r.height)
                };
                r.weight as f64 * s as f64
            })
            .sum()
    }
}

fn rect_fits(r: &HaarRect, tilted: bool, win_w: usize, win_h: usize) -> bool {
    if r.width == 0 || r.height == 0 {
        return false;
    }
    if tilted {
        r.x >= r.height && r.x + r.width <= win_w && r.y + r.width + r.height <= win_h
    } else {
        r.x + r.width <= win_w && r.y + r.height <= win_h
    }
}

/// Children must point forward (no cycles) and stay in range.
fn validate_tree(tree: &WeakTree, feature_count: usize) -> Result<(), String> {
    if tree.nodes.is_empty() {
        return Err("no nodes".into());
    }
    for (ni, node) in tree.nodes.iter().enumerate() {
        if node.feature >= feature_count {
            return Err(format!(
                "node {ni} uses feature {} of {feature_count}",
                node.feature
            ));
        }
        for child in [node.left, node.right] {
            let ok = if child > 0 {
                (child as usize) > ni && (child as usize) < tree.nodes.len()
            } else {
                ((-child) as usize) < tree.leaves.len()
            };
            if !ok {
                return Err(format!("node {ni} has invalid child {child}"));
            }
        }
    }
    Ok(())
}
