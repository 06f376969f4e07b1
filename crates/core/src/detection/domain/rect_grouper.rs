use crate::detection::domain::detection::Detection;
use crate::detection::domain::partition::partition;
use crate::shared::math::round_half_even;
use crate::shared::region::Region;

/// Two rectangles are similar when every edge lies within
/// `eps * (min(w1, w2) + min(h1, h2)) / 2` of the matching edge.
pub fn similar(a: &Region, b: &Region, eps: f64) -> bool {
    let delta = eps * (a.width.min(b.width) + a.height.min(b.height)) as f64 * 0.5;
    ((a.x - b.x).abs() as f64) <= delta
        && ((a.y - b.y).abs() as f64) <= delta
        && ((a.right() - b.right()).abs() as f64) <= delta
        && ((a.bottom() - b.bottom()).abs() as f64) <= delta
}

/// Clusters raw window hits into detections.
///
/// Similar rectangles are averaged per class. Classes with at most
/// `group_threshold` members are dropped, as is any class lying inside a
/// stronger surviving class. A `group_threshold` of zero skips clustering
/// and reports each hit with one neighbor.
pub fn group_rectangles(rects: &[Region], group_threshold: u32, eps: f64) -> Vec<Detection> {
    if group_threshold == 0 || rects.is_empty() {
        return rects.iter().map(|r| Detection::new(*r, 1)).collect();
    }

    let (labels, classes) = partition(rects, |a, b| similar(a, b, eps));

    let mut totals = vec![(0i64, 0i64, 0i64, 0i64); classes];
    let mut counts = vec![0u32; classes];
    for (r, &label) in rects.iter().zip(&labels) {
        let t = &mut totals[label];
        t.0 += r.x as i64;
        t.1 += r.y as i64;
        t.2 += r.width as i64;
        t.3 += r.height as i64;
        counts[label] += 1;
    }

    let averaged: Vec<Region> = totals
        .iter()
        .zip(&counts)
        .map(|(t, &n)| {
            let s = 1.0 / n as f64;
            Region::new(
                round_half_even(t.0 as f64 * s) as i32,
                round_half_even(t.1 as f64 * s) as i32,
                round_half_even(t.2 as f64 * s) as i32,
                round_half_even(t.3 as f64 * s) as i32,
            )
        })
        .collect();

    let mut out = Vec::new();
    for (i, (r1, &n1)) in averaged.iter().zip(&counts).enumerate() {
        if n1 <= group_threshold {
            continue;
        }
        let swallowed = averaged.iter().zip(&counts).enumerate().any(|(j, (r2, &n2))| {
            if j == i || n2 <= group_threshold {
                return false;
            }
            let dx = round_half_even(r2.width as f64 * eps) as i32;
            let dy = round_half_even(r2.height as f64 * eps) as i32;
            r2.contains_with_margin(r1, dx, dy) && (n2 > n1.max(3) || n1 < 3)
        });
        if !swallowed {
            out.push(Detection::new(*r1, n1));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::constants::GROUP_EPS;

    fn r(x: i32, y: i32, w: i32, h: i32) -> Region {
        Region::new(x, y, w, h)
    }

    #[test]
    fn test_similar_within_tolerance() {
        // delta = 0.2 * (100 + 100) / 2 = 20
        assert!(similar(&r(0, 0, 100, 100), &r(20, 0, 100, 100), GROUP_EPS));
        assert!(!similar(&r(0, 0, 100, 100), &r(21, 0, 100, 100), GROUP_EPS));
        assert!(!similar(&r(0, 0, 100, 100), &r(0, 0, 130, 100), GROUP_EPS));
    }

    #[test]
    fn test_zero_threshold_passes_everything_through() {
        let rects = [r(0, 0, 10, 10), r(1, 1, 10, 10)];
        let out = group_rectangles(&rects, 0, GROUP_EPS);
        assert_eq!(out.len(), 2);
        assert!(out.iter().all(|d| d.neighbors == 1));
        assert_eq!(out[1].region, r(1, 1, 10, 10));
    }

    #[test]
    fn test_empty_input() {
        assert!(group_rectangles(&[], 2, GROUP_EPS).is_empty());
    }

    #[test]
    fn test_cluster_is_averaged() {
        let rects = [r(100, 100, 50, 50), r(102, 98, 52, 50), r(101, 102, 51, 53)];
        let out = group_rectangles(&rects, 2, GROUP_EPS);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].neighbors, 3);
        assert_eq!(out[0].region, r(101, 100, 51, 51));
    }

    #[test]
    fn test_average_ties_round_to_even() {
        // x averages to 100.5 and width to 41.5.
        let rects = [
            r(100, 10, 41, 40),
            r(100, 10, 42, 40),
            r(101, 10, 41, 40),
            r(101, 10, 42, 40),
        ];
        let out = group_rectangles(&rects, 2, GROUP_EPS);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].neighbors, 4);
        assert_eq!(out[0].region, r(100, 10, 42, 40));
    }

    #[test]
    fn test_cluster_at_threshold_is_dropped() {
        let rects = [r(100, 100, 50, 50), r(101, 100, 50, 50)];
        assert!(group_rectangles(&rects, 2, GROUP_EPS).is_empty());
        assert_eq!(group_rectangles(&rects, 1, GROUP_EPS).len(), 1);
    }

    #[test]
    fn test_separate_clusters_stay_separate() {
        let mut rects = Vec::new();
        for d in 0..3 {
            rects.push(r(10 + d, 10, 40, 40));
            rects.push(r(300 + d, 200, 60, 60));
        }
        let out = group_rectangles(&rects, 2, GROUP_EPS);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].region, r(11, 10, 40, 40));
        assert_eq!(out[1].region, r(301, 200, 60, 60));
        assert!(out.iter().all(|d| d.neighbors == 3));
    }

    #[test]
    fn test_small_box_inside_stronger_box_is_removed() {
        let mut rects = Vec::new();
        for _ in 0..6 {
            rects.push(r(100, 100, 100, 100));
        }
        for _ in 0..3 {
            rects.push(r(130, 130, 30, 30));
        }
        let out = group_rectangles(&rects, 2, GROUP_EPS);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].region, r(100, 100, 100, 100));
        assert_eq!(out[0].neighbors, 6);
    }

    #[test]
    fn test_inner_box_survives_when_not_outnumbered() {
        // n2 = 4 is not > max(3, n1 = 4), and n1 >= 3.
        let mut rects = Vec::new();
        for _ in 0..4 {
            rects.push(r(100, 100, 100, 100));
            rects.push(r(130, 130, 30, 30));
        }
        let out = group_rectangles(&rects, 2, GROUP_EPS);
        assert_eq!(out.len(), 2);
    }
}
