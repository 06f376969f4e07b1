use std::fmt;
use std::str::FromStr;

use crate::detection::domain::detection::Detection;
use crate::pipeline::detect_faces_use_case::FrameDetections;

/// Per-frame quantity extracted from detection results.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SeriesKind {
    Count,
    Width,
    CenterX,
    CenterY,
}

impl FromStr for SeriesKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "count" => Ok(Self::Count),
            "width" => Ok(Self::Width),
            "center-x" => Ok(Self::CenterX),
            "center-y" => Ok(Self::CenterY),
            other => Err(format!(
                "unknown series '{other}' (expected count, width, center-x or center-y)"
            )),
        }
    }
}

impl fmt::Display for SeriesKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Count => "count",
            Self::Width => "width",
            Self::CenterX => "center-x",
            Self::CenterY => "center-y",
        };
        f.write_str(name)
    }
}

/// One value per frame. Geometric series follow the detection with the most
/// neighbors and are `NaN` on frames without a face.
pub fn face_series(results: &[FrameDetections], kind: SeriesKind) -> Vec<f64> {
    results
        .iter()
        .map(|frame| {
            let best = strongest(&frame.detections).map(|d| d.region);
            match kind {
                SeriesKind::Count => frame.detections.len() as f64,
                SeriesKind::Width => best.map_or(f64::NAN, |r| r.width as f64),
                SeriesKind::CenterX => {
                    best.map_or(f64::NAN, |r| r.x as f64 + r.width as f64 / 2.0)
                }
                SeriesKind::CenterY => {
                    best.map_or(f64::NAN, |r| r.y as f64 + r.height as f64 / 2.0)
                }
            }
        })
        .collect()
}

fn strongest(detections: &[Detection]) -> Option<&Detection> {
    detections
        .iter()
        .reduce(|best, d| if d.neighbors > best.neighbors { d } else { best })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::region::Region;
    use rstest::rstest;

    fn results() -> Vec<FrameDetections> {
        vec![
            FrameDetections {
                frame_index: 0,
                detections: vec![
                    Detection::new(Region::new(10, 20, 80, 60), 3),
                    Detection::new(Region::new(100, 40, 90, 90), 7),
                ],
            },
            FrameDetections {
                frame_index: 1,
                detections: Vec::new(),
            },
        ]
    }

    #[rstest]
    #[case(SeriesKind::Width, 90.0)]
    #[case(SeriesKind::CenterX, 145.0)]
    #[case(SeriesKind::CenterY, 85.0)]
    fn test_geometric_series_follow_strongest_face(#[case] kind: SeriesKind, #[case] expected: f64) {
        let series = face_series(&results(), kind);
        assert_eq!(series.len(), 2);
        assert_eq!(series[0], expected);
        assert!(series[1].is_nan());
    }

    #[test]
    fn test_count_series() {
        assert_eq!(face_series(&results(), SeriesKind::Count), vec![2.0, 0.0]);
    }

    #[rstest]
    #[case("count", SeriesKind::Count)]
    #[case("center-x", SeriesKind::CenterX)]
    #[case("center-y", SeriesKind::CenterY)]
    #[case("width", SeriesKind::Width)]
    fn test_parse_series_kind(#[case] name: &str, #[case] kind: SeriesKind) {
        assert_eq!(name.parse::<SeriesKind>().unwrap(), kind);
        assert_eq!(kind.to_string(), name);
    }

    #[test]
    fn test_parse_unknown_series_kind() {
        assert!("height".parse::<SeriesKind>().is_err());
    }
}
