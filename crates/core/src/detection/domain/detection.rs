use serde::Serialize;

use crate::shared::region::Region;

/// A grouped face hit.
///
/// `neighbors` counts the raw window hits merged into `region`; higher
/// values mean the classifier fired consistently around this spot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Detection {
    pub region: Region,
    pub neighbors: u32,
}

impl Detection {
    pub fn new(region: Region, neighbors: u32) -> Self {
        Self { region, neighbors }
    }
}
