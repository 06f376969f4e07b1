use crate::shared::frame::Frame;
use crate::shared::region::Region;

pub const DEFAULT_BOX_COLOR: [u8; 3] = [0, 255, 0];

/// Draws rectangle outlines onto the frame, clipped to its bounds.
///
/// The outline grows inward from each region edge. Gray frames take the
/// green component of `color`; RGBA frames keep their alpha.
pub fn draw_regions(frame: &mut Frame, regions: &[Region], color: [u8; 3], thickness: u32) {
    let (fw, fh) = (frame.width(), frame.height());
    let thickness = thickness.max(1) as i32;

    for region in regions {
        let Some(r) = region.clamp_to(fw, fh) else {
            continue;
        };
        let t = thickness.min(r.width).min(r.height);
        // top, bottom, left, right bands
        fill(frame, Region::new(r.x, r.y, r.width, t), color);
        fill(frame, Region::new(r.x, r.bottom() - t, r.width, t), color);
        fill(frame, Region::new(r.x, r.y, t, r.height), color);
        fill(frame, Region::new(r.right() - t, r.y, t, r.height), color);
    }
}

fn fill(frame: &mut Frame, r: Region, color: [u8; 3]) {
    let channels = frame.channels() as usize;
    let stride = frame.width() as usize * channels;
    let data = frame.data_mut();
    for y in r.y..r.bottom() {
        let row = y as usize * stride;
        for x in r.x..r.right() {
            let px = row + x as usize * channels;
            match channels {
                1 => data[px] = color[1],
                _ => data[px..px + 3].copy_from_slice(&color),
            }
        }
    }
}
