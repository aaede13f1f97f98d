use image::GrayImage;
use imageproc::contours as borders;
use crate::models::Contour;

/// Trace every border in a binary mask, outer edges and hole edges alike,
/// and reduce each to its bounding box.
pub fn find_contours(mask: &GrayImage) -> Vec<Contour> {
    borders::find_contours::<i32>(mask)
        .into_iter()
        .filter_map(|border| {
            let first = border.points.first()?;
            let (mut min_x, mut min_y) = (first.x, first.y);
            let (mut max_x, mut max_y) = (first.x, first.y);
            for p in &border.points {
                min_x = min_x.min(p.x);
                min_y = min_y.min(p.y);
                max_x = max_x.max(p.x);
                max_y = max_y.max(p.y);
            }
            Some(Contour {
                min_x: min_x as u32,
                min_y: min_y as u32,
                max_x: max_x as u32,
                max_y: max_y as u32,
            })
        })
        .collect()
}

/// Keep contours at least `min_width` wide and `min_height` tall
pub fn filter_by_size(contours: Vec<Contour>, min_width: u32, min_height: u32) -> Vec<Contour> {
    contours
        .into_iter()
        .filter(|c| c.width() >= min_width && c.height() >= min_height)
        .collect()
}
