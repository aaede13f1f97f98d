use image::{GrayImage, Luma, RgbImage};
use imageproc::distance_transform::Norm;
use imageproc::filter::{gaussian_blur_f32, median_filter};
use imageproc::map::map_colors;
use imageproc::morphology::dilate;

/// Offsets (dx, dy) of the 2×2 ellipse `[[0,1],[1,1]]` relative to its anchor
/// in the bottom-right cell. The anchor itself is implied.
const ELLIPSE_2X2: [(i32, i32); 2] = [(0, -1), (-1, 0)];

/// BT.601 luma, `(299 R + 587 G + 114 B) / 1000` rounded to nearest.
pub fn to_gray(img: &RgbImage) -> GrayImage {
    map_colors(img, |p| {
        let [r, g, b] = p.0.map(u32::from);
        Luma([((299 * r + 587 * g + 114 * b + 500) / 1000) as u8])
    })
}

/// Sigma OpenCV derives for a Gaussian kernel of the given size when none is given.
pub fn sigma_for_kernel(ksize: u32) -> f32 {
    0.3 * ((ksize as f32 - 1.0) * 0.5 - 1.0) + 0.8
}

/// Apply Gaussian blur to reduce noise
pub fn apply_blur(img: &GrayImage, sigma: f32) -> GrayImage {
    gaussian_blur_f32(img, sigma)
}

/// Inverted adaptive Gaussian threshold.
///
/// A pixel becomes foreground (255) when it is at least `c` darker than the
/// Gaussian-weighted mean of its `block_size` neighbourhood, so edges and
/// texture light up while flat areas stay black regardless of overall
/// brightness.
pub fn adaptive_threshold_inv(img: &GrayImage, block_size: u32, c: i32) -> GrayImage {
    let local_mean = gaussian_blur_f32(img, sigma_for_kernel(block_size));
    let mut out = GrayImage::new(img.width(), img.height());
    for (x, y, pixel) in img.enumerate_pixels() {
        let mean = local_mean.get_pixel(x, y)[0] as i32;
        let value = pixel[0] as i32;
        let active = value - mean <= -c;
        out.put_pixel(x, y, Luma([if active { 255 } else { 0 }]));
    }
    out
}

/// Fixed cutoff: strictly brighter than `threshold` becomes 255.
pub fn binary_threshold(img: &GrayImage, threshold: u8) -> GrayImage {
    let mut out = img.clone();
    for pixel in out.pixels_mut() {
        pixel[0] = if pixel[0] > threshold { 255 } else { 0 };
    }
    out
}

/// Median filter with a square window of side `2 * radius + 1`.
pub fn apply_median(img: &GrayImage, radius: u32) -> GrayImage {
    median_filter(img, radius, radius)
}

/// Dilation with a square structuring element of side `2 * radius + 1`.
pub fn apply_dilate(img: &GrayImage, radius: u8) -> GrayImage {
    dilate(img, Norm::LInf, radius)
}

/// Morphological closing (dilate then erode) with the 2×2 elliptical element.
/// Bridges one-pixel gaps.
pub fn close_ellipse_2x2(img: &GrayImage) -> GrayImage {
    let dilated = morph_2x2(img, u8::max);
    morph_2x2(&dilated, u8::min)
}

fn morph_2x2(img: &GrayImage, combine: fn(u8, u8) -> u8) -> GrayImage {
    let (width, height) = img.dimensions();
    GrayImage::from_fn(width, height, |x, y| {
        let mut acc = img.get_pixel(x, y)[0];
        for (dx, dy) in ELLIPSE_2X2 {
            let (Some(nx), Some(ny)) = (x.checked_add_signed(dx), y.checked_add_signed(dy)) else {
                continue;
            };
            if nx < width && ny < height {
                acc = combine(acc, img.get_pixel(nx, ny)[0]);
            }
        }
        Luma([acc])
    })
}

/// Per-channel absolute difference of two equally sized frames.
pub fn abs_diff(a: &RgbImage, b: &RgbImage) -> RgbImage {
    let mut out = RgbImage::new(a.width(), a.height());
    for ((dst, pa), pb) in out.pixels_mut().zip(a.pixels()).zip(b.pixels()) {
        for c in 0..3 {
            dst[c] = pa[c].abs_diff(pb[c]);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn luma_uses_bt601_weights() {
        let img = RgbImage::from_fn(4, 1, |x, _| match x {
            0 => image::Rgb([0, 34, 0]),
            1 => image::Rgb([80, 0, 0]),
            2 => image::Rgb([0, 0, 200]),
            _ => image::Rgb([255, 255, 255]),
        });
        assert_eq!(to_gray(&img).as_raw(), &vec![20, 24, 23, 255]);
    }

    #[test]
    fn opencv_kernel_sigma() {
        assert!((sigma_for_kernel(5) - 1.1).abs() < 1e-6);
        assert!((sigma_for_kernel(25) - 4.1).abs() < 1e-5);
    }

    #[test]
    fn flat_image_has_no_adaptive_foreground() {
        let img = GrayImage::from_pixel(40, 40, Luma([120]));
        let out = adaptive_threshold_inv(&img, 25, 16);
        assert!(out.pixels().all(|p| p[0] == 0));
    }

    #[test]
    fn binary_threshold_is_strict() {
        let img = GrayImage::from_fn(3, 1, |x, _| Luma([19 + x as u8]));
        let out = binary_threshold(&img, 20);
        assert_eq!(out.as_raw(), &vec![0, 0, 255]);
    }

    #[test]
    fn ellipse_close_fills_single_pixel_gap() {
        // Two 2px-tall bars separated by a one-pixel column gap.
        let mut img = GrayImage::new(7, 4);
        for y in [1, 2] {
            for x in [0, 1, 2, 4, 5, 6] {
                img.put_pixel(x, y, Luma([255]));
            }
        }
        let closed = close_ellipse_2x2(&img);
        assert_eq!(closed.get_pixel(3, 2)[0], 255);
        assert_eq!(closed.get_pixel(1, 2)[0], 255);
        assert_eq!(closed.get_pixel(3, 0)[0], 0);
    }

    #[test]
    fn abs_diff_is_symmetric() {
        let a = RgbImage::from_pixel(2, 2, image::Rgb([10, 200, 30]));
        let b = RgbImage::from_pixel(2, 2, image::Rgb([50, 100, 30]));
        assert_eq!(abs_diff(&a, &b), abs_diff(&b, &a));
        assert_eq!(abs_diff(&a, &b).get_pixel(0, 0).0, [40, 100, 0]);
    }
}
