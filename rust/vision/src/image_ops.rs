// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Raster operations for floor plan recognition
//!
//! Binary images use 255 for foreground (ink, walls) and 0 for background.
//! Every function returns a new image.

use image::{GrayImage, Luma, RgbImage};
use imageproc::distance_transform::Norm;

/// Convert RGB image to grayscale using the ITU-R BT.601 luminance weights
pub fn rgb_to_grayscale(rgb: &RgbImage) -> GrayImage {
    let mut gray = GrayImage::new(rgb.width(), rgb.height());

    for (x, y, pixel) in rgb.enumerate_pixels() {
        let r = pixel.0[0] as f32;
        let g = pixel.0[1] as f32;
        let b = pixel.0[2] as f32;
        let luma = (0.299 * r + 0.587 * g + 0.114 * b).round().min(255.0) as u8;
        gray.put_pixel(x, y, Luma([luma]));
    }

    gray
}

/// Apply Gaussian blur for noise reduction
pub fn gaussian_blur(image: &GrayImage, sigma: f32) -> GrayImage {
    imageproc::filter::gaussian_blur_f32(image, sigma)
}

/// Inverted adaptive threshold using the local mean.
///
/// A pixel becomes foreground when it is darker than the mean of its
/// `(2 * block_radius + 1)²` neighbourhood by more than `offset`. Dark ink
/// on a light page therefore turns white, independent of slow illumination
/// changes across the scan.
pub fn adaptive_threshold_inv(image: &GrayImage, block_radius: u32, offset: i16) -> GrayImage {
    let local_mean = imageproc::filter::box_filter(image, block_radius, block_radius);
    let mut result = GrayImage::new(image.width(), image.height());

    for (x, y, pixel) in image.enumerate_pixels() {
        let mean = local_mean.get_pixel(x, y).0[0] as i16;
        let value = if (pixel.0[0] as i16) < mean - offset { 255 } else { 0 };
        result.put_pixel(x, y, Luma([value]));
    }

    result
}

/// Inverted global threshold - pixels at or below the level become white
pub fn threshold_inv(image: &GrayImage, threshold_value: u8) -> GrayImage {
    let mut result = GrayImage::new(image.width(), image.height());

    for (x, y, pixel) in image.enumerate_pixels() {
        let value = if pixel.0[0] > threshold_value { 0 } else { 255 };
        result.put_pixel(x, y, Luma([value]));
    }

    result
}

/// Calculate Otsu's optimal threshold level
pub fn otsu_level(image: &GrayImage) -> u8 {
    // Build histogram
    let mut histogram = [0u32; 256];
    for pixel in image.pixels() {
        histogram[pixel.0[0] as usize] += 1;
    }

    let total_pixels = image.width() as f64 * image.height() as f64;
    if total_pixels == 0.0 {
        return 128;
    }

    let mut sum_total = 0.0;
    for (i, &count) in histogram.iter().enumerate() {
        sum_total += i as f64 * count as f64;
    }

    let mut sum_background = 0.0;
    let mut weight_background = 0.0;
    let mut max_variance = 0.0;
    let mut best_threshold = 0u8;

    for (t, &count) in histogram.iter().enumerate() {
        weight_background += count as f64;
        if weight_background == 0.0 {
            continue;
        }

        let weight_foreground = total_pixels - weight_background;
        if weight_foreground == 0.0 {
            break;
        }

        sum_background += t as f64 * count as f64;

        let mean_background = sum_background / weight_background;
        let mean_foreground = (sum_total - sum_background) / weight_foreground;

        let variance =
            weight_background * weight_foreground * (mean_background - mean_foreground).powi(2);

        if variance > max_variance {
            max_variance = variance;
            best_threshold = t as u8;
        }
    }

    best_threshold
}

/// Morphological closing with a square `(2r+1)²` element - bridges small gaps
pub fn morphological_close(image: &GrayImage, radius: u8) -> GrayImage {
    imageproc::morphology::close(image, Norm::LInf, radius)
}

/// Morphological opening with a square `(2r+1)²` element - removes specks
pub fn morphological_open(image: &GrayImage, radius: u8) -> GrayImage {
    imageproc::morphology::open(image, Norm::LInf, radius)
}

/// Run direction for [`directional_open`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunAxis {
    Horizontal,
    Vertical,
}

/// Binary opening with a `1×length` (horizontal) or `length×1` (vertical)
/// line element.
///
/// For a line element, erode-then-dilate keeps exactly the foreground
/// pixels that belong to a straight run of at least `length` pixels along
/// the axis, so the opening is computed from run lengths directly.
pub fn directional_open(image: &GrayImage, axis: RunAxis, length: u32) -> GrayImage {
    let (width, height) = image.dimensions();
    let mut result = GrayImage::new(width, height);
    if length == 0 {
        return result;
    }

    let (lines, span) = match axis {
        RunAxis::Horizontal => (height, width),
        RunAxis::Vertical => (width, height),
    };
    let coord = |line: u32, pos: u32| match axis {
        RunAxis::Horizontal => (pos, line),
        RunAxis::Vertical => (line, pos),
    };

    for line in 0..lines {
        let mut pos = 0;
        while pos < span {
            let (x, y) = coord(line, pos);
            if image.get_pixel(x, y).0[0] == 0 {
                pos += 1;
                continue;
            }

            let run_start = pos;
            while pos < span {
                let (x, y) = coord(line, pos);
                if image.get_pixel(x, y).0[0] == 0 {
                    break;
                }
                pos += 1;
            }

            if pos - run_start >= length {
                for p in run_start..pos {
                    let (x, y) = coord(line, p);
                    result.put_pixel(x, y, Luma([255]));
                }
            }
        }
    }

    result
}

/// Pixel-wise OR of two binary images of equal size
pub fn union(a: &GrayImage, b: &GrayImage) -> GrayImage {
    let mut result = a.clone();
    for (out, other) in result.pixels_mut().zip(b.pixels()) {
        if other.0[0] != 0 {
            *out = Luma([255]);
        }
    }
    result
}
