// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Binarization and cleanup of the raw floor plan raster

use crate::image_ops::{
    adaptive_threshold_inv, directional_open, gaussian_blur, morphological_close,
    morphological_open, otsu_level, rgb_to_grayscale, threshold_inv, union, RunAxis,
};
use crate::types::RasterMask;
use image::{GrayImage, RgbImage};
use imageproc::contours::{find_contours, BorderType, Contour};
use serde::{Deserialize, Serialize};

/// How the grayscale image is turned into a binary wall mask
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ThresholdMode {
    /// Local mean over a `(2r+1)²` block minus `offset`; copes with faded
    /// or unevenly lit scans
    Adaptive { block_radius: u32, offset: i16 },
    /// Fixed level: pixels at or below it are ink
    Global { level: u8 },
    /// Fixed level chosen per image by Otsu's method
    Otsu,
}

/// Configuration for the preprocessing stage
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PreprocessConfig {
    /// Gaussian sigma applied before thresholding; 0 disables the blur
    pub blur_sigma: f32,
    pub threshold: ThresholdMode,
    /// Radius of the square closing element (1 = 3×3)
    pub close_radius: u8,
    /// Radius of the square opening element (1 = 3×3)
    pub open_radius: u8,
    /// Length of the line elements isolating straight wall runs
    pub thickness_kernel_length: u32,
    /// Candidate thicknesses must lie strictly between min and max
    pub min_wall_thickness: u32,
    pub max_wall_thickness: u32,
    /// Returned when no candidate survives filtering
    pub default_wall_thickness: u32,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            blur_sigma: 0.0,
            threshold: ThresholdMode::Adaptive {
                block_radius: 7, // 15×15 block
                offset: 3,
            },
            close_radius: 1,
            open_radius: 1,
            thickness_kernel_length: 40,
            min_wall_thickness: 5,
            max_wall_thickness: 50,
            default_wall_thickness: 12,
        }
    }
}

/// Intermediate rasters of the preprocessing stage
#[derive(Debug, Clone)]
pub struct PreprocessedImage {
    pub grayscale: GrayImage,
    /// Thresholded ink mask before morphology
    pub binary: RasterMask,
    /// Closed then opened mask consumed by wall and room extraction
    pub cleaned: RasterMask,
}

/// Convert a color floor plan into a cleaned binary wall mask
pub fn preprocess(image: &RgbImage, config: &PreprocessConfig) -> PreprocessedImage {
    let grayscale = rgb_to_grayscale(image);

    let source = if config.blur_sigma > 0.0 {
        gaussian_blur(&grayscale, config.blur_sigma)
    } else {
        grayscale.clone()
    };

    let binary = match config.threshold {
        ThresholdMode::Adaptive {
            block_radius,
            offset,
        } => adaptive_threshold_inv(&source, block_radius, offset),
        ThresholdMode::Global { level } => threshold_inv(&source, level),
        ThresholdMode::Otsu => threshold_inv(&source, otsu_level(&source)),
    };

    // Bridge small gaps in wall strokes, then drop isolated specks
    let closed = morphological_close(&binary, config.close_radius);
    let cleaned = morphological_open(&closed, config.open_radius);

    let binary = RasterMask::from_image(binary);
    let cleaned = RasterMask::from_image(cleaned);

    tracing::debug!(
        width = image.width(),
        height = image.height(),
        binary_pixels = binary.foreground_count(),
        cleaned_pixels = cleaned.foreground_count(),
        "Preprocessed floor plan raster"
    );

    PreprocessedImage {
        grayscale,
        binary,
        cleaned,
    }
}

/// Estimate the typical wall thickness of a mask, in pixels.
///
/// Straight horizontal and vertical runs are isolated with line elements,
/// and the smaller bounding-box side of each resulting component is a
/// thickness candidate. Returns the median candidate, or the configured
/// default when none is plausible.
pub fn estimate_wall_thickness(mask: &RasterMask, config: &PreprocessConfig) -> u32 {
    let image = mask.as_image();
    let horizontal = directional_open(image, RunAxis::Horizontal, config.thickness_kernel_length);
    let vertical = directional_open(image, RunAxis::Vertical, config.thickness_kernel_length);
    let straight = union(&horizontal, &vertical);

    let mut candidates: Vec<u32> = external_contours(&straight)
        .iter()
        .filter_map(|contour| {
            let (w, h) = bounding_extent(contour)?;
            Some(w.min(h))
        })
        .filter(|&t| t > config.min_wall_thickness && t < config.max_wall_thickness)
        .collect();

    if candidates.is_empty() {
        tracing::debug!(
            fallback = config.default_wall_thickness,
            "No plausible wall thickness candidates"
        );
        return config.default_wall_thickness;
    }

    candidates.sort_unstable();
    let mid = candidates.len() / 2;
    let thickness = if candidates.len() % 2 == 0 {
        (candidates[mid - 1] + candidates[mid]) / 2
    } else {
        candidates[mid]
    };

    tracing::debug!(
        candidates = candidates.len(),
        thickness,
        "Estimated wall thickness"
    );
    thickness
}

/// Outer borders of top-level foreground components
pub(crate) fn external_contours(image: &GrayImage) -> Vec<Contour<u32>> {
    find_contours::<u32>(image)
        .into_iter()
        .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
        .collect()
}

/// Inclusive width and height of a contour's bounding box
fn bounding_extent(contour: &Contour<u32>) -> Option<(u32, u32)> {
    let first = contour.points.first()?;
    let (mut min_x, mut max_x, mut min_y, mut max_y) = (first.x, first.x, first.y, first.y);
    for p in &contour.points {
        min_x = min_x.min(p.x);
        max_x = max_x.max(p.x);
        min_y = min_y.min(p.y);
        max_y = max_y.max(p.y);
    }
    Some((max_x - min_x + 1, max_y - min_y + 1))
}
