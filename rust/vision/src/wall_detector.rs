// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Wall detection pipeline for floor plan recognition

use crate::line_ops::{detect_lines, merge_collinear_lines, HoughParams};
use crate::types::{RasterMask, WallSegment};
use image::GrayImage;
use serde::{Deserialize, Serialize};

/// Configuration for wall extraction
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WallDetectionConfig {
    /// Canny edge detection low threshold
    pub canny_low: f32,
    /// Canny edge detection high threshold
    pub canny_high: f32,
    /// Hough distance resolution (pixels)
    pub rho_resolution: f64,
    /// Hough angle bins over 180°, 180 = 1° steps
    pub theta_bins: usize,
    /// Hough line detection vote threshold
    pub hough_threshold: u32,
    /// Minimum line length in pixels
    pub min_line_length: f64,
    /// Maximum gap between edge points on one line
    pub max_line_gap: f64,
    /// Angle tolerance for merging collinear lines (degrees)
    pub merge_angle_tolerance: f64,
    /// Endpoint distance tolerance for merging collinear lines (pixels)
    pub merge_distance_tolerance: f64,
}

impl Default for WallDetectionConfig {
    fn default() -> Self {
        Self {
            canny_low: 50.0,
            canny_high: 150.0,
            rho_resolution: 1.0,
            theta_bins: 180,
            hough_threshold: 150,
            min_line_length: 100.0,
            max_line_gap: 10.0,
            merge_angle_tolerance: 5.0,
            merge_distance_tolerance: 20.0,
        }
    }
}

impl WallDetectionConfig {
    fn hough_params(&self) -> HoughParams {
        HoughParams {
            rho_resolution: self.rho_resolution,
            theta_bins: self.theta_bins,
            vote_threshold: self.hough_threshold,
            min_line_length: self.min_line_length,
            max_line_gap: self.max_line_gap,
        }
    }
}

/// Main wall detection pipeline
///
/// Runs edge detection on the cleaned wall mask, extracts line segments
/// with the probabilistic Hough transform and merges the near-duplicate
/// segments that both sides of a thick stroke produce. Every wall carries
/// the run's shared `thickness` estimate.
pub fn detect_walls(
    mask: &RasterMask,
    thickness: f64,
    config: &WallDetectionConfig,
) -> Vec<WallSegment> {
    let edges = edge_map(mask, config);

    let raw_lines = detect_lines(&edges, &config.hough_params());
    if raw_lines.is_empty() {
        tracing::debug!("No line candidates in edge map");
        return Vec::new();
    }

    let merged = merge_collinear_lines(
        &raw_lines,
        config.merge_angle_tolerance,
        config.merge_distance_tolerance,
    );

    tracing::debug!(
        raw = raw_lines.len(),
        merged = merged.len(),
        thickness,
        "Detected walls"
    );

    merged
        .iter()
        .map(|line| WallSegment::from_line(line, thickness))
        .collect()
}

/// Canny edges of the wall mask
pub fn edge_map(mask: &RasterMask, config: &WallDetectionConfig) -> GrayImage {
    imageproc::edges::canny(mask.as_image(), config.canny_low, config.canny_high)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::line_ops::angle_difference_deg;
    use image::Luma;

    fn test_config() -> WallDetectionConfig {
        WallDetectionConfig {
            hough_threshold: 40,
            min_line_length: 40.0,
            ..Default::default()
        }
    }

    fn mask_with_bar(horizontal: bool) -> RasterMask {
        let mut img = GrayImage::new(200, 200);
        for a in 30..170 {
            for b in 97..103 {
                let (x, y) = if horizontal { (a, b) } else { (b, a) };
                img.put_pixel(x, y, Luma([255]));
            }
        }
        RasterMask::from_image(img)
    }

    #[test]
    fn test_empty_mask_yields_no_walls() {
        let walls = detect_walls(&RasterMask::empty(120, 80), 12.0, &test_config());
        assert!(walls.is_empty());
    }

    #[test]
    fn test_thick_bar_collapses_to_one_wall() {
        let walls = detect_walls(&mask_with_bar(true), 6.0, &test_config());

        assert_eq!(walls.len(), 1);
        let wall = &walls[0];
        assert!(angle_difference_deg(wall.angle, 0.0) < 5.0);
        assert!(wall.length > 120.0 && wall.length < 150.0);
        assert!(wall.start.y >= 94.0 && wall.start.y <= 106.0);
        assert_eq!(wall.thickness, 6.0);
        assert_eq!(wall.length, wall.start.distance_to(&wall.end));
    }

    #[test]
    fn test_vertical_bar_angle() {
        let walls = detect_walls(&mask_with_bar(false), 6.0, &test_config());

        assert_eq!(walls.len(), 1);
        assert!(angle_difference_deg(walls[0].angle, 90.0) < 5.0);
    }

    #[test]
    fn test_detection_is_reproducible() {
        let mask = mask_with_bar(true);
        let first = detect_walls(&mask, 6.0, &test_config());
        let second = detect_walls(&mask, 6.0, &test_config());
        assert_eq!(first, second);
    }
}
