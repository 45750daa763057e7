// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! End-to-end reconstruction: raster in, metric geometry out

use crate::association::{associate, AssociationConfig};
use crate::detector::{classify_detections, OpeningDetection, OpeningDetector};
use crate::error::{Error, Result};
use crate::preprocess::{estimate_wall_thickness, preprocess, PreprocessConfig, ThresholdMode};
use crate::room_detector::{extract_rooms, RoomDetectionConfig};
use crate::scale::{to_metric, ExportConfig, ReconstructionResult, ScaleContext};
use crate::types::{Opening, RasterMask, RoomPolygon, WallSegment};
use crate::wall_detector::{detect_walls, WallDetectionConfig};
use image::RgbImage;
use serde::{Deserialize, Serialize};

/// Settings for every stage of a reconstruction
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ReconstructionConfig {
    pub preprocess: PreprocessConfig,
    pub walls: WallDetectionConfig,
    pub rooms: RoomDetectionConfig,
    pub association: AssociationConfig,
    pub export: ExportConfig,
}

impl ReconstructionConfig {
    /// Parse a possibly partial JSON config; missing fields keep defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| Error::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings no stage can run with
    pub fn validate(&self) -> Result<()> {
        let pre = &self.preprocess;
        if let ThresholdMode::Adaptive { block_radius, .. } = pre.threshold {
            ensure(block_radius > 0, "adaptive threshold block_radius must be > 0")?;
        }
        ensure(non_negative(pre.blur_sigma as f64), "blur_sigma must be >= 0")?;
        ensure(
            pre.thickness_kernel_length > 0,
            "thickness_kernel_length must be > 0",
        )?;
        ensure(
            pre.min_wall_thickness < pre.max_wall_thickness,
            "min_wall_thickness must be below max_wall_thickness",
        )?;

        let walls = &self.walls;
        ensure(
            walls.canny_low >= 0.0 && walls.canny_low <= walls.canny_high,
            "canny thresholds must satisfy 0 <= low <= high",
        )?;
        ensure(walls.rho_resolution > 0.0, "rho_resolution must be > 0")?;
        ensure(walls.theta_bins > 0, "theta_bins must be > 0")?;
        ensure(
            non_negative(walls.min_line_length) && non_negative(walls.max_line_gap),
            "line length and gap must be >= 0",
        )?;
        ensure(
            non_negative(walls.merge_angle_tolerance)
                && non_negative(walls.merge_distance_tolerance),
            "merge tolerances must be >= 0",
        )?;

        let rooms = &self.rooms;
        ensure(
            (0.0..1.0).contains(&rooms.min_area_ratio),
            "min_area_ratio must lie in [0, 1)",
        )?;
        ensure(
            (0.0..1.0).contains(&rooms.simplify_ratio),
            "simplify_ratio must lie in [0, 1)",
        )?;
        ensure(non_negative(rooms.snap_tolerance), "snap_tolerance must be >= 0")?;

        let assoc = &self.association;
        ensure(
            non_negative(assoc.max_wall_distance) && non_negative(assoc.room_boundary_tolerance),
            "association distances must be >= 0",
        )?;

        Ok(())
    }
}

fn ensure(condition: bool, message: &str) -> Result<()> {
    if condition {
        Ok(())
    } else {
        Err(Error::InvalidConfig(message.to_string()))
    }
}

/// Also false for NaN
fn non_negative(value: f64) -> bool {
    value >= 0.0
}

/// Pixel-space geometry before scaling, as consumed by renderers
#[derive(Debug, Clone, Serialize)]
pub struct PixelPlan {
    pub rooms: Vec<RoomPolygon>,
    pub walls: Vec<WallSegment>,
    pub doors: Vec<Opening>,
    pub windows: Vec<Opening>,
    /// Shared thickness of every wall, pixels
    pub wall_thickness: u32,
    pub width: u32,
    pub height: u32,
}

/// Intermediate masks kept for inspection
#[derive(Debug, Clone)]
pub struct DebugMasks {
    pub binary: RasterMask,
    pub cleaned: RasterMask,
    /// Enclosed non-wall pixels the rooms were traced from
    pub interior: RasterMask,
}

/// Everything one pipeline run produces
#[derive(Debug, Clone)]
pub struct Reconstruction {
    pub plan: PixelPlan,
    pub result: ReconstructionResult,
    pub masks: DebugMasks,
}

/// Reconstruct a floor plan from an image and detector output the caller
/// already has
pub fn reconstruct(
    image: &RgbImage,
    meters_per_pixel: f64,
    detections: &[OpeningDetection],
    config: &ReconstructionConfig,
) -> Result<Reconstruction> {
    let scale = check_inputs(image, meters_per_pixel, config)?;
    Ok(run(image, &scale, detections, config))
}

/// Reconstruct a floor plan, asking `detector` for doors and windows
pub fn reconstruct_with_detector(
    image: &RgbImage,
    meters_per_pixel: f64,
    detector: &dyn OpeningDetector,
    config: &ReconstructionConfig,
) -> Result<Reconstruction> {
    let scale = check_inputs(image, meters_per_pixel, config)?;
    let detections = detector.detect(image)?;
    tracing::debug!(detections = detections.len(), "Opening detector finished");
    Ok(run(image, &scale, &detections, config))
}

/// Decode an encoded image (PNG or JPEG) and reconstruct it
pub fn reconstruct_from_bytes(
    bytes: &[u8],
    meters_per_pixel: f64,
    detector: &dyn OpeningDetector,
    config: &ReconstructionConfig,
) -> Result<Reconstruction> {
    // Fail on the scale before paying for a decode
    ScaleContext::new(meters_per_pixel)?;
    let image = image::load_from_memory(bytes)?.to_rgb8();
    reconstruct_with_detector(&image, meters_per_pixel, detector, config)
}

fn check_inputs(
    image: &RgbImage,
    meters_per_pixel: f64,
    config: &ReconstructionConfig,
) -> Result<ScaleContext> {
    let scale = ScaleContext::new(meters_per_pixel)?;
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(Error::EmptyImage { width, height });
    }
    config.validate()?;
    Ok(scale)
}

fn run(
    image: &RgbImage,
    scale: &ScaleContext,
    detections: &[OpeningDetection],
    config: &ReconstructionConfig,
) -> Reconstruction {
    let (width, height) = image.dimensions();

    let pre = preprocess(image, &config.preprocess);
    let wall_thickness = estimate_wall_thickness(&pre.cleaned, &config.preprocess);

    // Walls and rooms only share the read-only mask
    let (walls, extraction) = rayon::join(
        || detect_walls(&pre.cleaned, wall_thickness as f64, &config.walls),
        || extract_rooms(&pre.cleaned, &config.rooms),
    );
    let rooms = extraction.rooms;

    let (doors, windows) = classify_detections(detections);
    let doors = associate(&doors, &walls, &rooms, &config.association);
    let windows = associate(&windows, &walls, &rooms, &config.association);

    let result = to_metric(&rooms, &walls, &doors, &windows, scale, &config.export)
        .with_image_size(width, height);

    tracing::info!(
        width,
        height,
        wall_thickness,
        rooms = rooms.len(),
        walls = walls.len(),
        doors = doors.len(),
        windows = windows.len(),
        "Reconstructed floor plan"
    );

    Reconstruction {
        plan: PixelPlan {
            rooms,
            walls,
            doors,
            windows,
            wall_thickness,
            width,
            height,
        },
        result,
        masks: DebugMasks {
            binary: pre.binary,
            cleaned: pre.cleaned,
            interior: extraction.interior_mask,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::StaticDetections;
    use image::Rgb;

    fn blank(width: u32, height: u32) -> RgbImage {
        RgbImage::from_pixel(width, height, Rgb([255, 255, 255]))
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(ReconstructionConfig::default().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_nonsense() {
        let mut config = ReconstructionConfig::default();
        config.rooms.simplify_ratio = 1.5;
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));

        let mut config = ReconstructionConfig::default();
        config.preprocess.threshold = ThresholdMode::Adaptive {
            block_radius: 0,
            offset: 3,
        };
        assert!(config.validate().is_err());

        let mut config = ReconstructionConfig::default();
        config.association.max_wall_distance = f64::NAN;
        assert!(config.validate().is_err());

        let mut config = ReconstructionConfig::default();
        config.walls.canny_low = 200.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_json_config() {
        let config = ReconstructionConfig::from_json(
            r#"{"walls": {"hough_threshold": 80}, "preprocess": {"threshold": {"mode": "otsu"}}}"#,
        )
        .unwrap();

        assert_eq!(config.walls.hough_threshold, 80);
        assert_eq!(config.walls.min_line_length, 100.0);
        assert_eq!(config.preprocess.threshold, ThresholdMode::Otsu);
        assert_eq!(config.rooms, RoomDetectionConfig::default());

        assert!(matches!(
            ReconstructionConfig::from_json(r#"{"rooms": {"min_area_ratio": 2.0}}"#),
            Err(Error::InvalidConfig(_))
        ));
        assert!(ReconstructionConfig::from_json("[").is_err());
    }

    #[test]
    fn test_invalid_scale_fails_first() {
        let empty = RgbImage::new(0, 0);
        let config = ReconstructionConfig::default();
        for scale in [0.0, -1.0] {
            let err = reconstruct(&empty, scale, &[], &config).unwrap_err();
            assert!(matches!(err, Error::InvalidScale(_)));
        }
    }

    #[test]
    fn test_empty_image_is_rejected() {
        let err = reconstruct(&RgbImage::new(0, 10), 0.01, &[], &ReconstructionConfig::default())
            .unwrap_err();
        assert!(matches!(err, Error::EmptyImage { width: 0, height: 10 }));
        assert!(err.is_invalid_input());
    }

    #[test]
    fn test_blank_page_gives_empty_result() {
        let config = ReconstructionConfig::default();
        let out = reconstruct(&blank(120, 90), 0.01, &[], &config).unwrap();

        assert!(out.plan.rooms.is_empty());
        assert!(out.plan.walls.is_empty());
        assert_eq!(out.result.metadata.total_rooms, 0);
        assert_eq!(out.result.metadata.total_walls, 0);
        assert_eq!(out.result.metadata.image_width_px, Some(120));
        assert_eq!(out.plan.wall_thickness, 12);
    }

    #[test]
    fn test_undecodable_bytes() {
        let detector = StaticDetections::default();
        let err = reconstruct_from_bytes(
            b"not an image",
            0.01,
            &detector,
            &ReconstructionConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::UndecodableImage(_)));
    }

    #[test]
    fn test_unmatched_openings_survive() {
        let detections = vec![OpeningDetection {
            class_label: "Window".into(),
            confidence: 0.7,
            bbox: [10.0, 10.0, 20.0, 40.0],
        }];
        let out = reconstruct(&blank(60, 60), 0.5, &detections, &ReconstructionConfig::default())
            .unwrap();

        assert_eq!(out.result.windows.len(), 1);
        assert_eq!(out.result.windows[0].nearest_wall_id, None);
        assert_eq!(out.result.windows[0].room_id, None);
        assert_eq!(out.result.windows[0].position, [7.5, 12.5]);
        assert_eq!(out.plan.windows[0].connected_room_ids, Some(vec![]));
    }
}
