// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Floor plan raster to metric geometry
//!
//! This crate turns a scanned or drawn floor plan into:
//! 1. Walls, as merged line segments with a shared thickness estimate
//! 2. Rooms, as clockwise polygons traced from enclosed regions
//! 3. Doors and windows, linked to their nearest wall and the rooms they
//!    open onto
//!
//! all converted from pixels to meters with a single scale factor.
//!
//! Doors and windows are found by an external object detector, supplied
//! either as plain detections or through the [`OpeningDetector`] trait.
//!
//! # Usage
//!
//! ```rust,ignore
//! use floorplan_lite_vision::{reconstruct, OpeningDetection, ReconstructionConfig};
//!
//! let image = image::open("plan.png")?.to_rgb8();
//! let detections: Vec<OpeningDetection> = serde_json::from_str(&detector_json)?;
//!
//! let out = reconstruct(&image, 0.01, &detections, &ReconstructionConfig::default())?;
//! println!("{}", out.result.to_json(false)?);
//! ```

pub mod association;
pub mod detector;
pub mod error;
pub mod image_ops;
pub mod line_ops;
pub mod pipeline;
pub mod preprocess;
pub mod room_detector;
pub mod scale;
pub mod types;
pub mod wall_detector;

// Re-export commonly used types and functions
pub use association::{associate, AssociationConfig};
pub use detector::{classify_detections, OpeningDetection, OpeningDetector, StaticDetections};
pub use error::{Error, Result};
pub use pipeline::{
    reconstruct, reconstruct_from_bytes, reconstruct_with_detector, DebugMasks, PixelPlan,
    Reconstruction, ReconstructionConfig,
};
pub use preprocess::{estimate_wall_thickness, preprocess, PreprocessConfig, ThresholdMode};
pub use room_detector::{detect_rooms, extract_rooms, RoomDetectionConfig};
pub use scale::{to_metric, ExportConfig, ReconstructionResult, ScaleContext};
pub use types::{
    BoundingBox, DetectedLine, Opening, OpeningKind, Orientation, Point2D, RasterMask,
    RoomPolygon, WallSegment,
};
pub use wall_detector::{detect_walls, WallDetectionConfig};
