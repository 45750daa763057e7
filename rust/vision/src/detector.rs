// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Opening detector capability
//!
//! Doors and windows come from an external object detector. The pipeline
//! only sees it through [`OpeningDetector`]; loading and caching a model is
//! the caller's business.

use crate::error::{Error, Result};
use crate::scale::round_to;
use crate::types::{BoundingBox, Opening, OpeningKind};
use image::RgbImage;
use serde::{Deserialize, Serialize};

/// One raw box reported by a detector
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OpeningDetection {
    /// Free-form class name, e.g. "Door" or "sliding door"
    pub class_label: String,
    pub confidence: f64,
    /// `[x1, y1, x2, y2]` in pixels
    pub bbox: [f64; 4],
}

/// Capability that finds door and window boxes in an image
pub trait OpeningDetector: Send + Sync {
    fn detect(&self, image: &RgbImage) -> Result<Vec<OpeningDetection>>;
}

/// Detections computed ahead of time, returned for any image
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StaticDetections {
    detections: Vec<OpeningDetection>,
}

impl StaticDetections {
    pub fn new(detections: Vec<OpeningDetection>) -> Self {
        Self { detections }
    }

    /// Parse a JSON array of detections
    pub fn from_json(json: &str) -> Result<Self> {
        let detections: Vec<OpeningDetection> = serde_json::from_str(json)
            .map_err(|e| Error::Detector(format!("malformed detections: {}", e)))?;
        Ok(Self::new(detections))
    }

    pub fn detections(&self) -> &[OpeningDetection] {
        &self.detections
    }
}

impl OpeningDetector for StaticDetections {
    fn detect(&self, _image: &RgbImage) -> Result<Vec<OpeningDetection>> {
        Ok(self.detections.clone())
    }
}

/// Split raw detections into doors and windows.
///
/// Labels are matched case-insensitively by substring, "door" before
/// "window"; anything else is dropped. Box corners are truncated to whole
/// pixels and confidence is kept to 3 decimals.
pub fn classify_detections(detections: &[OpeningDetection]) -> (Vec<Opening>, Vec<Opening>) {
    let mut doors = Vec::new();
    let mut windows = Vec::new();

    for detection in detections {
        let label = detection.class_label.to_lowercase();
        let kind = if label.contains("door") {
            OpeningKind::Door
        } else if label.contains("window") {
            OpeningKind::Window
        } else {
            tracing::trace!(label = %label, "Ignoring non-opening detection");
            continue;
        };

        let [x1, y1, x2, y2] = detection.bbox.map(f64::trunc);
        let opening = Opening::new(
            kind,
            label,
            BoundingBox::new(x1, y1, x2, y2),
            round_to(detection.confidence, 3),
        );

        match kind {
            OpeningKind::Door => doors.push(opening),
            OpeningKind::Window => windows.push(opening),
        }
    }

    (doors, windows)
}
