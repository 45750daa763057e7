// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Pixel to meter conversion and the exported reconstruction result
//!
//! Linear quantities are multiplied by the scale once. Areas are multiplied
//! by the scale squared, straight from the pixel area, and are never
//! derived from an already converted and rounded length.

use crate::error::{Error, Result};
use crate::types::{Opening, Orientation, Point2D, RoomPolygon, WallSegment};
use serde::{Deserialize, Serialize};

/// Uniform pixel to meter scale
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleContext {
    meters_per_pixel: f64,
}

impl ScaleContext {
    /// Fails for zero, negative and non-finite scales
    pub fn new(meters_per_pixel: f64) -> Result<Self> {
        if !meters_per_pixel.is_finite() || meters_per_pixel <= 0.0 {
            return Err(Error::InvalidScale(meters_per_pixel));
        }
        Ok(Self { meters_per_pixel })
    }

    pub fn meters_per_pixel(&self) -> f64 {
        self.meters_per_pixel
    }

    pub fn to_metric_length(&self, pixels: f64) -> f64 {
        pixels * self.meters_per_pixel
    }

    pub fn to_metric_point(&self, point: &Point2D) -> [f64; 2] {
        [
            self.to_metric_length(point.x),
            self.to_metric_length(point.y),
        ]
    }

    pub fn to_metric_area(&self, area_px: f64) -> f64 {
        area_px * self.meters_per_pixel * self.meters_per_pixel
    }
}

/// Output rounding
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ExportConfig {
    /// Decimals kept for coordinates and lengths
    pub precision: u32,
    /// Decimals kept for wall angles
    pub angle_precision: u32,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            precision: 3,
            angle_precision: 2,
        }
    }
}

/// Round to a fixed number of decimals
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

/// Summary block of an exported reconstruction
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResultMetadata {
    pub scale_m_per_px: f64,
    pub total_rooms: usize,
    pub total_walls: usize,
    pub total_doors: usize,
    pub total_windows: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_width_px: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_height_px: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MetricRoom {
    pub id: u32,
    pub polygon: Vec<[f64; 2]>,
    /// Unrounded
    pub area_m2: f64,
    pub num_corners: usize,
    pub perimeter_m: f64,
    /// Clockwise edge order, closing edge last
    pub edge_lengths_m: Vec<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MetricWall {
    pub start: [f64; 2],
    pub end: [f64; 2],
    pub thickness_m: f64,
    pub length_m: f64,
    pub angle_deg: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MetricDoor {
    /// Detector label, e.g. "door" or "sliding door"
    #[serde(rename = "type")]
    pub opening_type: String,
    pub position: [f64; 2],
    pub width_m: f64,
    pub height_m: f64,
    pub orientation: Orientation,
    pub confidence: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nearest_wall_id: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connects_rooms: Option<Vec<u32>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MetricWindow {
    #[serde(rename = "type")]
    pub opening_type: String,
    pub position: [f64; 2],
    pub width_m: f64,
    pub height_m: f64,
    pub orientation: Orientation,
    pub confidence: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nearest_wall_id: Option<usize>,
    /// Rooms whose boundary the window sits on
    #[serde(skip_serializing_if = "Option::is_none")]
    pub room_id: Option<Vec<u32>>,
}

/// Final metric reconstruction handed to exporters
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReconstructionResult {
    pub metadata: ResultMetadata,
    pub rooms: Vec<MetricRoom>,
    pub walls: Vec<MetricWall>,
    pub doors: Vec<MetricDoor>,
    pub windows: Vec<MetricWindow>,
}

impl ReconstructionResult {
    /// Record the source raster size in the metadata
    pub fn with_image_size(mut self, width: u32, height: u32) -> Self {
        self.metadata.image_width_px = Some(width);
        self.metadata.image_height_px = Some(height);
        self
    }

    /// Serialize to JSON, pretty-printed unless `compact`
    pub fn to_json(&self, compact: bool) -> Result<String> {
        let json = if compact {
            serde_json::to_string(self)
        } else {
            serde_json::to_string_pretty(self)
        };
        json.map_err(|e| Error::Serialization(e.to_string()))
    }
}

/// Convert pixel-space rooms, walls and associated openings to meters
pub fn to_metric(
    rooms: &[RoomPolygon],
    walls: &[WallSegment],
    doors: &[Opening],
    windows: &[Opening],
    scale: &ScaleContext,
    config: &ExportConfig,
) -> ReconstructionResult {
    let exporter = Exporter { scale, config };

    let rooms: Vec<MetricRoom> = rooms.iter().map(|r| exporter.room(r)).collect();
    let walls: Vec<MetricWall> = walls.iter().map(|w| exporter.wall(w)).collect();
    let doors: Vec<MetricDoor> = doors.iter().map(|d| exporter.door(d)).collect();
    let windows: Vec<MetricWindow> = windows.iter().map(|w| exporter.window(w)).collect();

    ReconstructionResult {
        metadata: ResultMetadata {
            scale_m_per_px: scale.meters_per_pixel(),
            total_rooms: rooms.len(),
            total_walls: walls.len(),
            total_doors: doors.len(),
            total_windows: windows.len(),
            image_width_px: None,
            image_height_px: None,
        },
        rooms,
        walls,
        doors,
        windows,
    }
}

struct Exporter<'a> {
    scale: &'a ScaleContext,
    config: &'a ExportConfig,
}

impl Exporter<'_> {
    fn length(&self, pixels: f64) -> f64 {
        round_to(self.scale.to_metric_length(pixels), self.config.precision)
    }

    fn point(&self, point: &Point2D) -> [f64; 2] {
        let [x, y] = self.scale.to_metric_point(point);
        [
            round_to(x, self.config.precision),
            round_to(y, self.config.precision),
        ]
    }

    fn room(&self, room: &RoomPolygon) -> MetricRoom {
        let edge_lengths_m: Vec<f64> = room
            .edge_lengths()
            .into_iter()
            .map(|e| self.length(e))
            .collect();

        MetricRoom {
            id: room.id,
            polygon: room.vertices.iter().map(|v| self.point(v)).collect(),
            area_m2: self.scale.to_metric_area(room.area),
            num_corners: room.corner_count(),
            perimeter_m: self.length(room.perimeter()),
            edge_lengths_m,
        }
    }

    fn wall(&self, wall: &WallSegment) -> MetricWall {
        MetricWall {
            start: self.point(&wall.start),
            end: self.point(&wall.end),
            thickness_m: self.length(wall.thickness),
            length_m: self.length(wall.length),
            angle_deg: round_to(wall.angle, self.config.angle_precision),
        }
    }

    fn door(&self, door: &Opening) -> MetricDoor {
        MetricDoor {
            opening_type: door.class_label.clone(),
            position: self.point(&door.center),
            width_m: self.length(door.width),
            height_m: self.length(door.height),
            orientation: door.orientation,
            confidence: door.confidence,
            nearest_wall_id: door.nearest_wall_id,
            connects_rooms: non_empty(&door.connected_room_ids),
        }
    }

    fn window(&self, window: &Opening) -> MetricWindow {
        MetricWindow {
            opening_type: window.class_label.clone(),
            position: self.point(&window.center),
            width_m: self.length(window.width),
            height_m: self.length(window.height),
            orientation: window.orientation,
            confidence: window.confidence,
            nearest_wall_id: window.nearest_wall_id,
            room_id: non_empty(&window.connected_room_ids),
        }
    }
}

fn non_empty(ids: &Option<Vec<u32>>) -> Option<Vec<u32>> {
    ids.as_ref().filter(|ids| !ids.is_empty()).cloned()
}
