// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Core pixel-space types for floor plan reconstruction

use image::{GrayImage, Luma};
use nalgebra::{Point2, Vector2};
use serde::{Deserialize, Serialize};

/// A 2D point in pixel coordinates (x right, y down)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Point2D {
    pub x: f64,
    pub y: f64,
}

impl Point2D {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn to_nalgebra(&self) -> Point2<f64> {
        Point2::new(self.x, self.y)
    }

    pub fn from_nalgebra(p: &Point2<f64>) -> Self {
        Self { x: p.x, y: p.y }
    }

    pub fn distance_to(&self, other: &Point2D) -> f64 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Vector from `self` to `other`
    pub fn vector_to(&self, other: &Point2D) -> Vector2<f64> {
        other.to_nalgebra() - self.to_nalgebra()
    }
}

/// Binary raster where non-zero pixels are wall strokes.
///
/// Pixels are stored as 0 / 255. A mask is never modified after
/// construction; cleaning stages build a new one.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterMask {
    image: GrayImage,
}

impl RasterMask {
    /// Wrap a grayscale image, treating any non-zero pixel as foreground
    pub fn from_image(image: GrayImage) -> Self {
        let mut image = image;
        for pixel in image.pixels_mut() {
            if pixel.0[0] != 0 {
                *pixel = Luma([255]);
            }
        }
        Self { image }
    }

    /// An all-background mask
    pub fn empty(width: u32, height: u32) -> Self {
        Self {
            image: GrayImage::new(width, height),
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Total pixel count (width × height)
    pub fn area(&self) -> u64 {
        self.width() as u64 * self.height() as u64
    }

    pub fn is_foreground(&self, x: u32, y: u32) -> bool {
        self.image.get_pixel(x, y).0[0] != 0
    }

    pub fn foreground_count(&self) -> usize {
        self.image.pixels().filter(|p| p.0[0] != 0).count()
    }

    pub fn as_image(&self) -> &GrayImage {
        &self.image
    }

    pub fn into_image(self) -> GrayImage {
        self.image
    }
}

/// Fold an angle in degrees into [0, 180) so a direction and its opposite
/// compare equal.
pub fn normalize_angle_deg(angle: f64) -> f64 {
    // + 0.0 turns -0.0 into 0.0
    angle.rem_euclid(180.0) + 0.0
}

/// Undirected line angle from `start` to `end`, in degrees within [0, 180)
pub fn line_angle_deg(start: &Point2D, end: &Point2D) -> f64 {
    normalize_angle_deg((end.y - start.y).atan2(end.x - start.x).to_degrees())
}

/// Raw line segment produced by the line detector, before thickness is known
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct DetectedLine {
    pub start: Point2D,
    pub end: Point2D,
    /// Degrees in [0, 180)
    pub angle: f64,
    /// Euclidean distance between `start` and `end`
    pub length: f64,
}

impl DetectedLine {
    pub fn new(start: Point2D, end: Point2D) -> Self {
        Self {
            start,
            end,
            angle: line_angle_deg(&start, &end),
            length: start.distance_to(&end),
        }
    }

    /// Build a line that keeps a given angle instead of recomputing it from
    /// the endpoints. Used when a merged group inherits its first member's
    /// angle.
    pub fn with_angle(start: Point2D, end: Point2D, angle: f64) -> Self {
        Self {
            start,
            end,
            angle: normalize_angle_deg(angle),
            length: start.distance_to(&end),
        }
    }

    pub fn endpoints(&self) -> [Point2D; 2] {
        [self.start, self.end]
    }

    pub fn midpoint(&self) -> Point2D {
        Point2D::new(
            (self.start.x + self.end.x) / 2.0,
            (self.start.y + self.end.y) / 2.0,
        )
    }
}

/// Detected wall: a merged line segment with a thickness estimate
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct WallSegment {
    pub start: Point2D,
    pub end: Point2D,
    /// Degrees in [0, 180)
    pub angle: f64,
    /// Pixels, always `start.distance_to(&end)`
    pub length: f64,
    /// Pixels, shared by every wall of one detection run
    pub thickness: f64,
}

impl WallSegment {
    pub fn from_line(line: &DetectedLine, thickness: f64) -> Self {
        Self {
            start: line.start,
            end: line.end,
            angle: line.angle,
            length: line.length,
            thickness,
        }
    }
}

/// Detected room: a closed polygon in pixel coordinates
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoomPolygon {
    /// Unique within one reconstruction, assigned in discovery order
    pub id: u32,
    /// Clockwise on screen (y axis down), at least 3 vertices
    pub vertices: Vec<Point2D>,
    /// Shoelace area of `vertices`, in square pixels
    pub area: f64,
}

impl RoomPolygon {
    pub fn new(id: u32, vertices: Vec<Point2D>) -> Self {
        let area = Self::calculate_area(&vertices);
        Self { id, vertices, area }
    }

    pub fn corner_count(&self) -> usize {
        self.vertices.len()
    }

    /// Edge lengths in traversal order, closing edge last
    pub fn edge_lengths(&self) -> Vec<f64> {
        let n = self.vertices.len();
        (0..n)
            .map(|i| self.vertices[i].distance_to(&self.vertices[(i + 1) % n]))
            .collect()
    }

    pub fn perimeter(&self) -> f64 {
        self.edge_lengths().iter().sum()
    }

    /// Calculate polygon area using shoelace formula
    pub fn calculate_area(points: &[Point2D]) -> f64 {
        Self::signed_area(points).abs()
    }

    /// Shoelace area keeping its sign. Positive when the points run
    /// clockwise on screen.
    pub fn signed_area(points: &[Point2D]) -> f64 {
        let n = points.len();
        if n < 3 {
            return 0.0;
        }

        let mut area = 0.0;
        for i in 0..n {
            let j = (i + 1) % n;
            area += points[i].x * points[j].y;
            area -= points[j].x * points[i].y;
        }

        area / 2.0
    }
}

/// Axis-aligned pixel rectangle `[x1, y1, x2, y2]`
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct BoundingBox {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl BoundingBox {
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn width(&self) -> f64 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f64 {
        self.y2 - self.y1
    }

    pub fn center(&self) -> Point2D {
        Point2D::new((self.x1 + self.x2) / 2.0, (self.y1 + self.y2) / 2.0)
    }
}

/// Opening orientation derived from its box aspect
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Horizontal,
    Vertical,
}

impl Orientation {
    /// Wider than tall is horizontal; square boxes count as vertical.
    pub fn from_extent(width: f64, height: f64) -> Self {
        if width > height {
            Orientation::Horizontal
        } else {
            Orientation::Vertical
        }
    }
}

/// Opening type classification
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OpeningKind {
    Door,
    Window,
}

/// Door or window anchored in pixel space
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Opening {
    pub kind: OpeningKind,
    /// Detector label, lower-cased (e.g. "door", "sliding door")
    pub class_label: String,
    pub bbox: BoundingBox,
    pub center: Point2D,
    pub width: f64,
    pub height: f64,
    pub orientation: Orientation,
    /// In [0, 1]
    pub confidence: f64,
    /// Index into the wall list, `None` when no wall is close enough or
    /// the opening has not been associated yet
    pub nearest_wall_id: Option<usize>,
    /// Ids of rooms whose boundary passes through the opening, `None` until
    /// associated
    pub connected_room_ids: Option<Vec<u32>>,
}

impl Opening {
    pub fn new(kind: OpeningKind, class_label: String, bbox: BoundingBox, confidence: f64) -> Self {
        let width = bbox.width();
        let height = bbox.height();
        Self {
            kind,
            class_label,
            bbox,
            center: bbox.center(),
            width,
            height,
            orientation: Orientation::from_extent(width, height),
            confidence,
            nearest_wall_id: None,
            connected_room_ids: None,
        }
    }

    /// Copy of this opening with its association fields populated
    pub fn with_links(&self, nearest_wall_id: Option<usize>, connected_room_ids: Vec<u32>) -> Self {
        Self {
            nearest_wall_id,
            connected_room_ids: Some(connected_room_ids),
            ..self.clone()
        }
    }
}
