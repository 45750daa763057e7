// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Room detection via exterior fill and contour tracing

use crate::preprocess::external_contours;
use crate::types::{Point2D, RasterMask, RoomPolygon};
use image::{GrayImage, Luma};
use serde::{Deserialize, Serialize};

/// Configuration for room extraction
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RoomDetectionConfig {
    /// Contours smaller than this fraction of the image area are noise
    pub min_area_ratio: f64,
    /// Simplification tolerance as a fraction of the contour perimeter
    pub simplify_ratio: f64,
    /// Vertices closer than this on one axis share that coordinate (pixels)
    pub snap_tolerance: f64,
}

impl Default for RoomDetectionConfig {
    fn default() -> Self {
        Self {
            min_area_ratio: 0.001,
            simplify_ratio: 0.01,
            snap_tolerance: 5.0,
        }
    }
}

/// Rooms plus the interior mask they were traced from
#[derive(Debug, Clone)]
pub struct RoomExtraction {
    pub rooms: Vec<RoomPolygon>,
    /// Enclosed, non-wall pixels
    pub interior_mask: RasterMask,
}

/// Detect rooms as closed polygons in a wall mask
pub fn detect_rooms(walls: &RasterMask, config: &RoomDetectionConfig) -> Vec<RoomPolygon> {
    extract_rooms(walls, config).rooms
}

/// Detect rooms and keep the interior mask for inspection
///
/// Regions of the wall mask's complement that are not reachable from the
/// image border are room interiors. Each interior's outer contour is
/// simplified, axis-snapped and ordered clockwise. Contours that are too
/// small or collapse below three corners are dropped.
pub fn extract_rooms(walls: &RasterMask, config: &RoomDetectionConfig) -> RoomExtraction {
    let interior_mask = interior_mask(walls);
    let min_area = walls.area() as f64 * config.min_area_ratio;

    let mut rooms = Vec::new();
    for contour in external_contours(interior_mask.as_image()) {
        let points: Vec<Point2D> = contour
            .points
            .iter()
            .map(|p| Point2D::new(p.x as f64, p.y as f64))
            .collect();

        let contour_area = RoomPolygon::calculate_area(&points);
        if contour_area < min_area {
            tracing::trace!(contour_area, min_area, "Dropped small contour");
            continue;
        }

        let perimeter = closed_length(&points);
        if perimeter == 0.0 {
            continue;
        }

        let simplified = simplify_closed(&points, config.simplify_ratio * perimeter);
        if simplified.len() < 3 {
            tracing::trace!(corners = simplified.len(), "Dropped degenerate contour");
            continue;
        }

        let snapped = dedup_vertices(&snap_axis_aligned(&simplified, config.snap_tolerance));
        if snapped.len() < 3 {
            tracing::trace!(corners = snapped.len(), "Dropped contour collapsed by snapping");
            continue;
        }

        let room = RoomPolygon::new(rooms.len() as u32, order_clockwise(&snapped));
        if room.area == 0.0 {
            continue;
        }
        rooms.push(room);
    }

    tracing::debug!(
        rooms = rooms.len(),
        min_area,
        interior_pixels = interior_mask.foreground_count(),
        "Detected rooms"
    );

    RoomExtraction {
        rooms,
        interior_mask,
    }
}

/// Non-wall pixels that cannot be reached from the image border
pub fn interior_mask(walls: &RasterMask) -> RasterMask {
    let width = walls.width();
    let height = walls.height();
    if width == 0 || height == 0 {
        return RasterMask::empty(width, height);
    }

    let idx = |x: u32, y: u32| (y * width + x) as usize;
    let mut exterior = vec![false; (width * height) as usize];
    let mut stack: Vec<(u32, u32)> = Vec::new();

    // Seed from every non-wall border pixel
    for x in 0..width {
        stack.push((x, 0));
        stack.push((x, height - 1));
    }
    for y in 0..height {
        stack.push((0, y));
        stack.push((width - 1, y));
    }

    // 4-connected flood fill of the outside
    while let Some((x, y)) = stack.pop() {
        if exterior[idx(x, y)] || walls.is_foreground(x, y) {
            continue;
        }
        exterior[idx(x, y)] = true;

        if x > 0 {
            stack.push((x - 1, y));
        }
        if x < width - 1 {
            stack.push((x + 1, y));
        }
        if y > 0 {
            stack.push((x, y - 1));
        }
        if y < height - 1 {
            stack.push((x, y + 1));
        }
    }

    let mut interior = GrayImage::new(width, height);
    for y in 0..height {
        for x in 0..width {
            if !exterior[idx(x, y)] && !walls.is_foreground(x, y) {
                interior.put_pixel(x, y, Luma([255]));
            }
        }
    }

    RasterMask::from_image(interior)
}

/// Length of a closed polyline, closing edge included
fn closed_length(points: &[Point2D]) -> f64 {
    let n = points.len();
    if n < 2 {
        return 0.0;
    }
    (0..n)
        .map(|i| points[i].distance_to(&points[(i + 1) % n]))
        .sum()
}

/// Douglas-Peucker simplification of a closed contour
///
/// The loop is cut at its first point and at the point farthest from it,
/// and both halves are simplified as open polylines.
pub fn simplify_closed(points: &[Point2D], epsilon: f64) -> Vec<Point2D> {
    if points.len() < 3 {
        return points.to_vec();
    }

    let first = points[0];
    let mut far_idx = 0;
    let mut far_dist = 0.0;
    for (i, p) in points.iter().enumerate().skip(1) {
        let dist = first.distance_to(p);
        if dist > far_dist {
            far_dist = dist;
            far_idx = i;
        }
    }
    if far_idx == 0 {
        return vec![first];
    }

    let forward = douglas_peucker(&points[..=far_idx], epsilon);
    let mut closing = points[far_idx..].to_vec();
    closing.push(first);
    let backward = douglas_peucker(&closing, epsilon);

    let mut result = forward;
    result.extend_from_slice(&backward[1..backward.len() - 1]);
    result
}

/// Douglas-Peucker line simplification algorithm
fn douglas_peucker(points: &[Point2D], epsilon: f64) -> Vec<Point2D> {
    if points.len() < 3 {
        return points.to_vec();
    }

    // Find the point with maximum distance from line between first and last
    let first = &points[0];
    let last = &points[points.len() - 1];

    let mut max_dist = 0.0;
    let mut max_idx = 0;

    for (i, point) in points.iter().enumerate().skip(1).take(points.len() - 2) {
        let dist = perpendicular_distance(point, first, last);
        if dist > max_dist {
            max_dist = dist;
            max_idx = i;
        }
    }

    if max_dist > epsilon {
        let left = douglas_peucker(&points[..=max_idx], epsilon);
        let right = douglas_peucker(&points[max_idx..], epsilon);

        // Combine results (excluding duplicate point at max_idx)
        let mut result = left;
        result.extend_from_slice(&right[1..]);
        result
    } else {
        vec![*first, *last]
    }
}

/// Calculate perpendicular distance from point to line
fn perpendicular_distance(point: &Point2D, line_start: &Point2D, line_end: &Point2D) -> f64 {
    let dx = line_end.x - line_start.x;
    let dy = line_end.y - line_start.y;
    let length_sq = dx * dx + dy * dy;

    if length_sq < 1e-10 {
        return point.distance_to(line_start);
    }

    let length = length_sq.sqrt();
    ((point.x - line_start.x) * dy - (point.y - line_start.y) * dx).abs() / length
}

/// Make near-equal coordinates exactly equal
///
/// Every vertex pair closer than `tolerance` on the x axis gets the x of
/// the earlier vertex, and likewise for y.
pub fn snap_axis_aligned(points: &[Point2D], tolerance: f64) -> Vec<Point2D> {
    let mut snapped = points.to_vec();
    let n = snapped.len();

    for i in 0..n {
        for j in (i + 1)..n {
            if (snapped[j].x - snapped[i].x).abs() < tolerance {
                snapped[j].x = snapped[i].x;
            }
            if (snapped[j].y - snapped[i].y).abs() < tolerance {
                snapped[j].y = snapped[i].y;
            }
        }
    }

    snapped
}

/// Drop repeated vertices, keeping first occurrences
fn dedup_vertices(points: &[Point2D]) -> Vec<Point2D> {
    let mut unique: Vec<Point2D> = Vec::with_capacity(points.len());
    for p in points {
        if !unique.contains(p) {
            unique.push(*p);
        }
    }
    unique
}

/// Order vertices clockwise on screen around their centroid
///
/// Vertices are sorted by ascending polar angle from the vertex centroid,
/// which runs clockwise when the y axis points down. The sort is stable,
/// so applying it to its own output returns the same sequence.
pub fn order_clockwise(points: &[Point2D]) -> Vec<Point2D> {
    if points.is_empty() {
        return Vec::new();
    }

    let n = points.len() as f64;
    let cx = points.iter().map(|p| p.x).sum::<f64>() / n;
    let cy = points.iter().map(|p| p.y).sum::<f64>() / n;

    let mut keyed: Vec<(f64, Point2D)> = points
        .iter()
        .map(|p| ((p.y - cy).atan2(p.x - cx), *p))
        .collect();
    keyed.sort_by(|a, b| a.0.total_cmp(&b.0));

    keyed.into_iter().map(|(_, p)| p).collect()
}
