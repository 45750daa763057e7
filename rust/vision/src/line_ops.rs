// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Line detection and processing operations

use crate::types::{DetectedLine, Point2D};
use image::GrayImage;
use std::f64::consts::PI;

/// Upper bound on accumulator peaks turned into segments
const MAX_PEAKS: usize = 500;

/// Distance (pixels) from a peak's line within which edge points join it
const PEAK_BAND: f64 = 2.0;

/// Parameters of the probabilistic Hough transform
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HoughParams {
    /// Distance resolution of the accumulator (pixels)
    pub rho_resolution: f64,
    /// Number of angle bins covering [0, π)
    pub theta_bins: usize,
    /// Minimum votes for an accumulator cell to become a line candidate
    pub vote_threshold: u32,
    /// Segments shorter than this are discarded (pixels)
    pub min_line_length: f64,
    /// Largest gap between consecutive edge points on one segment (pixels)
    pub max_line_gap: f64,
}

/// Detect line segments using a probabilistic Hough transform
///
/// Edge points vote in a discretized (ρ, θ) space. Peaks above the vote
/// threshold are visited strongest first; the still unused edge points near
/// each peak line are ordered along it and split wherever consecutive
/// points are further apart than `max_line_gap`. Output order is fully
/// determined by the edge image.
pub fn detect_lines(edges: &GrayImage, params: &HoughParams) -> Vec<DetectedLine> {
    let width = edges.width() as f64;
    let height = edges.height() as f64;

    // Collect edge points in raster order
    let edge_points: Vec<(f64, f64)> = edges
        .enumerate_pixels()
        .filter(|(_, _, p)| p.0[0] > 128)
        .map(|(x, y, _)| (x as f64, y as f64))
        .collect();

    if edge_points.is_empty() || params.theta_bins == 0 || params.rho_resolution <= 0.0 {
        return Vec::new();
    }

    // Precompute sin/cos tables
    let theta_resolution = PI / params.theta_bins as f64;
    let (cos_table, sin_table): (Vec<f64>, Vec<f64>) = (0..params.theta_bins)
        .map(|i| {
            let theta = i as f64 * theta_resolution;
            (theta.cos(), theta.sin())
        })
        .unzip();

    let max_rho = (width * width + height * height).sqrt();
    let num_rhos = (2.0 * max_rho / params.rho_resolution) as usize + 1;

    // Vote in Hough space
    let mut accumulator = vec![0u32; params.theta_bins * num_rhos];
    for &(x, y) in &edge_points {
        for theta_idx in 0..params.theta_bins {
            let rho = x * cos_table[theta_idx] + y * sin_table[theta_idx];
            let rho_idx = ((rho + max_rho) / params.rho_resolution) as usize;
            if rho_idx < num_rhos {
                accumulator[theta_idx * num_rhos + rho_idx] += 1;
            }
        }
    }

    let mut peaks: Vec<(usize, usize, u32)> = Vec::new();
    for theta_idx in 0..params.theta_bins {
        for rho_idx in 0..num_rhos {
            let votes = accumulator[theta_idx * num_rhos + rho_idx];
            if votes >= params.vote_threshold {
                peaks.push((theta_idx, rho_idx, votes));
            }
        }
    }

    // Strongest first; the sort is stable so ties keep accumulator order
    peaks.sort_by(|a, b| b.2.cmp(&a.2));

    let mut lines = Vec::new();
    let mut used_points = vec![false; edge_points.len()];

    for &(theta_idx, rho_idx, _votes) in peaks.iter().take(MAX_PEAKS) {
        let cos_t = cos_table[theta_idx];
        let sin_t = sin_table[theta_idx];
        // Centre of the accumulator cell
        let rho = (rho_idx as f64 + 0.5) * params.rho_resolution - max_rho;

        let mut line_points: Vec<(f64, f64, usize)> = edge_points
            .iter()
            .enumerate()
            .filter(|(i, p)| {
                !used_points[*i] && (p.0 * cos_t + p.1 * sin_t - rho).abs() < PEAK_BAND
            })
            .map(|(i, p)| (p.0, p.1, i))
            .collect();

        if line_points.len() < 2 {
            continue;
        }

        // Sort points along the line direction
        line_points.sort_by(|a, b| {
            let proj_a = a.0 * (-sin_t) + a.1 * cos_t;
            let proj_b = b.0 * (-sin_t) + b.1 * cos_t;
            proj_a.total_cmp(&proj_b)
        });

        // Split into runs at gaps
        let mut segment_start = 0;
        for i in 1..=line_points.len() {
            let at_gap = i == line_points.len() || {
                let dx = line_points[i].0 - line_points[i - 1].0;
                let dy = line_points[i].1 - line_points[i - 1].1;
                (dx * dx + dy * dy).sqrt() > params.max_line_gap
            };
            if !at_gap {
                continue;
            }

            if i - segment_start >= 2 {
                let first = &line_points[segment_start];
                let last = &line_points[i - 1];
                let (start, end) = ordered_endpoints(
                    Point2D::new(first.0, first.1),
                    Point2D::new(last.0, last.1),
                );

                if start.distance_to(&end) >= params.min_line_length {
                    lines.push(DetectedLine::new(start, end));
                    for point in &line_points[segment_start..i] {
                        used_points[point.2] = true;
                    }
                }
            }
            segment_start = i;
        }
    }

    lines
}

/// Put the endpoint with the smaller x (then smaller y) first
fn ordered_endpoints(a: Point2D, b: Point2D) -> (Point2D, Point2D) {
    if (b.x, b.y) < (a.x, a.y) {
        (b, a)
    } else {
        (a, b)
    }
}

/// Angular distance between two undirected line angles, in degrees [0, 90]
pub fn angle_difference_deg(a: f64, b: f64) -> f64 {
    let diff = (a - b).abs() % 180.0;
    diff.min(180.0 - diff)
}

/// Merge collinear line segments in a single ordered pass.
///
/// Each not-yet-merged segment seeds a group; every later unmerged segment
/// joins the group when its angle is within `angle_tolerance_deg` of, and
/// one of its endpoints lies within `distance_tolerance` of an endpoint of,
/// any current member. A segment that joined a group is never reconsidered,
/// so input order decides ambiguous cases. Each group collapses to the
/// segment spanning its two most distant endpoints and keeps the angle of
/// its seed.
pub fn merge_collinear_lines(
    lines: &[DetectedLine],
    angle_tolerance_deg: f64,
    distance_tolerance: f64,
) -> Vec<DetectedLine> {
    let mut merged: Vec<DetectedLine> = Vec::new();
    let mut used = vec![false; lines.len()];

    for i in 0..lines.len() {
        if used[i] {
            continue;
        }

        let mut group = vec![lines[i]];
        used[i] = true;

        for j in (i + 1)..lines.len() {
            if used[j] {
                continue;
            }

            let joins = group.iter().any(|member| {
                are_mergeable(member, &lines[j], angle_tolerance_deg, distance_tolerance)
            });
            if joins {
                group.push(lines[j]);
                used[j] = true;
            }
        }

        merged.push(merge_line_group(&group));
    }

    merged
}

/// Similar direction and touching endpoints
fn are_mergeable(
    l1: &DetectedLine,
    l2: &DetectedLine,
    angle_tolerance_deg: f64,
    distance_tolerance: f64,
) -> bool {
    if angle_difference_deg(l1.angle, l2.angle) >= angle_tolerance_deg {
        return false;
    }

    l1.endpoints().iter().any(|p| {
        l2.endpoints()
            .iter()
            .any(|q| p.distance_to(q) < distance_tolerance)
    })
}

/// Merge a group of collinear lines into one
fn merge_line_group(group: &[DetectedLine]) -> DetectedLine {
    if group.len() == 1 {
        return group[0];
    }

    let all_points: Vec<Point2D> = group.iter().flat_map(|l| l.endpoints()).collect();

    // Find the two most distant endpoints; first pair wins ties
    let mut max_dist = -1.0;
    let mut extremes = (all_points[0], all_points[1]);
    for i in 0..all_points.len() {
        for j in (i + 1)..all_points.len() {
            let dist = all_points[i].distance_to(&all_points[j]);
            if dist > max_dist {
                max_dist = dist;
                extremes = (all_points[i], all_points[j]);
            }
        }
    }

    DetectedLine::with_angle(extremes.0, extremes.1, group[0].angle)
}

/// Shortest distance from a point to a finite segment.
///
/// The point is projected onto the segment's line and the projection is
/// clamped to the segment, so points beyond an end measure to that end.
pub fn point_to_segment_distance(point: &Point2D, start: &Point2D, end: &Point2D) -> f64 {
    let direction = start.vector_to(end);
    let length_sq = direction.norm_squared();

    if length_sq < 1e-10 {
        return point.distance_to(start);
    }

    let t = (start.vector_to(point).dot(&direction) / length_sq).clamp(0.0, 1.0);
    let projection = start.to_nalgebra() + direction * t;

    (point.to_nalgebra() - projection).norm()
}
