// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Link openings to their host wall and the rooms they connect
//!
//! Both links are independent proximity queries from the opening's center.
//! A wall or room that is too far away simply leaves the link empty.

use crate::line_ops::point_to_segment_distance;
use crate::types::{Opening, Point2D, RoomPolygon, WallSegment};
use serde::{Deserialize, Serialize};

/// Proximity thresholds for association
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AssociationConfig {
    /// An opening's center must be closer than this to its wall (pixels)
    pub max_wall_distance: f64,
    /// An opening connects a room when its center is closer than this to
    /// the room boundary, on either side (pixels)
    pub room_boundary_tolerance: f64,
}

impl Default for AssociationConfig {
    fn default() -> Self {
        Self {
            max_wall_distance: 15.0,
            room_boundary_tolerance: 20.0,
        }
    }
}

/// Return copies of `openings` with wall and room links populated
pub fn associate(
    openings: &[Opening],
    walls: &[WallSegment],
    rooms: &[RoomPolygon],
    config: &AssociationConfig,
) -> Vec<Opening> {
    openings
        .iter()
        .map(|opening| {
            let wall = nearest_wall(&opening.center, walls, config.max_wall_distance);
            let connected =
                connected_rooms(&opening.center, rooms, config.room_boundary_tolerance);
            if wall.is_none() {
                tracing::trace!(label = %opening.class_label, "Opening has no wall in range");
            }
            opening.with_links(wall, connected)
        })
        .collect()
}

/// Index of the wall closest to `point`, if closer than `max_distance`.
/// The first wall wins ties.
pub fn nearest_wall(point: &Point2D, walls: &[WallSegment], max_distance: f64) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;

    for (i, wall) in walls.iter().enumerate() {
        let dist = point_to_segment_distance(point, &wall.start, &wall.end);
        match best {
            Some((_, best_dist)) if dist >= best_dist => {}
            _ => best = Some((i, dist)),
        }
    }

    best.filter(|&(_, dist)| dist < max_distance).map(|(i, _)| i)
}

/// Ids of rooms whose boundary lies within `tolerance` of `point`,
/// in room order
pub fn connected_rooms(point: &Point2D, rooms: &[RoomPolygon], tolerance: f64) -> Vec<u32> {
    rooms
        .iter()
        .filter(|room| signed_distance_to_polygon(point, &room.vertices).abs() < tolerance)
        .map(|room| room.id)
        .collect()
}

/// Distance from `point` to the nearest polygon edge, positive inside the
/// polygon and negative outside
pub fn signed_distance_to_polygon(point: &Point2D, vertices: &[Point2D]) -> f64 {
    let n = vertices.len();
    if n == 0 {
        return f64::NEG_INFINITY;
    }

    let distance = (0..n)
        .map(|i| point_to_segment_distance(point, &vertices[i], &vertices[(i + 1) % n]))
        .fold(f64::INFINITY, f64::min);

    if point_in_polygon(point, vertices) {
        distance
    } else {
        -distance
    }
}

/// Even-odd ray casting test
pub fn point_in_polygon(point: &Point2D, vertices: &[Point2D]) -> bool {
    let n = vertices.len();
    let mut inside = false;

    let mut j = n.wrapping_sub(1);
    for i in 0..n {
        let a = &vertices[i];
        let b = &vertices[j];
        if (a.y > point.y) != (b.y > point.y) {
            let x_cross = a.x + (point.y - a.y) * (b.x - a.x) / (b.y - a.y);
            if point.x < x_cross {
                inside = !inside;
            }
        }
        j = i;
    }

    inside
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BoundingBox, DetectedLine, OpeningKind};
    use approx::assert_relative_eq;

    fn wall(x0: f64, y0: f64, x1: f64, y1: f64) -> WallSegment {
        WallSegment::from_line(
            &DetectedLine::new(Point2D::new(x0, y0), Point2D::new(x1, y1)),
            10.0,
        )
    }

    fn room(id: u32, x0: f64, y0: f64, x1: f64, y1: f64) -> RoomPolygon {
        RoomPolygon::new(
            id,
            vec![
                Point2D::new(x0, y0),
                Point2D::new(x1, y0),
                Point2D::new(x1, y1),
                Point2D::new(x0, y1),
            ],
        )
    }

    fn door_at(cx: f64, cy: f64) -> Opening {
        Opening::new(
            OpeningKind::Door,
            "door".into(),
            BoundingBox::new(cx - 20.0, cy - 5.0, cx + 20.0, cy + 5.0),
            0.9,
        )
    }

    #[test]
    fn test_nearest_wall_within_threshold() {
        let walls = vec![wall(0.0, 0.0, 100.0, 0.0), wall(0.0, 50.0, 100.0, 50.0)];

        assert_eq!(nearest_wall(&Point2D::new(50.0, 45.0), &walls, 15.0), Some(1));
        assert_eq!(nearest_wall(&Point2D::new(50.0, 25.0), &walls, 15.0), None);
        assert_eq!(nearest_wall(&Point2D::new(50.0, 0.0), &[], 15.0), None);
    }

    #[test]
    fn test_nearest_wall_ties_pick_first() {
        let walls = vec![wall(0.0, 0.0, 100.0, 0.0), wall(0.0, 10.0, 100.0, 10.0)];
        assert_eq!(nearest_wall(&Point2D::new(50.0, 5.0), &walls, 15.0), Some(0));
    }

    #[test]
    fn test_nearest_wall_uses_segment_extent() {
        // Point lies on the infinite extension of the first wall only
        let walls = vec![wall(0.0, 0.0, 10.0, 0.0), wall(40.0, -5.0, 40.0, 5.0)];
        assert_eq!(nearest_wall(&Point2D::new(32.0, 0.0), &walls, 15.0), Some(1));
    }

    #[test]
    fn test_signed_distance_sign() {
        let square = room(0, 0.0, 0.0, 100.0, 100.0);

        assert_relative_eq!(
            signed_distance_to_polygon(&Point2D::new(50.0, 10.0), &square.vertices),
            10.0
        );
        assert_relative_eq!(
            signed_distance_to_polygon(&Point2D::new(50.0, -4.0), &square.vertices),
            -4.0
        );
        assert_relative_eq!(
            signed_distance_to_polygon(&Point2D::new(100.0, 50.0), &square.vertices),
            0.0
        );
    }

    #[test]
    fn test_connected_rooms_across_shared_wall() {
        let rooms = vec![
            room(0, 0.0, 0.0, 100.0, 100.0),
            room(1, 110.0, 0.0, 200.0, 100.0),
            room(2, 0.0, 300.0, 100.0, 400.0),
        ];

        let center = Point2D::new(105.0, 50.0);
        assert_eq!(connected_rooms(&center, &rooms, 20.0), vec![0, 1]);

        // Deep inside a room is not on its boundary
        assert!(connected_rooms(&Point2D::new(50.0, 50.0), &rooms, 20.0).is_empty());
    }

    #[test]
    fn test_associate_returns_new_values() {
        let walls = vec![wall(0.0, 100.0, 100.0, 100.0)];
        let rooms = vec![room(0, 0.0, 0.0, 100.0, 97.0)];
        let doors = vec![door_at(50.0, 100.0), door_at(500.0, 500.0)];

        let linked = associate(&doors, &walls, &rooms, &AssociationConfig::default());

        assert_eq!(linked.len(), 2);
        assert_eq!(linked[0].nearest_wall_id, Some(0));
        assert_eq!(linked[0].connected_room_ids, Some(vec![0]));
        assert_eq!(linked[1].nearest_wall_id, None);
        assert_eq!(linked[1].connected_room_ids, Some(vec![]));

        // Inputs are untouched
        assert_eq!(doors[0].nearest_wall_id, None);
        assert_eq!(doors[0].connected_room_ids, None);
    }
}
