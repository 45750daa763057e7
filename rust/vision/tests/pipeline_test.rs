// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! End-to-end reconstruction of synthetic floor plans

use approx::assert_relative_eq;
use floorplan_lite_vision::line_ops::angle_difference_deg;
use floorplan_lite_vision::{
    reconstruct, reconstruct_from_bytes, reconstruct_with_detector, Error, OpeningDetection,
    ReconstructionConfig, StaticDetections, WallSegment,
};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use std::io::Cursor;

const INK: Rgb<u8> = Rgb([0, 0, 0]);
const STROKE: u32 = 6;

fn fill(img: &mut RgbImage, x0: u32, y0: u32, x1: u32, y1: u32) {
    for y in y0..y1 {
        for x in x0..x1 {
            img.put_pixel(x, y, INK);
        }
    }
}

/// Outline of a rectangle with outer corners `(x0, y0)` and `(x1, y1)` exclusive
fn outline(img: &mut RgbImage, x0: u32, y0: u32, x1: u32, y1: u32) {
    fill(img, x0, y0, x1, y0 + STROKE);
    fill(img, x0, y1 - STROKE, x1, y1);
    fill(img, x0, y0, x0 + STROKE, y1);
    fill(img, x1 - STROKE, y0, x1, y1);
}

fn white(width: u32, height: u32) -> RgbImage {
    RgbImage::from_pixel(width, height, Rgb([255, 255, 255]))
}

/// One 194×194 px room with its south wall on rows 250..256
fn single_room_plan() -> RgbImage {
    let mut img = white(300, 300);
    outline(&mut img, 50, 50, 256, 256);
    img
}

fn south_door() -> OpeningDetection {
    OpeningDetection {
        class_label: "Door".into(),
        confidence: 0.91,
        bbox: [130.0, 245.0, 170.0, 261.0],
    }
}

fn is_horizontal(wall: &WallSegment) -> bool {
    angle_difference_deg(wall.angle, 0.0) < 5.0
}

fn is_vertical(wall: &WallSegment) -> bool {
    angle_difference_deg(wall.angle, 90.0) < 5.0
}

fn mid_y(wall: &WallSegment) -> f64 {
    (wall.start.y + wall.end.y) / 2.0
}

fn mid_x(wall: &WallSegment) -> f64 {
    (wall.start.x + wall.end.x) / 2.0
}

#[test]
fn test_single_room_with_south_door() {
    let scale = 0.01;
    let out = reconstruct(
        &single_room_plan(),
        scale,
        &[south_door()],
        &ReconstructionConfig::default(),
    )
    .unwrap();

    // One room, four corners
    assert_eq!(out.plan.rooms.len(), 1);
    let room = &out.plan.rooms[0];
    assert_eq!(room.id, 0);
    assert_eq!(room.corner_count(), 4);
    assert_relative_eq!(room.area, 193.0 * 193.0, max_relative = 0.05);

    // Every side of the outline produced a wall
    let walls = &out.plan.walls;
    assert!(walls.len() >= 4);
    assert!(walls.iter().any(|w| is_horizontal(w) && mid_y(w) < 60.0));
    assert!(walls.iter().any(|w| is_horizontal(w) && mid_y(w) > 245.0));
    assert!(walls.iter().any(|w| is_vertical(w) && mid_x(w) < 60.0));
    assert!(walls.iter().any(|w| is_vertical(w) && mid_x(w) > 245.0));
    for wall in walls {
        assert_eq!(wall.length, wall.start.distance_to(&wall.end));
        assert_eq!(wall.thickness, out.plan.wall_thickness as f64);
    }

    // The door hangs on the south wall and opens onto the room
    assert_eq!(out.plan.doors.len(), 1);
    let door = &out.plan.doors[0];
    let wall_id = door.nearest_wall_id.expect("door should have a wall");
    let south = &walls[wall_id];
    assert!(is_horizontal(south));
    assert!(mid_y(south) > 245.0);
    assert_eq!(door.connected_room_ids, Some(vec![0]));

    // Metric export
    let result = &out.result;
    assert_eq!(result.metadata.total_rooms, 1);
    assert_eq!(result.metadata.total_doors, 1);
    assert_eq!(result.metadata.total_windows, 0);
    assert_eq!(result.metadata.total_walls, walls.len());
    assert_eq!(result.metadata.scale_m_per_px, scale);
    assert_eq!(result.rooms[0].num_corners, 4);
    assert_eq!(result.rooms[0].area_m2, room.area * scale * scale);
    assert_eq!(result.doors[0].position, [1.5, 2.53]);
    assert_eq!(result.doors[0].nearest_wall_id, Some(wall_id));
    assert_eq!(result.doors[0].connects_rooms, Some(vec![0]));
    assert_eq!(result.doors[0].opening_type, "door");
}

#[test]
fn test_door_in_shared_wall_connects_both_rooms() {
    let mut img = white(400, 350);
    outline(&mut img, 50, 50, 350, 300);
    fill(&mut img, 197, 50, 203, 300);

    let door = OpeningDetection {
        class_label: "door".into(),
        confidence: 0.8,
        bbox: [190.0, 155.0, 210.0, 195.0],
    };
    let out = reconstruct(&img, 0.02, &[door], &ReconstructionConfig::default()).unwrap();

    assert_eq!(out.plan.rooms.len(), 2);
    // Discovery order: left room first
    assert!(out.plan.rooms[0].vertices[0].x < 200.0);
    assert!(out.plan.rooms[1].vertices.iter().all(|v| v.x > 200.0));

    let door = &out.plan.doors[0];
    assert_eq!(door.connected_room_ids, Some(vec![0, 1]));
    let wall = &out.plan.walls[door.nearest_wall_id.expect("door should have a wall")];
    assert!(is_vertical(wall));
    assert!((mid_x(wall) - 200.0).abs() < 10.0);
}

#[test]
fn test_blank_image_yields_nothing() {
    let out = reconstruct(&white(200, 150), 0.05, &[], &ReconstructionConfig::default()).unwrap();

    assert!(out.plan.walls.is_empty());
    assert!(out.plan.rooms.is_empty());
    assert_eq!(out.result.metadata.total_walls, 0);
    assert_eq!(out.result.metadata.total_rooms, 0);
    assert_eq!(out.masks.interior.foreground_count(), 0);
}

#[test]
fn test_invalid_scale_is_rejected() {
    let img = single_room_plan();
    for scale in [0.0, -0.01, f64::NAN] {
        let err = reconstruct(&img, scale, &[], &ReconstructionConfig::default()).unwrap_err();
        assert!(matches!(err, Error::InvalidScale(_)));
        assert!(err.is_invalid_input());
    }
}

#[test]
fn test_detector_and_bytes_entry_points_agree() {
    let img = single_room_plan();
    let config = ReconstructionConfig::default();
    let detector = StaticDetections::new(vec![south_door()]);

    let direct = reconstruct(&img, 0.01, &[south_door()], &config).unwrap();
    let via_detector = reconstruct_with_detector(&img, 0.01, &detector, &config).unwrap();

    let mut png = Vec::new();
    DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
        .unwrap();
    let via_bytes = reconstruct_from_bytes(&png, 0.01, &detector, &config).unwrap();

    assert_eq!(direct.result, via_detector.result);
    assert_eq!(direct.result, via_bytes.result);
}

#[test]
fn test_result_json_shape() {
    let out = reconstruct(
        &single_room_plan(),
        0.01,
        &[south_door()],
        &ReconstructionConfig::default(),
    )
    .unwrap();

    let text = out.result.to_json(false).unwrap();
    let json: serde_json::Value = serde_json::from_str(&text).unwrap();

    for key in ["metadata", "rooms", "walls", "doors", "windows"] {
        assert!(json.get(key).is_some(), "missing {}", key);
    }
    assert_eq!(json["metadata"]["image_width_px"], 300);
    assert_eq!(json["doors"][0]["type"], "door");
    assert_eq!(json["doors"][0]["orientation"], "horizontal");
    assert_eq!(json["rooms"][0]["polygon"].as_array().unwrap().len(), 4);
    assert!(json["walls"][0]["angle_deg"].is_number());
}
