//! Terrain editing, persistence and picking through the public API.

use tempfile::NamedTempFile;
use terrain_bvh::prelude::*;

fn settings(resolution: usize) -> TerrainSettings {
    TerrainSettings {
        resolution,
        size: (resolution - 1) as f32,
        ..Default::default()
    }
}

fn down_at(x: f32, z: f32) -> Ray {
    Ray::new(Vec3::new(x, 1000.0, z), Vec3::NEG_Y)
}

#[test]
fn test_sculpt_save_reload() {
    let settings = settings(65);
    let mut terrain = Terrain::flat(&settings).unwrap();
    let brush = Brush::new(8.0, 4.0);

    let click = terrain.pick(&down_at(3.0, -5.0)).unwrap();
    for _ in 0..3 {
        terrain.manipulate(click, &brush, true).unwrap();
    }
    let peak = terrain.pick(&down_at(3.0, -5.0)).unwrap();
    assert!((peak.y - 12.0).abs() < 1e-3, "{peak:?}");
    terrain.bvh().validate(&terrain).unwrap();

    let temp = NamedTempFile::new().expect("Failed to create temp file");
    terrain.save_raw(temp.path()).unwrap();
    assert_eq!(std::fs::metadata(temp.path()).unwrap().len(), 65 * 65);

    // Heights quantize to height_scale steps; 12.0 is exactly 48 steps
    let reloaded = Terrain::load_raw(temp.path(), &settings).unwrap();
    assert_eq!(reloaded.height(35, 27).unwrap(), 12.0);
    assert!((reloaded.pick(&down_at(3.0, -5.0)).unwrap().y - 12.0).abs() < 1e-3);
    reloaded.bvh().validate(&reloaded).unwrap();
}

#[test]
fn test_settings_drive_terrain() {
    let temp = NamedTempFile::new().expect("Failed to create temp file");
    std::fs::write(
        temp.path(),
        r#"{ "resolution": 9, "size": 16.0, "bvh": { "min_split_primitives": 2, "max_depth": 3 } }"#,
    )
    .unwrap();

    let settings = TerrainSettings::load(temp.path()).unwrap();
    let terrain = Terrain::flat(&settings).unwrap();
    assert_eq!(terrain.step(), 2.0);

    let stats = terrain.bvh().stats();
    assert_eq!(stats.triangle_count, 128);
    assert!(stats.max_depth <= 3);
    // 128 triangles cannot fit in 2^3 leaves of size < 2
    assert!(stats.capped_leaves > 0);
    terrain.bvh().validate(&terrain).unwrap();
}

#[test]
fn test_lowering_on_a_vertex_moves_only_that_vertex() {
    let settings = settings(33);
    let bytes = vec![40u8; 33 * 33];
    let mut terrain = Terrain::from_heightmap(&settings, &bytes).unwrap();
    assert!((terrain.pick(&down_at(0.0, 0.0)).unwrap().y - 10.0).abs() < 1e-4);

    // Click exactly on vertex (16, 16): only that vertex moves
    terrain.manipulate(Vec3::new(0.0, 10.0, 0.0), &Brush::new(2.0, 10.0), false).unwrap();
    assert_eq!(terrain.height(16, 16).unwrap(), 0.0);
    assert_eq!(terrain.height(17, 16).unwrap(), 10.0);
    assert!(terrain.pick(&down_at(0.0, 0.0)).unwrap().y.abs() < 1e-4);

    // Off to the side the ray still stops at the untouched surface
    let far = terrain.pick(&down_at(10.0, 10.0)).unwrap();
    assert!((far.y - 10.0).abs() < 1e-4);
    assert_eq!(terrain.bvh().root_bounds().min.y, 0.0);
}

#[test]
fn test_shared_terrain_edit_and_pick() {
    let shared = SharedTerrain::new(Terrain::flat(&settings(17)).unwrap());
    let other = shared.clone();

    other
        .manipulate(Vec3::ZERO, &Brush::new(1.0, 3.0), true)
        .unwrap();
    assert!((shared.pick(&down_at(0.0, 0.0)).unwrap().y - 3.0).abs() < 1e-4);

    let previous = shared
        .edit(|t| {
            let old = t.height(8, 8).unwrap();
            t.set_height(8, 8, 7.0).unwrap();
            old
        })
        .unwrap();
    assert_eq!(previous, 3.0);
    assert!((other.pick(&down_at(0.0, 0.0)).unwrap().y - 7.0).abs() < 1e-5);
    assert_eq!(shared.read().bvh().root_bounds().max.y, 7.0);
}

#[test]
fn test_cursor_ray_from_tilted_camera() {
    let terrain = Terrain::flat(&settings(33)).unwrap();
    let eye = Vec3::new(0.0, 30.0, 30.0);
    let view = Mat4::look_at_rh(eye, Vec3::ZERO, Vec3::Y);
    let proj = Mat4::perspective_rh(60f32.to_radians(), 16.0 / 9.0, 0.1, 500.0);
    let inv = (proj * view).inverse();

    let centre = terrain
        .cursor_intersects(Vec2::new(960.0, 540.0), Vec2::new(1920.0, 1080.0), &inv)
        .unwrap();
    assert!(centre.distance(Vec3::ZERO) < 1e-2, "{centre:?}");

    // The top edge of the view looks past the far side of the terrain
    assert!(terrain
        .cursor_intersects(Vec2::new(960.0, 0.0), Vec2::new(1920.0, 1080.0), &inv)
        .is_none());
}
