//! BVH build, refit and query properties checked against brute force.

use terrain_bvh::bvh::{Bvh, BvhConfig, Triangle};
use terrain_bvh::picking::{ray_triangle, Ray};
use terrain_bvh::util::{Aabb, Vec3};

/// Row-major grid with vertex `(x, z)` at `(x - offset, height(x, z), z - offset)`.
fn grid(res: usize, offset: f32, height: impl Fn(usize, usize) -> f32) -> Vec<Vec3> {
    let mut positions = Vec::with_capacity(res * res);
    for z in 0..res {
        for x in 0..res {
            positions.push(Vec3::new(x as f32 - offset, height(x, z), z as f32 - offset));
        }
    }
    positions
}

fn bumpy(x: usize, z: usize) -> f32 {
    (x as f32 * 0.7).sin() * 2.0 + (z as f32 * 0.45).cos() * 1.5
}

/// Deterministic triangle soup.
fn soup(count: usize, seed: u64) -> (Vec<Vec3>, Vec<Triangle>) {
    let mut state = seed;
    let mut next = move || {
        state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        ((state >> 40) as f32 / (1u64 << 24) as f32) * 100.0
    };

    let mut vertices = Vec::with_capacity(count * 3);
    let mut triangles = Vec::with_capacity(count);
    for i in 0..count as u32 {
        let base = Vec3::new(next(), next() * 0.1, next());
        vertices.push(base);
        vertices.push(base + Vec3::new(1.0, 0.0, 0.0));
        vertices.push(base + Vec3::new(0.0, 0.5, 1.0));
        triangles.push(Triangle::new(3 * i, 3 * i + 1, 3 * i + 2));
    }
    (vertices, triangles)
}

/// Walk every node and compare its box against a direct scan of the
/// vertices of all primitives beneath it.
fn check_containment(bvh: &Bvh, vertices: &[Vec3]) {
    fn subtree_range(bvh: &Bvh, idx: usize) -> (usize, usize) {
        let node = &bvh.nodes()[idx];
        match node.primitives() {
            Some(range) => range,
            None => {
                let (left, right) = node.children().unwrap();
                let (first, lc) = subtree_range(bvh, left);
                let (_, rc) = subtree_range(bvh, right);
                (first, lc + rc)
            }
        }
    }

    for (idx, node) in bvh.nodes().iter().enumerate() {
        let (first, count) = subtree_range(bvh, idx);
        let bounds = node.aabb();
        for &tri in &bvh.indices()[first..first + count] {
            for p in bvh.triangles()[tri as usize].positions(vertices) {
                assert!(bounds.contains_point(p), "node {idx} misses vertex {p:?}");
            }
        }
    }
}

fn brute_force(vertices: &[Vec3], triangles: &[Triangle], ray: &Ray) -> Option<f32> {
    triangles
        .iter()
        .filter_map(|tri| {
            let [a, b, c] = tri.positions(vertices);
            ray_triangle(ray, a, b, c)
        })
        .min_by(|a, b| a.total_cmp(b))
}

#[test]
fn test_flat_grid_scenario() {
    // 4x4 vertices, vertex (1, 1) at the origin
    let mut vertices = grid(4, 1.0, |_, _| 0.0);
    let mut bvh = Bvh::from_grid(&vertices, 4, 4, &BvhConfig::default()).unwrap();
    assert_eq!(bvh.triangles().len(), 18);

    let ray = Ray::new(Vec3::new(0.0, 10.0, 0.0), Vec3::new(0.0, -1.0, 0.0));
    let hit = bvh.intersect(&vertices, &ray).expect("flat grid below the ray");
    assert!(hit.point.y.abs() < 1e-5);
    assert!((hit.t - 10.0).abs() < 1e-5);

    vertices[5].y = 5.0;
    bvh.refit(&vertices).unwrap();

    let hit = bvh.intersects(&vertices, ray.origin, ray.direction).unwrap();
    assert!((hit.y - 5.0).abs() < 1e-4, "hit {hit:?}");
    assert_eq!(bvh.root_bounds().max.y, 5.0);
    bvh.validate(&vertices).unwrap();
}

#[test]
fn test_containment_after_build_and_refit() {
    let mut vertices = grid(24, 12.0, bumpy);
    let mut bvh = Bvh::from_grid(&vertices, 24, 24, &BvhConfig::default()).unwrap();
    check_containment(&bvh, &vertices);

    for (i, v) in vertices.iter_mut().enumerate() {
        if i % 7 == 0 {
            v.y += 3.0;
        } else if i % 11 == 0 {
            v.y -= 4.0;
        }
    }
    bvh.refit(&vertices).unwrap();
    check_containment(&bvh, &vertices);
    bvh.validate(&vertices).unwrap();
}

#[test]
fn test_partition_completeness() {
    let vertices = grid(17, 8.0, bumpy);
    let bvh = Bvh::from_grid(&vertices, 17, 17, &BvhConfig::default()).unwrap();
    let n = bvh.triangles().len();

    let mut sorted = bvh.indices().to_vec();
    sorted.sort_unstable();
    assert_eq!(sorted, (0..n as u32).collect::<Vec<_>>());

    let mut covered = 0;
    for node in bvh.nodes() {
        if let Some((first, count)) = node.primitives() {
            assert!(count > 0);
            assert_eq!(first, covered, "leaves out of order");
            covered += count;
        }
    }
    assert_eq!(covered, n);
}

#[test]
fn test_pool_bound_across_sizes() {
    for res in 2..=20 {
        let vertices = grid(res, 0.0, bumpy);
        let bvh = Bvh::from_grid(&vertices, res, res, &BvhConfig::default()).unwrap();
        let n = bvh.triangles().len();
        assert_eq!(bvh.pool_capacity(), 2 * n - 1);
        assert!(bvh.pool_ptr() <= 2 * n - 1, "res {res}: {} > {}", bvh.pool_ptr(), 2 * n - 1);
    }

    for (count, seed) in [(1, 1), (2, 2), (3, 3), (50, 4), (333, 5)] {
        let (vertices, triangles) = soup(count, seed);
        let config = BvhConfig {
            min_split_primitives: 2,
            max_depth: 32,
        };
        let bvh = Bvh::build(&vertices, triangles, &config).unwrap();
        assert!(bvh.pool_ptr() <= 2 * count - 1);
        bvh.validate(&vertices).unwrap();
    }
}

#[test]
fn test_refit_is_idempotent() {
    let mut vertices = grid(20, 10.0, bumpy);
    let mut bvh = Bvh::from_grid(&vertices, 20, 20, &BvhConfig::default()).unwrap();

    vertices[42].y = 30.0;
    bvh.refit(&vertices).unwrap();
    let first = bvh.nodes().to_vec();
    bvh.refit(&vertices).unwrap();

    assert_eq!(
        bytemuck::cast_slice::<_, u8>(&first[..]),
        bytemuck::cast_slice::<_, u8>(bvh.nodes())
    );
}

#[test]
fn test_refit_matches_rebuild() {
    let mut vertices = grid(16, 8.0, bumpy);
    let config = BvhConfig::default();
    let mut bvh = Bvh::from_grid(&vertices, 16, 16, &config).unwrap();

    // Raise one vertex well above everything, then pull it far below
    for height in [25.0, -25.0] {
        vertices[16 * 5 + 9].y = height;
        bvh.refit(&vertices).unwrap();

        let rebuilt = Bvh::from_grid(&vertices, 16, 16, &config).unwrap();
        assert_eq!(bvh.root_bounds(), rebuilt.root_bounds());
        bvh.validate(&vertices).unwrap();
    }

    assert_eq!(bvh.root_bounds().min.y, -25.0);
}

#[test]
fn test_centroid_normal_ray_hits_near_zero() {
    let vertices = grid(12, 6.0, bumpy);
    let bvh = Bvh::from_grid(&vertices, 12, 12, &BvhConfig::default()).unwrap();

    for (i, tri) in bvh.triangles().iter().enumerate() {
        let [a, b, c] = tri.positions(&vertices);
        let normal = (b - a).cross(c - a).normalize();
        let centroid = tri.centroid(&vertices);

        // Start just behind the plane so the hit distance is non-negative
        let ray = Ray::new(centroid - normal * 1e-3, normal);
        let hit = bvh.intersect(&vertices, &ray).expect("ray through its own triangle");
        assert!(hit.t < 2e-3, "triangle {i}: t = {}", hit.t);
        assert!(hit.point.distance(centroid) < 1e-2, "triangle {i}");
    }
}

#[test]
fn test_ray_outside_root_misses() {
    let vertices = grid(10, 5.0, bumpy);
    let bvh = Bvh::from_grid(&vertices, 10, 10, &BvhConfig::default()).unwrap();
    let root: Aabb = bvh.root_bounds();

    let above = Vec3::new(0.0, root.max.y + 5.0, 0.0);
    assert!(bvh.intersect(&vertices, &Ray::new(above, Vec3::Y)).is_none());
    assert!(bvh.intersect(&vertices, &Ray::new(above, Vec3::X)).is_none());

    let beside = Vec3::new(root.max.x + 1.0, 0.0, 0.0);
    assert!(bvh.intersect(&vertices, &Ray::new(beside, Vec3::NEG_Y)).is_none());
}

#[test]
fn test_matches_brute_force_on_oblique_rays() {
    let vertices = grid(16, 8.0, bumpy);
    let bvh = Bvh::from_grid(&vertices, 16, 16, &BvhConfig::default()).unwrap();

    for i in 0..64 {
        let angle = i as f32 * 0.1;
        let origin = Vec3::new(angle.cos() * 20.0, 12.0, angle.sin() * 20.0);
        let target = Vec3::new((i % 8) as f32 - 4.0, 0.0, (i / 8) as f32 - 4.0);
        let ray = Ray::new(origin, target - origin);

        let expected = brute_force(&vertices, bvh.triangles(), &ray);
        let got = bvh.intersect(&vertices, &ray).map(|hit| hit.t);
        match (expected, got) {
            (Some(e), Some(g)) => assert!((e - g).abs() < 1e-4, "ray {i}: {e} vs {g}"),
            (None, None) => {}
            other => panic!("ray {i}: brute force and BVH disagree: {other:?}"),
        }
    }
}
