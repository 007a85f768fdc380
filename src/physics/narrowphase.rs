//! Narrowphase collision detection: GJK, EPA, and specialized tests.
//!
//! Every test returns a [`ContactInfo`] whose normal points from shape A to
//! shape B and whose `point` is the midpoint of the overlap along that normal.

use glam::{Mat4, Vec3};

use crate::ecs::components::physics::ColliderShape;
use crate::ecs::components::transform::GlobalTransform;

use super::contact::ContactInfo;

const MAX_GJK_ITERATIONS: usize = 64;
const MAX_EPA_ITERATIONS: usize = 64;
const EPA_TOLERANCE: f32 = 1e-4;
const DEGENERATE_EPS: f32 = 1e-10;

/// GJK simplex (up to 4 vertices of the Minkowski difference A - B).
///
/// The most recently added vertex is always last.
#[derive(Debug, Clone, Copy)]
pub struct Simplex {
    points: [Vec3; 4],
    len: usize,
}

impl Simplex {
    fn new() -> Self {
        Self {
            points: [Vec3::ZERO; 4],
            len: 0,
        }
    }

    fn push(&mut self, point: Vec3) {
        if self.len < 4 {
            self.points[self.len] = point;
            self.len += 1;
        }
    }

    fn set(&mut self, points: &[Vec3]) {
        self.len = points.len().min(4);
        self.points[..self.len].copy_from_slice(&points[..self.len]);
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn points(&self) -> &[Vec3] {
        &self.points[..self.len]
    }
}

/// Support point of the Minkowski difference A - B.
#[inline]
fn minkowski_support(
    shape_a: &ColliderShape,
    transform_a: &GlobalTransform,
    shape_b: &ColliderShape,
    transform_b: &GlobalTransform,
    direction: Vec3,
) -> Vec3 {
    shape_a.support(direction, transform_a) - shape_b.support(-direction, transform_b)
}

/// (a x b) x c
#[inline]
fn triple_cross(a: Vec3, b: Vec3, c: Vec3) -> Vec3 {
    a.cross(b).cross(c)
}

/// GJK intersection test. Returns the terminating simplex if the shapes intersect.
pub fn gjk_intersection(
    shape_a: &ColliderShape,
    transform_a: &GlobalTransform,
    shape_b: &ColliderShape,
    transform_b: &GlobalTransform,
) -> Option<Simplex> {
    let mut simplex = Simplex::new();
    let first = minkowski_support(shape_a, transform_a, shape_b, transform_b, Vec3::X);
    simplex.push(first);
    let mut direction = -first;

    for _ in 0..MAX_GJK_ITERATIONS {
        // Origin lies on the current simplex feature
        if direction.length_squared() < DEGENERATE_EPS {
            return Some(simplex);
        }

        let point = minkowski_support(shape_a, transform_a, shape_b, transform_b, direction);
        if point.dot(direction) < 0.0 {
            return None;
        }
        simplex.push(point);

        if update_simplex(&mut simplex, &mut direction) {
            return Some(simplex);
        }
    }

    None
}

/// Reduce the simplex to the feature closest to the origin and pick the next
/// search direction. Returns true once the origin is enclosed.
fn update_simplex(simplex: &mut Simplex, direction: &mut Vec3) -> bool {
    match simplex.len() {
        2 => update_line(simplex, direction),
        3 => update_triangle(simplex, direction),
        4 => update_tetrahedron(simplex, direction),
        _ => false,
    }
}

fn update_line(simplex: &mut Simplex, direction: &mut Vec3) -> bool {
    let [b, a] = [simplex.points[0], simplex.points[1]];
    let ab = b - a;
    let ao = -a;

    if ab.dot(ao) > 0.0 {
        *direction = triple_cross(ab, ao, ab);
    } else {
        simplex.set(&[a]);
        *direction = ao;
    }
    false
}

fn update_triangle(simplex: &mut Simplex, direction: &mut Vec3) -> bool {
    let [c, b, a] = [simplex.points[0], simplex.points[1], simplex.points[2]];
    let ab = b - a;
    let ac = c - a;
    let ao = -a;
    let abc = ab.cross(ac);

    if abc.cross(ac).dot(ao) > 0.0 {
        if ac.dot(ao) > 0.0 {
            simplex.set(&[c, a]);
            *direction = triple_cross(ac, ao, ac);
            return false;
        }
        simplex.set(&[b, a]);
        return update_line(simplex, direction);
    }

    if ab.cross(abc).dot(ao) > 0.0 {
        simplex.set(&[b, a]);
        return update_line(simplex, direction);
    }

    if abc.dot(ao) > 0.0 {
        *direction = abc;
    } else {
        simplex.set(&[b, c, a]);
        *direction = -abc;
    }
    false
}

fn update_tetrahedron(simplex: &mut Simplex, direction: &mut Vec3) -> bool {
    let [d, c, b, a] = simplex.points;
    let ab = b - a;
    let ac = c - a;
    let ad = d - a;
    let ao = -a;

    let abc = ab.cross(ac);
    let acd = ac.cross(ad);
    let adb = ad.cross(ab);

    if abc.dot(ao) > 0.0 {
        simplex.set(&[c, b, a]);
        return update_triangle(simplex, direction);
    }
    if acd.dot(ao) > 0.0 {
        simplex.set(&[d, c, a]);
        return update_triangle(simplex, direction);
    }
    if adb.dot(ao) > 0.0 {
        simplex.set(&[b, d, a]);
        return update_triangle(simplex, direction);
    }

    true
}

/// Grow a degenerate GJK simplex (touching or origin on an edge/face) into a
/// tetrahedron EPA can start from.
fn expand_to_tetrahedron(
    simplex: &Simplex,
    shape_a: &ColliderShape,
    transform_a: &GlobalTransform,
    shape_b: &ColliderShape,
    transform_b: &GlobalTransform,
) -> Option<[Vec3; 4]> {
    const AXES: [Vec3; 6] = [Vec3::X, Vec3::NEG_X, Vec3::Y, Vec3::NEG_Y, Vec3::Z, Vec3::NEG_Z];
    let support = |dir: Vec3| minkowski_support(shape_a, transform_a, shape_b, transform_b, dir);

    let mut points: Vec<Vec3> = simplex.points().to_vec();
    if points.is_empty() {
        points.push(support(Vec3::X));
    }

    if points.len() == 1 {
        let origin = points[0];
        let next = AXES
            .iter()
            .map(|&dir| support(dir))
            .find(|p| (*p - origin).length_squared() > DEGENERATE_EPS)?;
        points.push(next);
    }

    if points.len() == 2 {
        let line = points[1] - points[0];
        let next = AXES
            .iter()
            .map(|&axis| line.cross(axis))
            .filter(|perp| perp.length_squared() > DEGENERATE_EPS)
            .flat_map(|perp| [support(perp), support(-perp)])
            .find(|p| line.cross(*p - points[0]).length_squared() > DEGENERATE_EPS)?;
        points.push(next);
    }

    if points.len() == 3 {
        let normal = (points[1] - points[0]).cross(points[2] - points[0]);
        if normal.length_squared() < DEGENERATE_EPS {
            return None;
        }
        let next = [support(normal), support(-normal)]
            .into_iter()
            .find(|p| (*p - points[0]).dot(normal).abs() > 1e-6)?;
        points.push(next);
    }

    Some([points[0], points[1], points[2], points[3]])
}

/// Outward normal and origin distance of a polytope face. `None` for slivers.
#[inline]
fn face_plane(polytope: &[Vec3], face: [usize; 3]) -> Option<(Vec3, f32)> {
    let a = polytope[face[0]];
    let normal = (polytope[face[1]] - a).cross(polytope[face[2]] - a);
    let len = normal.length();
    if len < DEGENERATE_EPS {
        return None;
    }
    let normal = normal / len;
    Some((normal, normal.dot(a)))
}

/// EPA (Expanding Polytope Algorithm): penetration depth and normal of
/// intersecting shapes, starting from a GJK simplex.
pub fn epa_penetration(
    simplex: &Simplex,
    shape_a: &ColliderShape,
    transform_a: &GlobalTransform,
    shape_b: &ColliderShape,
    transform_b: &GlobalTransform,
) -> Option<ContactInfo> {
    let tetra = if simplex.len() == 4 {
        simplex.points
    } else {
        expand_to_tetrahedron(simplex, shape_a, transform_a, shape_b, transform_b)?
    };

    let mut polytope = tetra.to_vec();
    let centroid = (tetra[0] + tetra[1] + tetra[2] + tetra[3]) * 0.25;

    // Wind every face so its normal points away from the centroid
    let mut faces: Vec<[usize; 3]> = [[0, 1, 2], [0, 3, 1], [0, 2, 3], [1, 3, 2]]
        .into_iter()
        .map(|face| {
            let a = polytope[face[0]];
            let n = (polytope[face[1]] - a).cross(polytope[face[2]] - a);
            if n.dot(a - centroid) < 0.0 {
                [face[0], face[2], face[1]]
            } else {
                face
            }
        })
        .collect();

    // Closest face seen so far: vertices, outward normal, origin distance
    let mut closest_face: Option<([Vec3; 3], Vec3, f32)> = None;

    for _ in 0..MAX_EPA_ITERATIONS {
        let Some((closest, normal, dist)) = faces
            .iter()
            .enumerate()
            .filter_map(|(i, face)| face_plane(&polytope, *face).map(|(n, d)| (i, n, d.abs())))
            .min_by(|a, b| a.2.total_cmp(&b.2))
        else {
            break;
        };
        let face = faces[closest];
        closest_face = Some((face.map(|i| polytope[i]), normal, dist));

        let new_point = minkowski_support(shape_a, transform_a, shape_b, transform_b, normal);
        if new_point.dot(normal) - dist < EPA_TOLERANCE {
            break;
        }

        let new_index = polytope.len();
        polytope.push(new_point);

        // Carve out every face that sees the new point, keeping the horizon
        let mut horizon: Vec<[usize; 2]> = Vec::new();
        faces.retain(|face| match face_plane(&polytope, *face) {
            Some((n, _)) if n.dot(new_point - polytope[face[0]]) > 0.0 => {
                toggle_edge(&mut horizon, face[0], face[1]);
                toggle_edge(&mut horizon, face[1], face[2]);
                toggle_edge(&mut horizon, face[2], face[0]);
                false
            }
            Some(_) => true,
            None => false,
        });

        faces.extend(horizon.iter().map(|edge| [edge[0], edge[1], new_index]));
        if faces.is_empty() {
            break;
        }
    }

    // Out of iterations on curved shapes: the closest face is still a good estimate
    let ([a, b, c], normal, dist) = closest_face?;
    let penetration = closest_point_on_triangle(a, b, c).dot(normal).max(dist);
    let deepest_a = shape_a.support(normal, transform_a);
    Some(ContactInfo {
        normal,
        penetration,
        point: deepest_a - normal * (penetration * 0.5),
    })
}

/// Add an edge to the horizon, or remove it if its twin is already there.
fn toggle_edge(edges: &mut Vec<[usize; 2]>, a: usize, b: usize) {
    if let Some(pos) = edges.iter().position(|e| e[0] == b && e[1] == a) {
        edges.swap_remove(pos);
    } else {
        edges.push([a, b]);
    }
}

/// Closest point on triangle abc to the origin (Ericson, Real-Time Collision Detection 5.1.5).
fn closest_point_on_triangle(a: Vec3, b: Vec3, c: Vec3) -> Vec3 {
    let ab = b - a;
    let ac = c - a;

    let d1 = ab.dot(-a);
    let d2 = ac.dot(-a);
    if d1 <= 0.0 && d2 <= 0.0 {
        return a;
    }

    let d3 = ab.dot(-b);
    let d4 = ac.dot(-b);
    if d3 >= 0.0 && d4 <= d3 {
        return b;
    }

    let vc = d1 * d4 - d3 * d2;
    if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
        return a + ab * (d1 / (d1 - d3));
    }

    let d5 = ab.dot(-c);
    let d6 = ac.dot(-c);
    if d6 >= 0.0 && d5 <= d6 {
        return c;
    }

    let vb = d5 * d2 - d1 * d6;
    if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
        return a + ac * (d2 / (d2 - d6));
    }

    let va = d3 * d6 - d5 * d4;
    if va <= 0.0 && (d4 - d3) >= 0.0 && (d5 - d6) >= 0.0 {
        return b + (c - b) * ((d4 - d3) / ((d4 - d3) + (d5 - d6)));
    }

    let denom = 1.0 / (va + vb + vc);
    a + ab * (vb * denom) + ac * (vc * denom)
}

/// Largest axis scale of a transform (spheres stay spheres under non-uniform scale).
#[inline]
fn max_axis_scale(mat: &Mat4) -> f32 {
    mat.x_axis
        .truncate()
        .length_squared()
        .max(mat.y_axis.truncate().length_squared())
        .max(mat.z_axis.truncate().length_squared())
        .sqrt()
}

/// Specialized sphere-sphere intersection test.
#[inline]
pub fn sphere_sphere(
    radius_a: f32,
    transform_a: &GlobalTransform,
    radius_b: f32,
    transform_b: &GlobalTransform,
) -> Option<ContactInfo> {
    let center_a = transform_a.translation();
    let center_b = transform_b.translation();
    let world_radius_a = radius_a * max_axis_scale(&transform_a.0);
    let world_radius_b = radius_b * max_axis_scale(&transform_b.0);

    let diff = center_b - center_a;
    let dist_sq = diff.length_squared();
    let min_dist = world_radius_a + world_radius_b;
    if dist_sq >= min_dist * min_dist {
        return None;
    }

    let dist = dist_sq.sqrt();
    let normal = if dist > 1e-6 { diff / dist } else { Vec3::Y };
    let penetration = min_dist - dist;

    Some(ContactInfo {
        normal,
        penetration,
        point: center_a + normal * (world_radius_a - penetration * 0.5),
    })
}

/// Box in world space: center, unit axes, scaled half-extents.
#[derive(Debug, Clone, Copy)]
struct OrientedBox {
    center: Vec3,
    axes: [Vec3; 3],
    half: [f32; 3],
}

impl OrientedBox {
    fn new(half_extents: Vec3, mat: Mat4) -> Self {
        let cols = [
            mat.x_axis.truncate(),
            mat.y_axis.truncate(),
            mat.z_axis.truncate(),
        ];
        Self {
            center: mat.transform_point3(Vec3::ZERO),
            axes: cols.map(|c| c.normalize_or_zero()),
            half: [
                half_extents.x * cols[0].length(),
                half_extents.y * cols[1].length(),
                half_extents.z * cols[2].length(),
            ],
        }
    }

    /// Half-width of the box projected onto `axis`.
    #[inline]
    fn radius_along(&self, axis: Vec3) -> f32 {
        (0..3).map(|i| self.half[i] * self.axes[i].dot(axis).abs()).sum()
    }
}

/// SAT (Separating Axis Theorem) test for box-box collision.
pub fn sat_box_box(
    half_a: Vec3,
    transform_a: Mat4,
    half_b: Vec3,
    transform_b: Mat4,
) -> Option<ContactInfo> {
    let box_a = OrientedBox::new(half_a, transform_a);
    let box_b = OrientedBox::new(half_b, transform_b);
    let t = box_b.center - box_a.center;

    // 3 face normals of A, 3 of B, 9 edge-edge cross products
    let face_axes = box_a.axes.into_iter().chain(box_b.axes);
    let edge_axes = box_a
        .axes
        .into_iter()
        .flat_map(|ea| box_b.axes.map(|eb| ea.cross(eb)))
        .filter(|axis| axis.length_squared() > 1e-12)
        .map(Vec3::normalize);

    let mut min_overlap = f32::MAX;
    let mut best_axis = Vec3::ZERO;
    for axis in face_axes.chain(edge_axes) {
        let overlap = box_a.radius_along(axis) + box_b.radius_along(axis) - t.dot(axis).abs();
        if overlap <= 0.0 {
            return None;
        }
        if overlap < min_overlap {
            min_overlap = overlap;
            best_axis = axis;
        }
    }

    if best_axis.dot(t) < 0.0 {
        best_axis = -best_axis;
    }

    let reach_a = box_a.radius_along(best_axis);
    let reach_b = box_b.radius_along(best_axis);

    // Contact plane halfway between the two innermost faces; lateral position
    // from the smaller box's center
    let face_a = box_a.center.dot(best_axis) + reach_a;
    let face_b = box_b.center.dot(best_axis) - reach_b;
    let plane_d = (face_a + face_b) * 0.5;
    let reference = if reach_a > reach_b {
        box_b.center
    } else {
        box_a.center
    };

    Some(ContactInfo {
        normal: best_axis,
        penetration: min_overlap,
        point: reference + best_axis * (plane_d - reference.dot(best_axis)),
    })
}

/// Specialized box-sphere intersection test (box is shape A).
pub fn box_sphere(
    half_extents: Vec3,
    box_transform: &GlobalTransform,
    radius: f32,
    sphere_transform: &GlobalTransform,
) -> Option<ContactInfo> {
    let sphere_center = sphere_transform.translation();
    let world_radius = radius * max_axis_scale(&sphere_transform.0);
    let obb = OrientedBox::new(half_extents, box_transform.0);

    // Sphere center in the box frame, then clamped onto the box
    let diff = sphere_center - obb.center;
    let local: [f32; 3] = obb.axes.map(|axis| diff.dot(axis));
    let clamped: [f32; 3] = [0usize, 1, 2].map(|i| local[i].clamp(-obb.half[i], obb.half[i]));
    let closest = obb.center + (0..3).map(|i| obb.axes[i] * clamped[i]).sum::<Vec3>();

    let to_sphere = sphere_center - closest;
    let dist_sq = to_sphere.length_squared();
    if dist_sq >= world_radius * world_radius {
        return None;
    }

    let dist = dist_sq.sqrt();
    if dist < 1e-6 {
        // Center inside the box: leave through the nearest face
        let (normal, face_depth) = (0..3)
            .flat_map(|i| {
                [
                    (obb.axes[i], obb.half[i] - local[i]),
                    (-obb.axes[i], obb.half[i] + local[i]),
                ]
            })
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .unwrap_or((Vec3::Y, 0.0));
        let penetration = face_depth + world_radius;
        let on_sphere = sphere_center - normal * world_radius;
        return Some(ContactInfo {
            normal,
            penetration,
            point: on_sphere + normal * (penetration * 0.5),
        });
    }

    let normal = to_sphere / dist;
    let penetration = world_radius - dist;
    Some(ContactInfo {
        normal,
        penetration,
        point: closest - normal * (penetration * 0.5),
    })
}

/// General convex test: GJK followed by EPA.
pub fn convex_convex(
    shape_a: &ColliderShape,
    transform_a: &GlobalTransform,
    shape_b: &ColliderShape,
    transform_b: &GlobalTransform,
) -> Option<ContactInfo> {
    let simplex = gjk_intersection(shape_a, transform_a, shape_b, transform_b)?;
    epa_penetration(&simplex, shape_a, transform_a, shape_b, transform_b)
}
