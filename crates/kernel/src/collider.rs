//! Per-tick colliders and external forces.
//!
//! Colliders are signed-distance shapes already inflated by the particle
//! radius, so a particle center with negative distance is penetrating. The
//! response is a penalty acceleration along the surface normal scaled by the
//! wall stiffness, and the owner of the deepest penetration is recorded in the
//! particle's hit lane.

use glam::{Mat4, Vec3};

use crate::soa::{AccelBlock, SoaBlock};

/// Axis-aligned bounding box used for the coarse collider test.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    /// Lower corner.
    pub min: Vec3,
    /// Upper corner.
    pub max: Vec3,
}

impl Aabb {
    /// Box covering all of space.
    pub const EVERYWHERE: Aabb = Aabb {
        min: Vec3::splat(f32::NEG_INFINITY),
        max: Vec3::splat(f32::INFINITY),
    };

    /// Box centered at `center` reaching `half` along each axis.
    pub fn from_center(center: Vec3, half: Vec3) -> Self {
        Self {
            min: center - half,
            max: center + half,
        }
    }

    /// Smallest box containing all `points`.
    pub fn from_points(points: &[Vec3]) -> Self {
        let mut bb = Aabb {
            min: Vec3::splat(f32::INFINITY),
            max: Vec3::splat(f32::NEG_INFINITY),
        };
        for &p in points {
            bb.min = bb.min.min(p);
            bb.max = bb.max.max(p);
        }
        bb
    }

    /// Whether `p` lies inside (inclusive).
    #[inline]
    pub fn contains(&self, p: Vec3) -> bool {
        p.cmpge(self.min).all() && p.cmple(self.max).all()
    }
}

/// Oriented plane `dot(n, p) + distance = 0` with outward normal `n`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    /// Unit normal pointing out of the solid side.
    pub normal: Vec3,
    /// Offset so that `signed_distance` is zero on the surface.
    pub distance: f32,
}

impl Plane {
    /// Plane through `point` with `normal`, pushed outward by `inflate`.
    pub fn from_point(normal: Vec3, point: Vec3, inflate: f32) -> Self {
        let normal = normal.normalize_or_zero();
        Self {
            normal,
            distance: -(normal.dot(point) + inflate),
        }
    }

    /// Positive outside, negative inside.
    #[inline]
    pub fn signed_distance(&self, p: Vec3) -> f32 {
        self.normal.dot(p) + self.distance
    }
}

/// The six outward face planes and bounding box of a transformed box.
///
/// `size` is the full edge length along each local axis before `transform`.
fn box_planes(transform: Mat4, size: Vec3, inflate: f32) -> ([Plane; 6], Aabb) {
    let half = size.abs() * 0.5;
    let axes = [Vec3::X, Vec3::NEG_X, Vec3::Y, Vec3::NEG_Y, Vec3::Z, Vec3::NEG_Z];
    let planes = axes.map(|axis| {
        let normal = transform.transform_vector3(axis).normalize_or_zero();
        let face = transform.transform_point3(axis * half);
        Plane::from_point(normal, face, inflate)
    });

    let mut corners = [Vec3::ZERO; 8];
    for (i, corner) in corners.iter_mut().enumerate() {
        let sign = Vec3::new(
            if i & 1 == 0 { -1.0 } else { 1.0 },
            if i & 2 == 0 { -1.0 } else { 1.0 },
            if i & 4 == 0 { -1.0 } else { 1.0 },
        );
        *corner = transform.transform_point3(sign * half);
    }
    let mut bb = Aabb::from_points(&corners);
    bb.min -= Vec3::splat(inflate);
    bb.max += Vec3::splat(inflate);
    (planes, bb)
}

/// Deepest penetration among a box's faces, if the point is inside all of them.
#[inline]
fn box_penetration(planes: &[Plane; 6], p: Vec3) -> Option<(Vec3, f32)> {
    let mut nearest: Option<(Vec3, f32)> = None;
    for plane in planes {
        let d = plane.signed_distance(p);
        if d >= 0.0 {
            return None;
        }
        match nearest {
            Some((_, best)) if best >= d => {}
            _ => nearest = Some((plane.normal, d)),
        }
    }
    nearest.map(|(n, d)| (n, -d))
}

// ---------------------------------------------------------------------------
// Colliders
// ---------------------------------------------------------------------------

/// Sphere collider.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SphereCollider {
    /// Id written to particles this collider touches.
    pub owner: i32,
    /// Coarse bounds.
    pub bb: Aabb,
    /// Sphere center.
    pub center: Vec3,
    /// Radius including the particle radius.
    pub radius: f32,
}

impl SphereCollider {
    /// Sphere of `radius` around `center`, inflated by `particle_size`.
    pub fn new(owner: i32, center: Vec3, radius: f32, particle_size: f32) -> Self {
        let radius = radius.max(0.0) + particle_size;
        Self {
            owner,
            bb: Aabb::from_center(center, Vec3::splat(radius)),
            center,
            radius,
        }
    }

    #[inline]
    fn penetration(&self, p: Vec3) -> Option<(Vec3, f32)> {
        let diff = p - self.center;
        let d2 = diff.length_squared();
        if d2 >= self.radius * self.radius {
            return None;
        }
        let d = d2.sqrt();
        let normal = if d > 0.0 { diff / d } else { Vec3::Y };
        Some((normal, self.radius - d))
    }
}

/// Half-space collider. Everything behind the plane is solid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaneCollider {
    /// Id written to particles this collider touches.
    pub owner: i32,
    /// Coarse bounds (unbounded).
    pub bb: Aabb,
    /// Surface, inflated by the particle radius.
    pub plane: Plane,
}

impl PlaneCollider {
    /// Plane through `point` facing `normal`.
    pub fn new(owner: i32, normal: Vec3, point: Vec3, particle_size: f32) -> Self {
        Self {
            owner,
            bb: Aabb::EVERYWHERE,
            plane: Plane::from_point(normal, point, particle_size),
        }
    }
}

/// Oriented box collider.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoxCollider {
    /// Id written to particles this collider touches.
    pub owner: i32,
    /// Coarse bounds.
    pub bb: Aabb,
    /// Box center.
    pub center: Vec3,
    /// Outward face planes, inflated by the particle radius.
    pub planes: [Plane; 6],
}

impl BoxCollider {
    /// Unit box scaled by `size` and placed by `transform`.
    pub fn new(owner: i32, transform: Mat4, size: Vec3, particle_size: f32) -> Self {
        let (planes, bb) = box_planes(transform, size, particle_size);
        Self {
            owner,
            bb,
            center: transform.transform_point3(Vec3::ZERO),
            planes,
        }
    }
}

// ---------------------------------------------------------------------------
// Forces
// ---------------------------------------------------------------------------

/// Region a force acts in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ForceShape {
    /// Every particle.
    All,
    /// Particles within `radius` of `center`.
    Sphere {
        /// Sphere center.
        center: Vec3,
        /// Sphere radius.
        radius: f32,
    },
    /// Particles inside a transformed box.
    Box {
        /// Outward face planes.
        planes: [Plane; 6],
        /// Coarse bounds.
        bb: Aabb,
    },
}

impl ForceShape {
    /// Box region from a transform and full edge lengths.
    pub fn from_box(transform: Mat4, size: Vec3) -> Self {
        let (planes, bb) = box_planes(transform, size, 0.0);
        ForceShape::Box { planes, bb }
    }

    #[inline]
    fn contains(&self, p: Vec3) -> bool {
        match self {
            ForceShape::All => true,
            ForceShape::Sphere { center, radius } => {
                (p - *center).length_squared() <= radius * radius
            }
            ForceShape::Box { planes, bb } => {
                bb.contains(p) && planes.iter().all(|plane| plane.signed_distance(p) <= 0.0)
            }
        }
    }
}

/// How a force picks its direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ForceDirection {
    /// Fixed unit direction.
    Directional(Vec3),
    /// Away from a point (towards it for negative strength).
    Radial(Vec3),
}

/// External acceleration applied to particles inside a region.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Force {
    /// Region of effect.
    pub shape: ForceShape,
    /// Direction mode.
    pub direction: ForceDirection,
    /// Acceleration magnitude.
    pub strength: f32,
}

impl Force {
    /// Uniform force over all particles. `direction` is normalized.
    pub fn directional(direction: Vec3, strength: f32) -> Self {
        Self {
            shape: ForceShape::All,
            direction: ForceDirection::Directional(direction.normalize_or_zero()),
            strength,
        }
    }

    #[inline]
    fn acceleration(&self, p: Vec3) -> Option<Vec3> {
        if !self.shape.contains(p) {
            return None;
        }
        let dir = match self.direction {
            ForceDirection::Directional(dir) => dir,
            ForceDirection::Radial(center) => (p - center).normalize_or_zero(),
        };
        Some(dir * self.strength)
    }
}

// ---------------------------------------------------------------------------
// Application
// ---------------------------------------------------------------------------

/// Borrowed view of one tick's forces and colliders.
///
/// Absent inputs are empty slices.
#[derive(Debug, Clone, Copy, Default)]
pub struct TickInputs<'a> {
    /// External forces.
    pub forces: &'a [Force],
    /// Sphere colliders.
    pub spheres: &'a [SphereCollider],
    /// Plane colliders.
    pub planes: &'a [PlaneCollider],
    /// Box colliders.
    pub boxes: &'a [BoxCollider],
}

impl TickInputs<'_> {
    /// Whether there is nothing to apply.
    pub fn is_empty(&self) -> bool {
        self.forces.is_empty()
            && self.spheres.is_empty()
            && self.planes.is_empty()
            && self.boxes.is_empty()
    }
}

/// Add forces and collider responses to the first `lanes` lanes of a block.
pub fn apply_inputs(
    inputs: &TickInputs<'_>,
    block: &mut SoaBlock,
    accel: &mut AccelBlock,
    lanes: usize,
    wall_stiffness: f32,
) {
    if inputs.is_empty() {
        return;
    }
    for lane in 0..lanes {
        let p = Vec3::from(block.position(lane));
        let mut a = Vec3::ZERO;

        for force in inputs.forces {
            if let Some(fa) = force.acceleration(p) {
                a += fa;
            }
        }

        let mut deepest = 0.0_f32;
        let mut hit = block.hit[lane];
        let mut respond = |owner: i32, normal: Vec3, depth: f32| {
            a += normal * (depth * wall_stiffness);
            if depth > deepest {
                deepest = depth;
                hit = owner;
            }
        };

        for sphere in inputs.spheres {
            if !sphere.bb.contains(p) {
                continue;
            }
            if let Some((n, depth)) = sphere.penetration(p) {
                respond(sphere.owner, n, depth);
            }
        }
        for plane in inputs.planes {
            let d = plane.plane.signed_distance(p);
            if d < 0.0 {
                respond(plane.owner, plane.plane.normal, -d);
            }
        }
        for bx in inputs.boxes {
            if !bx.bb.contains(p) {
                continue;
            }
            if let Some((n, depth)) = box_penetration(&bx.planes, p) {
                respond(bx.owner, n, depth);
            }
        }

        block.hit[lane] = hit;
        accel.add(lane, a.to_array());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::particle::NO_HIT;

    fn block_at(points: &[Vec3]) -> SoaBlock {
        let mut block = SoaBlock::default();
        for (lane, p) in points.iter().enumerate() {
            block.x[lane] = p.x;
            block.y[lane] = p.y;
            block.z[lane] = p.z;
        }
        block
    }

    #[test]
    fn empty_inputs_leave_block_untouched() {
        let mut block = block_at(&[Vec3::ONE]);
        let mut accel = AccelBlock::default();
        apply_inputs(&TickInputs::default(), &mut block, &mut accel, 1, 100.0);
        assert_eq!(accel, AccelBlock::default());
        assert_eq!(block.hit[0], NO_HIT);
    }

    #[test]
    fn directional_force_is_normalized() {
        let forces = [Force::directional(Vec3::new(0.0, -3.0, 0.0), 9.8)];
        let inputs = TickInputs { forces: &forces, ..Default::default() };
        let mut block = block_at(&[Vec3::ZERO, Vec3::ONE]);
        let mut accel = AccelBlock::default();
        apply_inputs(&inputs, &mut block, &mut accel, 2, 0.0);
        assert_eq!(accel.get(0), [0.0, -9.8, 0.0]);
        assert_eq!(accel.get(1), [0.0, -9.8, 0.0]);
        assert_eq!(accel.get(2), [0.0; 3], "invalid lane must stay zero");
    }

    #[test]
    fn radial_force_in_sphere_region() {
        let forces = [Force {
            shape: ForceShape::Sphere { center: Vec3::ZERO, radius: 1.0 },
            direction: ForceDirection::Radial(Vec3::ZERO),
            strength: 2.0,
        }];
        let inputs = TickInputs { forces: &forces, ..Default::default() };
        let mut block = block_at(&[Vec3::new(0.5, 0.0, 0.0), Vec3::new(0.0, 3.0, 0.0)]);
        let mut accel = AccelBlock::default();
        apply_inputs(&inputs, &mut block, &mut accel, 2, 0.0);
        assert_eq!(accel.get(0), [2.0, 0.0, 0.0]);
        assert_eq!(accel.get(1), [0.0; 3]);
    }

    #[test]
    fn sphere_pushes_outward_and_records_owner() {
        let spheres = [SphereCollider::new(7, Vec3::ZERO, 1.0, 0.1)];
        let inputs = TickInputs { spheres: &spheres, ..Default::default() };
        let mut block = block_at(&[Vec3::new(1.0, 0.0, 0.0), Vec3::new(2.0, 0.0, 0.0)]);
        let mut accel = AccelBlock::default();
        apply_inputs(&inputs, &mut block, &mut accel, 2, 10.0);

        assert!((accel.ax[0] - 1.0).abs() < 1e-5, "depth 0.1 * stiffness 10, got {}", accel.ax[0]);
        assert_eq!(block.hit[0], 7);
        assert_eq!(accel.get(1), [0.0; 3]);
        assert_eq!(block.hit[1], NO_HIT);
    }

    #[test]
    fn plane_pushes_along_normal() {
        let planes = [PlaneCollider::new(3, Vec3::Y, Vec3::ZERO, 0.05)];
        let inputs = TickInputs { planes: &planes, ..Default::default() };
        let mut block = block_at(&[Vec3::new(4.0, -0.15, 2.0), Vec3::new(0.0, 0.2, 0.0)]);
        let mut accel = AccelBlock::default();
        apply_inputs(&inputs, &mut block, &mut accel, 2, 100.0);

        assert!((accel.ay[0] - 20.0).abs() < 1e-3, "got {}", accel.ay[0]);
        assert_eq!(block.hit[0], 3);
        assert_eq!(block.hit[1], NO_HIT);
    }

    #[test]
    fn box_pushes_out_of_nearest_face() {
        let transform = Mat4::from_translation(Vec3::new(0.0, -1.0, 0.0));
        let boxes = [BoxCollider::new(11, transform, Vec3::new(4.0, 2.0, 4.0), 0.0)];
        assert!((boxes[0].bb.max.y - 0.0).abs() < 1e-6);

        let inputs = TickInputs { boxes: &boxes, ..Default::default() };
        let mut block = block_at(&[Vec3::new(0.5, -0.1, 0.0), Vec3::new(0.0, 0.5, 0.0)]);
        let mut accel = AccelBlock::default();
        apply_inputs(&inputs, &mut block, &mut accel, 2, 10.0);

        let a = Vec3::from(accel.get(0));
        assert!((a - Vec3::new(0.0, 1.0, 0.0)).length() < 1e-4, "got {a:?}");
        assert_eq!(block.hit[0], 11);
        assert_eq!(block.hit[1], NO_HIT);
    }

    #[test]
    fn rotated_box_planes_face_outward() {
        let transform = Mat4::from_rotation_z(std::f32::consts::FRAC_PI_4);
        let (planes, _) = box_planes(transform, Vec3::ONE, 0.0);
        assert!(planes.iter().all(|p| p.signed_distance(Vec3::ZERO) < 0.0));
        assert!(planes.iter().any(|p| p.signed_distance(Vec3::new(1.0, 0.0, 0.0)) > 0.0));
    }

    #[test]
    fn deepest_collider_wins_hit() {
        let spheres = [
            SphereCollider::new(1, Vec3::new(-0.9, 0.0, 0.0), 1.0, 0.0),
            SphereCollider::new(2, Vec3::new(0.2, 0.0, 0.0), 1.0, 0.0),
        ];
        let inputs = TickInputs { spheres: &spheres, ..Default::default() };
        let mut block = block_at(&[Vec3::ZERO]);
        let mut accel = AccelBlock::default();
        apply_inputs(&inputs, &mut block, &mut accel, 1, 1.0);
        assert_eq!(block.hit[0], 2);
    }
}
