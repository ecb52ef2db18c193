//! Hit resolution - spread, tracing, surface classification, damage
//!
//! One shot: perturb the aim direction inside the spread cone, trace the
//! segment through the collaborating trace service, classify what was struck
//! and produce the quantized hit record that observers replay.

use glam::Vec3;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::weapon::WeaponSpec;
use super::PlayerId;

/// Classified surface of a trace hit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SurfaceKind {
    /// World geometry
    Default,
    /// Character body
    Flesh,
    /// Character weak point, takes multiplied damage
    FleshVulnerable,
}

/// Network-quantized position (whole world units)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuantizedVec {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl QuantizedVec {
    pub fn from_vec3(v: Vec3) -> Self {
        Self {
            x: v.x.round() as i32,
            y: v.y.round() as i32,
            z: v.z.round() as i32,
        }
    }

    pub fn to_vec3(self) -> Vec3 {
        Vec3::new(self.x as f32, self.y as f32, self.z as f32)
    }
}

/// Most recent shot's visual replay data. Overwritten each shot, never queued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HitRecord {
    pub impact: QuantizedVec,
    pub surface: SurfaceKind,
}

/// Result of a segment trace
#[derive(Debug, Clone, Copy)]
pub struct TraceHit {
    pub point: Vec3,
    pub normal: Vec3,
    /// Character that was struck, if any
    pub target: Option<PlayerId>,
    pub surface: SurfaceKind,
}

/// Trace service collaborator: nearest blocking hit along a segment
pub trait TraceService {
    fn trace(&self, start: Vec3, end: Vec3, ignore: Option<PlayerId>) -> Option<TraceHit>;
}

/// Hit-resolution configuration, passed in explicitly (no global debug state)
#[derive(Debug, Clone, Copy)]
pub struct HitscanConfig {
    /// Damage multiplier for vulnerable-surface hits
    pub vulnerable_damage_multiplier: f32,
    /// Log raw trace segments for diagnostics
    pub debug_traces: bool,
}

impl Default for HitscanConfig {
    fn default() -> Self {
        Self {
            vulnerable_damage_multiplier: 4.0,
            debug_traces: false,
        }
    }
}

/// A struck target with computed damage
#[derive(Debug, Clone, Copy)]
pub struct ResolvedHit {
    pub target: Option<PlayerId>,
    pub damage: f32,
    pub point: Vec3,
    pub surface: SurfaceKind,
    pub direction: Vec3,
}

/// Outcome of one shot
#[derive(Debug, Clone, Copy)]
pub struct ShotResolution {
    /// Tracer endpoint: the impact point, or the max-range end on a miss
    pub trace_end: Vec3,
    pub hit: Option<ResolvedHit>,
}

/// Per-shot resolver
pub struct HitResolver {
    config: HitscanConfig,
}

impl HitResolver {
    pub fn new(config: HitscanConfig) -> Self {
        Self { config }
    }

    /// Sample a uniform direction within a cone of `half_angle_rad` around `axis`
    pub fn spread_direction(rng: &mut ChaCha8Rng, axis: Vec3, half_angle_rad: f32) -> Vec3 {
        let axis = axis.normalize_or_zero();
        if axis == Vec3::ZERO || half_angle_rad <= 0.0 {
            return axis;
        }

        // Uniform over the spherical cap
        let cos_half = half_angle_rad.cos();
        let cos_theta = 1.0 - rng.gen::<f32>() * (1.0 - cos_half);
        let sin_theta = (1.0 - cos_theta * cos_theta).max(0.0).sqrt();
        let phi = rng.gen::<f32>() * std::f32::consts::TAU;

        // Orthonormal basis around the axis
        let up = if axis.x.abs() < 0.9 { Vec3::X } else { Vec3::Y };
        let t1 = axis.cross(up).normalize();
        let t2 = axis.cross(t1);

        (axis * cos_theta + (t1 * phi.cos() + t2 * phi.sin()) * sin_theta).normalize()
    }

    /// Resolve one shot from `eye` along `aim`
    pub fn resolve(
        &self,
        rng: &mut ChaCha8Rng,
        eye: Vec3,
        aim: Vec3,
        spec: &WeaponSpec,
        shooter: PlayerId,
        trace: &dyn TraceService,
    ) -> ShotResolution {
        let direction =
            Self::spread_direction(rng, aim, spec.spread_degrees.to_radians());
        let end = eye + direction * spec.max_range;

        if self.config.debug_traces {
            debug!(?eye, ?end, %shooter, "weapon trace");
        }

        match trace.trace(eye, end, Some(shooter)) {
            Some(hit) => {
                let mut damage = spec.base_damage;
                if hit.surface == SurfaceKind::FleshVulnerable {
                    damage *= self.config.vulnerable_damage_multiplier;
                }
                ShotResolution {
                    trace_end: hit.point,
                    hit: Some(ResolvedHit {
                        target: hit.target,
                        damage,
                        point: hit.point,
                        surface: hit.surface,
                        direction,
                    }),
                }
            }
            None => ShotResolution {
                trace_end: end,
                hit: None,
            },
        }
    }
}

/// Sphere target for the in-world trace implementation
#[derive(Debug, Clone, Copy)]
pub struct CharacterTarget {
    pub id: PlayerId,
    pub position: Vec3,
    pub body_radius: f32,
    pub head_center: Vec3,
    pub head_radius: f32,
}

/// Trace implementation over character spheres plus a ground plane at z = 0
pub struct SceneTrace<'a> {
    targets: &'a [CharacterTarget],
}

impl<'a> SceneTrace<'a> {
    pub fn new(targets: &'a [CharacterTarget]) -> Self {
        Self { targets }
    }

    /// Nearest ray/sphere intersection distance, if within `len`
    fn ray_sphere(start: Vec3, dir: Vec3, len: f32, center: Vec3, radius: f32) -> Option<f32> {
        let oc = start - center;
        let b = oc.dot(dir);
        let c = oc.length_squared() - radius * radius;
        let disc = b * b - c;
        if disc < 0.0 {
            return None;
        }
        let t = -b - disc.sqrt();
        if t >= 0.0 && t <= len {
            Some(t)
        } else {
            None
        }
    }
}

impl TraceService for SceneTrace<'_> {
    fn trace(&self, start: Vec3, end: Vec3, ignore: Option<PlayerId>) -> Option<TraceHit> {
        let segment = end - start;
        let len = segment.length();
        if len <= f32::EPSILON {
            return None;
        }
        let dir = segment / len;

        let mut nearest: Option<(f32, TraceHit)> = None;
        let mut consider = |t: f32, hit: TraceHit| {
            if nearest.map_or(true, |(best, _)| t < best) {
                nearest = Some((t, hit));
            }
        };

        for target in self.targets {
            if Some(target.id) == ignore {
                continue;
            }
            // Head first: it sits inside the body sweep on near-vertical shots
            if let Some(t) =
                Self::ray_sphere(start, dir, len, target.head_center, target.head_radius)
            {
                let point = start + dir * t;
                consider(
                    t,
                    TraceHit {
                        point,
                        normal: (point - target.head_center).normalize_or_zero(),
                        target: Some(target.id),
                        surface: SurfaceKind::FleshVulnerable,
                    },
                );
            } else if let Some(t) =
                Self::ray_sphere(start, dir, len, target.position, target.body_radius)
            {
                let point = start + dir * t;
                consider(
                    t,
                    TraceHit {
                        point,
                        normal: (point - target.position).normalize_or_zero(),
                        target: Some(target.id),
                        surface: SurfaceKind::Flesh,
                    },
                );
            }
        }

        // Ground plane at z = 0
        if dir.z < 0.0 && start.z > 0.0 {
            let t = -start.z / dir.z;
            if t <= len {
                consider(
                    t,
                    TraceHit {
                        point: start + dir * t,
                        normal: Vec3::Z,
                        target: None,
                        surface: SurfaceKind::Default,
                    },
                );
            }
        }

        nearest.map(|(_, hit)| hit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::weapon::{WeaponKind, WeaponSpec};
    use rand::SeedableRng;
    use uuid::Uuid;

    fn target_at(x: f32) -> CharacterTarget {
        CharacterTarget {
            id: Uuid::new_v4(),
            position: Vec3::new(x, 0.0, 100.0),
            body_radius: 40.0,
            head_center: Vec3::new(x, 0.0, 160.0),
            head_radius: 15.0,
        }
    }

    #[test]
    fn spread_stays_within_cone() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let axis = Vec3::new(0.3, -0.8, 0.2).normalize();
        let half = 2.0f32.to_radians();

        for _ in 0..500 {
            let dir = HitResolver::spread_direction(&mut rng, axis, half);
            assert!((dir.length() - 1.0).abs() < 1e-4);
            assert!(dir.dot(axis) >= half.cos() - 1e-4);
        }
    }

    #[test]
    fn zero_spread_returns_axis() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let axis = Vec3::Y;
        assert_eq!(HitResolver::spread_direction(&mut rng, axis, 0.0), axis);
    }

    #[test]
    fn body_hit_takes_base_damage() {
        let target = target_at(500.0);
        let targets = [target];
        let scene = SceneTrace::new(&targets);
        let resolver = HitResolver::new(HitscanConfig::default());
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let spec = WeaponSpec::for_kind(WeaponKind::Rifle);

        let shot = resolver.resolve(
            &mut rng,
            Vec3::new(0.0, 0.0, 100.0),
            Vec3::X,
            &WeaponSpec {
                spread_degrees: 0.0,
                ..spec
            },
            Uuid::new_v4(),
            &scene,
        );

        let hit = shot.hit.expect("shot should connect");
        assert_eq!(hit.target, Some(target.id));
        assert_eq!(hit.surface, SurfaceKind::Flesh);
        assert_eq!(hit.damage, spec.base_damage);
    }

    #[test]
    fn vulnerable_hit_multiplies_damage() {
        let target = target_at(500.0);
        let targets = [target];
        let scene = SceneTrace::new(&targets);
        let resolver = HitResolver::new(HitscanConfig::default());
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let spec = WeaponSpec {
            spread_degrees: 0.0,
            ..WeaponSpec::for_kind(WeaponKind::Rifle)
        };

        // Aim at head height
        let shot = resolver.resolve(
            &mut rng,
            Vec3::new(0.0, 0.0, 160.0),
            Vec3::X,
            &spec,
            Uuid::new_v4(),
            &scene,
        );

        let hit = shot.hit.expect("shot should connect");
        assert_eq!(hit.surface, SurfaceKind::FleshVulnerable);
        assert_eq!(hit.damage, spec.base_damage * 4.0);
    }

    #[test]
    fn shooter_is_ignored_by_trace() {
        let target = target_at(500.0);
        let targets = [target];
        let scene = SceneTrace::new(&targets);

        let hit = scene.trace(
            Vec3::new(0.0, 0.0, 100.0),
            Vec3::new(1000.0, 0.0, 100.0),
            Some(target.id),
        );
        assert!(hit.is_none());
    }

    #[test]
    fn miss_beyond_range_returns_none() {
        let target = target_at(20_000.0);
        let targets = [target];
        let scene = SceneTrace::new(&targets);

        let hit = scene.trace(
            Vec3::new(0.0, 0.0, 100.0),
            Vec3::new(10_000.0, 0.0, 100.0),
            None,
        );
        assert!(hit.is_none());
    }

    #[test]
    fn downward_shot_strikes_ground() {
        let scene = SceneTrace::new(&[]);
        let hit = scene
            .trace(
                Vec3::new(0.0, 0.0, 100.0),
                Vec3::new(200.0, 0.0, -100.0),
                None,
            )
            .expect("ground hit");
        assert_eq!(hit.surface, SurfaceKind::Default);
        assert!(hit.point.z.abs() < 1e-3);
    }

    #[test]
    fn quantization_error_is_at_most_half_unit() {
        let v = Vec3::new(12.49, -87.51, 3.2);
        let q = QuantizedVec::from_vec3(v);
        let back = q.to_vec3();
        assert!((back - v).abs().max_element() <= 0.5 + 1e-4);
    }
}
