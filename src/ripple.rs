/*
Nightglow - Night Pond Scene
*/
//! Ripple push physics for the boat, plus the expanding ring left by a click.
//!
//! Angles are degrees, with 0 pointing along +X. The boat's bow is drawn
//! pointing up, so a heading `h` turns into a rotation of `h + 90`.
use bevy::math::Vec2;

use crate::config::{BoatConfig, RippleConfig};
use crate::smoothing::{delta_angle, interpolate, lerp, lerp_angle, smooth_damp_angle};

/// Sway Frequency (rad/s)
const SWAY_FREQUENCY: f32 = 0.8;
/// Rate the Resting Heading Drifts Back Toward the Sway
const SETTLE_RATE: f32 = 0.3;
/// Bounce Decay is Specified per 1/60 s Step
const DECAY_STEPS_PER_SECOND: f32 = 60.0;
/// Bounces Slower Than This Stop Turning the Boat
const HEADING_MIN_SPEED: f32 = 0.1;

fn heading_of(v: Vec2) -> f32 {
    v.y.atan2(v.x).to_degrees() + 90.0
}

fn reflect(dir: Vec2, normal: Vec2) -> Vec2 {
    dir - 2.0 * dir.dot(normal) * normal
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RippleBoat {
    pub position: Vec2,
    /// Degrees
    pub rotation: f32,
    pub target_rotation: f32,
    rotation_velocity: f32,

    pushing: bool,
    push_timer: f32,
    push_direction: Vec2,
    push_force: f32,
    push_velocity: Vec2,

    bouncing: bool,
    bounce_velocity: Vec2,
}

impl RippleBoat {
    pub fn new(position: Vec2) -> Self {
        Self { position, ..Default::default() }
    }

    pub fn is_pushed(&self) -> bool {
        self.pushing
    }

    pub fn is_bouncing(&self) -> bool {
        self.bouncing
    }

    /// Current Drift Velocity (World Units / s)
    pub fn velocity(&self) -> Vec2 {
        if self.pushing {
            self.push_velocity
        } else if self.bouncing {
            self.bounce_velocity
        } else {
            Vec2::ZERO
        }
    }

    /// Push Away From a Ripple at `click`
    /// Returns `false` When the Ripple is Too Far Away to Matter
    pub fn push_from(&mut self, click: Vec2, config: &BoatConfig) -> bool {
        let distance = click.distance(self.position);
        if distance > config.max_push_distance {
            return false;
        }

        self.bouncing = false;
        self.bounce_velocity = Vec2::ZERO;

        self.push_direction = (self.position - click).normalize_or_zero();
        let distance_factor = 1.0 - distance / config.max_push_distance;
        self.push_force = config.push_force * distance_factor;

        // Lean Into the Push, Weaker From Far Away, Never Past the Tilt Limit
        let wanted = lerp_angle(
            self.rotation,
            heading_of(self.push_direction),
            distance_factor * config.rotation_inertia,
        );
        let tilt = delta_angle(self.rotation, wanted)
            .clamp(-config.max_tilt_angle, config.max_tilt_angle);
        self.target_rotation = self.rotation + tilt;

        self.pushing = true;
        self.push_timer = 0.0;
        self.push_velocity = self.push_direction * self.push_force;
        true
    }

    /// Hit Something Whose Surface Faces Along `normal`
    /// Returns `true` When the Boat Bounced
    pub fn collide(&mut self, normal: Vec2, config: &BoatConfig) -> bool {
        if !config.enable_bounce {
            return false;
        }
        let incoming = if self.bouncing { self.bounce_velocity } else { self.push_velocity };
        let speed = incoming.length();
        if speed < config.min_bounce_velocity {
            return false;
        }

        let normal = normal.normalize_or_zero();
        let reflected = reflect(incoming / speed, normal);
        let mut bounce = reflected * speed * config.bounce_force_multiplier;
        if bounce.length() < config.min_bounce_velocity {
            bounce = bounce.normalize_or_zero() * config.min_bounce_velocity;
        }

        self.pushing = false;
        self.bouncing = true;
        self.bounce_velocity = bounce;
        self.target_rotation = heading_of(bounce);
        true
    }

    /// Keep the Boat Inside the Pond, Bouncing Off Any Edge it Crossed
    pub fn contain(&mut self, min: Vec2, max: Vec2, config: &BoatConfig) -> bool {
        let mut normal = Vec2::ZERO;
        if self.position.x < min.x {
            self.position.x = min.x;
            normal.x = 1.0;
        } else if self.position.x > max.x {
            self.position.x = max.x;
            normal.x = -1.0;
        }
        if self.position.y < min.y {
            self.position.y = min.y;
            normal.y = 1.0;
        } else if self.position.y > max.y {
            self.position.y = max.y;
            normal.y = -1.0;
        }

        if normal == Vec2::ZERO {
            return false;
        }
        if self.collide(normal, config) {
            return true;
        }
        // Too Slow to Bounce: Just Stop Against the Edge
        self.pushing = false;
        self.bouncing = false;
        self.push_velocity = Vec2::ZERO;
        self.bounce_velocity = Vec2::ZERO;
        false
    }

    /// Advance Drift and Rotation by `dt`; `now` Drives the Idle Sway
    pub fn update(&mut self, config: &BoatConfig, now: f32, dt: f32) {
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
        if dt == 0.0 {
            return;
        }

        if self.pushing {
            self.update_push(config, dt);
        }
        if self.bouncing {
            self.update_bounce(config, dt);
        }
        self.update_rotation(config, now, dt);
    }

    fn update_push(&mut self, config: &BoatConfig, dt: f32) {
        self.push_timer += dt;
        if self.push_timer >= config.push_duration {
            self.pushing = false;
            if self.push_velocity.length() > config.min_bounce_velocity {
                self.bouncing = true;
                self.bounce_velocity = self.push_velocity;
            }
            self.push_velocity = Vec2::ZERO;
            return;
        }

        let progress = self.push_timer / config.push_duration;
        let speed = self.push_force * (1.0 - progress);
        self.push_velocity = self.push_direction * speed;
        self.position += self.push_velocity * dt;
    }

    fn update_bounce(&mut self, config: &BoatConfig, dt: f32) {
        if self.bounce_velocity.length() < config.min_bounce_velocity {
            self.bouncing = false;
            self.bounce_velocity = Vec2::ZERO;
            return;
        }

        self.position += self.bounce_velocity * dt;
        self.bounce_velocity *= config.bounce_decay.powf(dt * DECAY_STEPS_PER_SECOND);

        if self.bounce_velocity.length() > HEADING_MIN_SPEED {
            self.target_rotation = heading_of(self.bounce_velocity);
        }
    }

    fn update_rotation(&mut self, config: &BoatConfig, now: f32, dt: f32) {
        let sway = (now * SWAY_FREQUENCY).sin() * config.natural_sway;

        self.rotation = smooth_damp_angle(
            self.rotation,
            self.target_rotation + sway,
            &mut self.rotation_velocity,
            1.0 / config.tilt_smoothness,
            f32::INFINITY,
            dt,
        );

        // Drift Back to Rest Once the Push is Well Spent
        if !self.pushing && !self.bouncing && self.push_timer > config.push_duration * 0.5 {
            self.target_rotation = lerp_angle(self.target_rotation, sway, dt * SETTLE_RATE);
        }
    }
}

/// Expanding Ring Left by a Click; Done After `duration`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RippleMark {
    pub center: Vec2,
    pub elapsed: f32,
}

impl RippleMark {
    pub fn new(center: Vec2) -> Self {
        Self { center, elapsed: 0.0 }
    }

    pub fn advance(&mut self, dt: f32) {
        if dt.is_finite() && dt > 0.0 {
            self.elapsed += dt;
        }
    }

    pub fn is_done(&self, config: &RippleConfig) -> bool {
        self.elapsed >= config.duration
    }

    pub fn radius(&self, config: &RippleConfig) -> f32 {
        interpolate(self.elapsed, config.duration, 0.0, config.max_radius)
    }

    pub fn alpha(&self, config: &RippleConfig) -> f32 {
        let t = interpolate(self.elapsed, config.duration, 0.0, 1.0);
        lerp(0.8, 0.0, t)
    }
}
