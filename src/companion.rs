/*
Nightglow - Night Pond Scene

Firefly companion behavior.

Each companion runs its own three-state machine against the anchor (the
boat): Roaming inside the spawn area, Homing onto the anchor's predicted
position, and Orbiting around it once arrived. Companions only ever read the
anchor snapshot, the shared read-only noise field and their own random
stream, so the per-tick pass gives the same result in any order.
*/
use bevy::math::Vec2;
use bevy::log::debug;
use std::f32::consts::TAU;

use crate::config::SwarmConfig;
use crate::random::{NoiseSource, RandomSource, SeededRandom};
use crate::smoothing::{approach, inverse_lerp, lerp, smooth_damp_vec2};

/// Orbit Band: Orbiting Holds its Circle Within orbit_radius * This
const ORBIT_BAND_FACTOR: f32 = 1.2;
/// Regroup Target Sits at orbit_radius * This
const REGROUP_RADIUS_FACTOR: f32 = 0.5;
const FLOAT_FREQUENCY: f32 = 3.0;
const FLICKER_RATE: f32 = 4.0;
const VISUAL_SEED_RANGE: i32 = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompanionState {
    #[default]
    Roaming,
    Homing,
    Orbiting,
}

/// Snapshot of the Tracked Anchor for One Tick
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Anchor {
    pub position: Vec2,
    pub velocity: Vec2,
}

impl Anchor {
    pub fn at(position: Vec2) -> Self {
        Self { position, velocity: Vec2::ZERO }
    }

    /// Where the Anchor Will be After `lead` Seconds at its Current Velocity
    pub fn predicted(&self, lead: f32) -> Vec2 {
        self.position + self.velocity * lead
    }
}

/// Clock Values for One Tick
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FrameTime {
    pub now: f32,
    pub delta: f32,
}

impl FrameTime {
    /// Negative or Non-Finite Deltas Become a Paused (Zero) Tick
    pub fn new(now: f32, delta: f32) -> Self {
        let delta = if delta.is_finite() && delta > 0.0 { delta } else { 0.0 };
        Self { now, delta }
    }
}

/// What the Renderer Needs per Companion per Tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompanionOutput {
    pub position: Vec2,
    pub visual_intensity: f32,
    pub visual_scale: f32,
    pub state: CompanionState,
}

#[derive(Debug)]
pub struct CompanionEntity {
    pub index: usize,
    pub position: Vec2,
    pub target_position: Vec2,

    // Anchor-Local Offset, Only Meaningful While Orbiting
    pub relative_position: Vec2,
    pub relative_target: Vec2,
    pub relative_velocity: Vec2,

    pub state: CompanionState,
    /// Sticky Once Set; Cleared Only by Returning to Roaming
    pub arrived: bool,

    pub current_speed: f32,
    pub base_size: f32,
    pub target_size: f32,
    pub current_size: f32,

    pub orbit_angle: f32,
    /// Unit Direction of the Current Orbit Perturbation
    pub orbit_direction: Vec2,
    pub direction_timer: f32,
    pub wander_timer: f32,
    pub visual_seed: i32,

    pub visual_intensity: f32,
    pub visual_scale: f32,

    rng: SeededRandom,
}

impl CompanionEntity {
    /// Companion `index` of a Swarm; Everything Random Comes From the
    /// Companion's Own Stream so Spawning is Reproducible per Index
    pub fn spawn(index: usize, config: &SwarmConfig) -> Self {
        let mut rng = SeededRandom::stream(config.seed, index);

        let position = rng.point_in_rect(config.spawn_area_min, config.spawn_area_max);
        let target_position = rng.point_in_rect(config.spawn_area_min, config.spawn_area_max);
        let wander_timer = rng.uniform(config.wander_interval_min, config.wander_interval_max);
        let visual_seed = rng.integer(0, VISUAL_SEED_RANGE);
        let orbit_angle = rng.uniform(0.0, TAU);
        let orbit_direction = rng.unit_vector();

        Self {
            index,
            position,
            target_position,
            relative_position: Vec2::ZERO,
            relative_target: Vec2::ZERO,
            relative_velocity: Vec2::ZERO,
            state: CompanionState::Roaming,
            arrived: false,
            current_speed: config.normal_speed,
            base_size: config.base_size,
            target_size: config.base_size,
            current_size: config.base_size,
            orbit_angle,
            orbit_direction,
            direction_timer: 0.0,
            wander_timer,
            visual_seed,
            visual_intensity: config.min_intensity,
            visual_scale: config.base_size,
            rng,
        }
    }

    pub fn output(&self) -> CompanionOutput {
        CompanionOutput {
            position: self.position,
            visual_intensity: self.visual_intensity,
            visual_scale: self.visual_scale,
            state: self.state,
        }
    }

    /// One Full Tick: Behavior, Then Movement, Then Visuals
    pub fn step<N: NoiseSource + ?Sized>(
        &mut self,
        config: &SwarmConfig,
        anchor: Option<Anchor>,
        frame: FrameTime,
        noise: &N,
    ) {
        self.update_behavior(config, anchor, frame.delta);
        self.update_movement(config, anchor, frame);
        self.update_visuals(config, frame, noise);
    }

    // ---------- Behavior ----------

    fn update_behavior(&mut self, config: &SwarmConfig, anchor: Option<Anchor>, dt: f32) {
        // No Anchor is a Valid Steady State: Keep Roaming
        let Some(anchor) = anchor else {
            self.return_to_roaming(config);
            self.update_wander(config, dt);
            return;
        };

        let distance = self.position.distance(anchor.position);
        if distance > config.follow_distance {
            self.return_to_roaming(config);
            self.update_wander(config, dt);
            return;
        }

        match self.state {
            CompanionState::Roaming => {
                self.enter_homing();
                self.update_homing(config, &anchor, dt);
            }
            CompanionState::Homing => self.update_homing(config, &anchor, dt),
            CompanionState::Orbiting => self.update_orbit_target(config, &anchor, distance, dt),
        }
    }

    fn update_wander(&mut self, config: &SwarmConfig, dt: f32) {
        self.wander_timer -= dt;
        if self.wander_timer <= 0.0 {
            self.target_position = self
                .rng
                .point_in_rect(config.spawn_area_min, config.spawn_area_max);
            self.wander_timer = self
                .rng
                .uniform(config.wander_interval_min, config.wander_interval_max);
        }
    }

    fn update_homing(&mut self, config: &SwarmConfig, anchor: &Anchor, dt: f32) {
        let predicted = anchor.predicted(config.prediction_time);
        self.target_position = predicted;

        if self.position.distance(predicted) > config.arrival_radius {
            return;
        }

        // Arrived: Snap Onto the Anchor, Which Always Lies in the Orbit Band
        self.arrived = true;
        self.relative_position = Vec2::ZERO;
        self.relative_velocity = Vec2::ZERO;
        self.position = anchor.position;
        self.enter_orbit(config);
        self.update_orbit_target(config, anchor, 0.0, dt);
    }

    fn update_orbit_target(&mut self, config: &SwarmConfig, anchor: &Anchor, distance: f32, dt: f32) {
        self.orbit_angle += config.orbit_speed * dt;

        self.direction_timer -= dt;
        if self.direction_timer <= 0.0 {
            self.orbit_direction = self.rng.unit_vector();
            self.direction_timer = config.direction_change_interval;
        }

        self.relative_target = if distance > config.orbit_radius * ORBIT_BAND_FACTOR {
            // Regrouping: Pulled Back Near the Anchor, Still Orbiting
            self.orbit_direction * config.orbit_radius * REGROUP_RADIUS_FACTOR
        } else {
            Vec2::from_angle(self.orbit_angle) * config.orbit_radius
                + self.orbit_direction * config.orbit_jitter
        };
        self.target_position = anchor.position + self.relative_target;
    }

    fn enter_homing(&mut self) {
        debug!("firefly {} homing", self.index);
        self.state = CompanionState::Homing;
        self.arrived = false;
        self.relative_position = Vec2::ZERO;
        self.relative_velocity = Vec2::ZERO;
    }

    fn enter_orbit(&mut self, config: &SwarmConfig) {
        debug!("firefly {} orbiting", self.index);
        self.state = CompanionState::Orbiting;
        self.target_size = config.base_size * config.orbit_size_multiplier;
        // Force a Fresh Perturbation on the First Orbit Tick
        self.direction_timer = 0.0;
    }

    fn return_to_roaming(&mut self, config: &SwarmConfig) {
        if self.state == CompanionState::Roaming {
            return;
        }
        debug!("firefly {} roaming", self.index);
        self.state = CompanionState::Roaming;
        self.arrived = false;
        self.current_speed = config.normal_speed;
        self.target_size = config.base_size;
        self.relative_velocity = Vec2::ZERO;
        // Pick a Fresh Roaming Target on This Tick
        self.wander_timer = 0.0;
    }

    // ---------- Movement ----------

    fn update_movement(&mut self, config: &SwarmConfig, anchor: Option<Anchor>, frame: FrameTime) {
        let dt = frame.delta;
        match self.state {
            CompanionState::Roaming => {
                let before = self.position;
                self.position =
                    self.position.move_towards(self.target_position, self.current_speed * dt);

                let phase = frame.now * FLOAT_FREQUENCY + self.visual_seed as f32;
                self.position.y += phase.sin() * config.float_height * dt;

                // The Float Never Carries a Roamer Out of its Area
                let area = config.spawn_rect();
                if area.contains(before) {
                    self.position = self.position.clamp(area.min, area.max);
                }
            }
            CompanionState::Homing => {
                self.current_speed =
                    approach(self.current_speed, config.follow_speed, config.acceleration, dt);
                self.position =
                    self.position.move_towards(self.target_position, self.current_speed * dt);
            }
            CompanionState::Orbiting => {
                let Some(anchor) = anchor else {
                    return;
                };

                // Far Companions Settle Faster Than Ones Already Close
                let distance = self.position.distance(anchor.position);
                let spread = inverse_lerp(0.0, config.follow_distance, distance);
                let smooth_time = lerp(config.smooth_time_max, config.smooth_time_min, spread);

                self.relative_position = smooth_damp_vec2(
                    self.relative_position,
                    self.relative_target,
                    &mut self.relative_velocity,
                    smooth_time,
                    config.max_smooth_speed,
                    dt,
                );
                self.position = anchor.position + self.relative_position;
            }
        }
    }

    // ---------- Visuals ----------

    fn update_visuals<N: NoiseSource + ?Sized>(
        &mut self,
        config: &SwarmConfig,
        frame: FrameTime,
        noise: &N,
    ) {
        let seed = self.visual_seed as f32;

        let flicker = noise.sample(frame.now * FLICKER_RATE + seed, 0.0);
        let mut intensity =
            config.min_intensity + flicker * (config.max_intensity - config.min_intensity);
        if self.state == CompanionState::Orbiting {
            intensity *= config.orbit_intensity_boost;
        }
        self.visual_intensity = intensity;

        self.current_size = approach(
            self.current_size,
            self.target_size,
            config.size_lerp_speed,
            frame.delta,
        )
        .clamp(config.min_size, config.max_size);

        let pulse = (frame.now * config.pulse_frequency + seed).sin()
            * config.pulse_amount
            * self.base_size;
        self.visual_scale = (self.current_size + pulse).clamp(config.min_size, config.max_size);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FlatNoise(f32);

    impl NoiseSource for FlatNoise {
        fn sample(&self, _x: f32, _y: f32) -> f32 {
            self.0
        }
    }

    const DT: f32 = 1.0 / 60.0;

    fn config() -> SwarmConfig {
        SwarmConfig {
            follow_distance: 4.0,
            arrival_radius: 0.2,
            ..SwarmConfig::default()
        }
    }

    fn run(
        entity: &mut CompanionEntity,
        cfg: &SwarmConfig,
        anchor: Option<Anchor>,
        ticks: usize,
        start: usize,
    ) {
        for i in start..start + ticks {
            let frame = FrameTime::new(i as f32 * DT, DT);
            entity.step(cfg, anchor, frame, &FlatNoise(0.5));
        }
    }

    #[test]
    fn test_far_entity_keeps_roaming() {
        let cfg = config();
        let mut e = CompanionEntity::spawn(0, &cfg);
        e.position = Vec2::new(10.0, 10.0);
        e.target_position = e.position;
        let anchor = Some(Anchor::at(Vec2::ZERO));
        // Targets Are Drawn From the Area, so Pin the Area Far From the Anchor
        let cfg = SwarmConfig {
            spawn_area_min: Vec2::new(8.0, 8.0),
            spawn_area_max: Vec2::new(12.0, 12.0),
            ..cfg
        };
        for i in 0..2000 {
            e.step(&cfg, anchor, FrameTime::new(i as f32 * DT, DT), &FlatNoise(0.5));
            assert_eq!(e.state, CompanionState::Roaming);
            assert!(!e.arrived);
        }
    }

    #[test]
    fn test_near_entity_homes_then_orbits() {
        let cfg = config();
        let mut e = CompanionEntity::spawn(0, &cfg);
        e.position = Vec2::new(1.0, 0.0);
        let anchor = Some(Anchor::at(Vec2::ZERO));

        run(&mut e, &cfg, anchor, 1, 0);
        assert_eq!(e.state, CompanionState::Homing);
        assert!(e.position.x < 1.0);

        let mut arrived_at = None;
        for i in 1..600 {
            e.step(&cfg, anchor, FrameTime::new(i as f32 * DT, DT), &FlatNoise(0.5));
            if e.arrived {
                arrived_at = Some(i);
                break;
            }
        }
        assert!(arrived_at.is_some(), "entity never arrived");
        assert_eq!(e.state, CompanionState::Orbiting);
        assert!(e.position.length() <= cfg.orbit_radius * 1.2);
    }

    #[test]
    fn test_homing_ramps_speed_toward_follow_speed() {
        let cfg = config();
        let mut e = CompanionEntity::spawn(0, &cfg);
        e.position = Vec2::new(3.5, 0.0);
        let anchor = Some(Anchor::at(Vec2::ZERO));
        run(&mut e, &cfg, anchor, 10, 0);
        assert_eq!(e.state, CompanionState::Homing);
        assert!(e.current_speed > cfg.normal_speed);
        assert!(e.current_speed <= cfg.follow_speed);
    }

    #[test]
    fn test_homing_targets_predicted_anchor() {
        let cfg = config();
        let mut e = CompanionEntity::spawn(0, &cfg);
        e.position = Vec2::new(3.0, 0.0);
        let anchor = Anchor {
            position: Vec2::ZERO,
            velocity: Vec2::new(0.0, 2.0),
        };
        run(&mut e, &cfg, Some(anchor), 1, 0);
        assert_eq!(e.target_position, Vec2::new(0.0, 2.0 * cfg.prediction_time));
    }

    #[test]
    fn test_leaving_follow_distance_resets_everything() {
        let cfg = config();
        let mut e = CompanionEntity::spawn(0, &cfg);
        e.position = Vec2::new(0.1, 0.0);
        run(&mut e, &cfg, Some(Anchor::at(Vec2::ZERO)), 5, 0);
        assert_eq!(e.state, CompanionState::Orbiting);
        assert!(e.arrived);

        // Anchor Jumps Away Between Ticks
        run(&mut e, &cfg, Some(Anchor::at(Vec2::new(50.0, 50.0))), 1, 5);
        assert_eq!(e.state, CompanionState::Roaming);
        assert!(!e.arrived);
        assert_eq!(e.current_speed, cfg.normal_speed);
        assert_eq!(e.target_size, cfg.base_size);
    }

    #[test]
    fn test_losing_anchor_returns_to_roaming() {
        let cfg = config();
        let mut e = CompanionEntity::spawn(0, &cfg);
        e.position = Vec2::new(0.1, 0.0);
        run(&mut e, &cfg, Some(Anchor::at(Vec2::ZERO)), 5, 0);
        assert_eq!(e.state, CompanionState::Orbiting);
        run(&mut e, &cfg, None, 1, 5);
        assert_eq!(e.state, CompanionState::Roaming);
        assert!(!e.arrived);
    }

    #[test]
    fn test_orbit_follows_moving_anchor() {
        let cfg = config();
        let mut e = CompanionEntity::spawn(0, &cfg);
        e.position = Vec2::new(0.1, 0.0);
        let mut anchor = Anchor {
            position: Vec2::ZERO,
            velocity: Vec2::new(3.0, 0.0),
        };
        for i in 0..300 {
            e.step(&cfg, Some(anchor), FrameTime::new(i as f32 * DT, DT), &FlatNoise(0.5));
            anchor.position += anchor.velocity * DT;
            if e.arrived {
                assert_eq!(e.state, CompanionState::Orbiting);
            }
        }
        assert!(e.arrived);
        assert!(e.position.distance(anchor.position) < cfg.follow_distance);
    }

    #[test]
    fn test_regrouping_stays_orbiting_and_keeps_size() {
        let cfg = config();
        let mut e = CompanionEntity::spawn(0, &cfg);
        e.position = Vec2::new(0.1, 0.0);
        run(&mut e, &cfg, Some(Anchor::at(Vec2::ZERO)), 3, 0);
        assert_eq!(e.state, CompanionState::Orbiting);
        let orbit_size = e.target_size;

        // Drift Outside the Orbit Band but Inside Follow Distance
        e.position = Vec2::new(cfg.orbit_radius * 2.0, 0.0);
        run(&mut e, &cfg, Some(Anchor::at(Vec2::ZERO)), 1, 3);
        assert_eq!(e.state, CompanionState::Orbiting);
        assert!(e.arrived);
        assert_eq!(e.target_size, orbit_size);
        assert!(
            (e.relative_target.length() - cfg.orbit_radius * REGROUP_RADIUS_FACTOR).abs() < 1e-4
        );
    }

    #[test]
    fn test_far_orbiters_settle_faster() {
        let cfg = SwarmConfig {
            max_smooth_speed: 1000.0,
            ..config()
        };
        let anchor = Some(Anchor::at(Vec2::ZERO));
        let frame = FrameTime::new(0.0, DT);

        let remaining = |offset: f32| {
            let mut e = CompanionEntity::spawn(0, &cfg);
            e.state = CompanionState::Orbiting;
            e.relative_position = Vec2::new(offset, 0.0);
            e.relative_target = Vec2::ZERO;
            e.relative_velocity = Vec2::ZERO;
            e.position = e.relative_position;
            e.update_movement(&cfg, anchor, frame);
            e.relative_position.x / offset
        };

        let near = remaining(0.5);
        let far = remaining(3.5);
        assert!(near < 1.0 && far < 1.0);
        assert!(far < near, "far {far} should close a larger share than near {near}");
    }

    #[test]
    fn test_wander_repicks_within_interval_and_area() {
        let cfg = config();
        let area = cfg.spawn_rect();
        let mut e = CompanionEntity::spawn(0, &cfg);

        let mut last_pick: Option<(usize, f32)> = None;
        let mut picks = 0;
        let mut previous_timer = e.wander_timer;
        for i in 0..3000 {
            e.step(&cfg, None, FrameTime::new(i as f32 * DT, DT), &FlatNoise(0.5));
            if e.wander_timer > previous_timer {
                picks += 1;
                assert!(e.wander_timer >= cfg.wander_interval_min);
                assert!(e.wander_timer <= cfg.wander_interval_max);
                assert!(area.contains(e.target_position));
                if let Some((tick, drawn)) = last_pick {
                    let gap = (i - tick) as f32 * DT;
                    assert!(gap >= drawn - 1e-3, "re-picked after {gap}s, drawn {drawn}s");
                    assert!(gap <= drawn + DT + 1e-3, "re-picked after {gap}s, drawn {drawn}s");
                }
                last_pick = Some((i, e.wander_timer));
            }
            previous_timer = e.wander_timer;
        }
        assert!(picks >= 5);
    }

    #[test]
    fn test_orbit_direction_changes_on_interval() {
        let cfg = config();
        let mut e = CompanionEntity::spawn(0, &cfg);
        e.position = Vec2::new(0.1, 0.0);
        let anchor = Some(Anchor::at(Vec2::ZERO));

        let mut changes = Vec::new();
        let mut direction = e.orbit_direction;
        for i in 0..600 {
            e.step(&cfg, anchor, FrameTime::new(i as f32 * DT, DT), &FlatNoise(0.5));
            assert_eq!(e.state, CompanionState::Orbiting);
            if e.orbit_direction != direction {
                changes.push(i);
                direction = e.orbit_direction;
            }
        }

        assert_eq!(changes.first(), Some(&0));
        assert!(changes.len() >= 5);
        for pair in changes.windows(2) {
            let gap = (pair[1] - pair[0]) as f32 * DT;
            assert!(gap >= cfg.direction_change_interval - 1e-3, "changed after {gap}s");
            assert!(gap <= cfg.direction_change_interval + DT + 1e-3, "changed after {gap}s");
        }
    }

    #[test]
    fn test_zero_delta_is_idempotent() {
        let cfg = config();
        let mut e = CompanionEntity::spawn(0, &cfg);
        e.position = Vec2::new(2.0, 0.0);
        let anchor = Some(Anchor::at(Vec2::ZERO));
        run(&mut e, &cfg, anchor, 3, 0);

        let before = e.output();
        let speed = e.current_speed;
        let size = e.current_size;
        // Same Clock as the Last Tick, Nothing Elapsed
        for _ in 0..10 {
            e.step(&cfg, anchor, FrameTime::new(2.0 * DT, 0.0), &FlatNoise(0.5));
        }
        assert_eq!(e.output(), before);
        assert_eq!(e.current_speed, speed);
        assert_eq!(e.current_size, size);
    }

    #[test]
    fn test_negative_delta_is_treated_as_pause() {
        assert_eq!(FrameTime::new(1.0, -0.5).delta, 0.0);
        assert_eq!(FrameTime::new(1.0, f32::NAN).delta, 0.0);
        assert_eq!(FrameTime::new(1.0, 0.25).delta, 0.25);
    }

    #[test]
    fn test_intensity_boosted_while_orbiting() {
        let cfg = config();
        let mut e = CompanionEntity::spawn(0, &cfg);
        let frame = FrameTime::new(0.0, DT);
        e.update_visuals(&cfg, frame, &FlatNoise(1.0));
        assert!((e.visual_intensity - cfg.max_intensity).abs() < 1e-5);

        e.state = CompanionState::Orbiting;
        e.update_visuals(&cfg, frame, &FlatNoise(0.0));
        assert!((e.visual_intensity - cfg.min_intensity * cfg.orbit_intensity_boost).abs() < 1e-5);
    }

    #[test]
    fn test_size_grows_while_orbiting_and_respects_floor() {
        let cfg = SwarmConfig {
            pulse_amount: 10.0,
            ..config()
        };
        let mut e = CompanionEntity::spawn(0, &cfg);
        e.position = Vec2::new(0.1, 0.0);
        for i in 0..400 {
            e.step(&cfg, Some(Anchor::at(Vec2::ZERO)), FrameTime::new(i as f32 * DT, DT), &FlatNoise(0.5));
            assert!(e.current_size >= cfg.min_size * 0.5);
            assert!(e.visual_scale >= cfg.min_size);
        }
        assert!(e.current_size > cfg.base_size);
    }
}
