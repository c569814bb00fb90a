/*
Nightglow - Night Pond Scene
*/
use bevy::prelude::*;
use bevy::window::PrimaryWindow;

use crate::config::{CameraConfig, NightConfig};
use crate::player::{move_boat, Boat, Player, PIXELS_PER_UNIT};
use crate::smoothing::smooth_damp_vec2;

/// Smoothed Follow State, Positions in World Units
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct FollowCamera {
    pub velocity: Vec2,
}

impl FollowCamera {
    /// One Follow Step Toward `target`
    ///
    /// `half_view` is half the visible area; bounds are shrunk by it so the
    /// view never shows past the edges. The result moves at most
    /// `max_speed * dt` from `current`.
    pub fn step(
        &mut self,
        config: &CameraConfig,
        current: Vec2,
        target: Vec2,
        target_velocity: Vec2,
        half_view: Vec2,
        dt: f32,
    ) -> Vec2 {
        if dt <= 0.0 {
            return current;
        }

        let mut aim = target + config.offset;
        if target_velocity.length() > config.prediction_min_speed {
            aim += target_velocity * config.prediction;
        }
        if config.use_bounds {
            aim = bounded(config, aim, half_view);
        }

        let mut next = smooth_damp_vec2(
            current,
            aim,
            &mut self.velocity,
            config.smooth_time,
            f32::INFINITY,
            dt,
        );
        if config.use_bounds {
            next = bounded(config, next, half_view);
        }

        let max_step = config.max_speed * dt;
        let moved = next - current;
        if moved.length() > max_step {
            next = current + moved.normalize_or_zero() * max_step;
        }
        next
    }
}

/// Clamp a Camera Center so the View Stays Inside the Bounds
/// Centers on an Axis Where the View is Wider Than the Bounds
pub fn bounded(config: &CameraConfig, center: Vec2, half_view: Vec2) -> Vec2 {
    let min = config.bounds_min + half_view;
    let max = config.bounds_max - half_view;
    let mid = (config.bounds_min + config.bounds_max) * 0.5;

    let axis = |c: f32, lo: f32, hi: f32, m: f32| if lo > hi { m } else { c.clamp(lo, hi) };
    Vec2::new(
        axis(center.x, min.x, max.x, mid.x),
        axis(center.y, min.y, max.y, mid.y),
    )
}

// ---------- Bevy Glue ----------

pub struct CameraFollowPlugin;

impl Plugin for CameraFollowPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, spawn_camera)
            .add_systems(Update, follow_boat.after(move_boat));
    }
}

fn spawn_camera(mut commands: Commands) {
    commands.spawn((Camera2d, FollowCamera::default()));
}

fn follow_boat(
    time: Res<Time>,
    config: Res<NightConfig>,
    q_window: Query<&Window, With<PrimaryWindow>>,
    q_player: Query<&Boat, With<Player>>,
    mut q_camera: Query<(&mut Transform, &mut FollowCamera), Without<Player>>,
) {
    let Some(boat) = q_player.iter().next() else {
        return;
    };
    let half_view = q_window
        .iter()
        .next()
        .map(|w| Vec2::new(w.width(), w.height()) * 0.5 / PIXELS_PER_UNIT)
        .unwrap_or(Vec2::ZERO);

    for (mut tf, mut follow) in q_camera.iter_mut() {
        let current = tf.translation.truncate() / PIXELS_PER_UNIT;
        let next = follow.step(
            &config.camera,
            current,
            boat.0.position,
            boat.0.velocity(),
            half_view,
            time.delta_secs(),
        );
        tf.translation.x = next.x * PIXELS_PER_UNIT;
        tf.translation.y = next.y * PIXELS_PER_UNIT;
    }
}
