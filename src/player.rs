/*
Nightglow - Night Pond Scene
*/
use bevy::prelude::*;

use crate::audio::{PlaySfx, SfxKind};
use crate::camera::FollowCamera;
use crate::config::NightConfig;
use crate::ripple::{RippleBoat, RippleMark};

/// Screen Pixels per World Unit
pub const PIXELS_PER_UNIT: f32 = 64.0;

const BOAT_Z: f32 = 1.0;
const RIPPLE_Z: f32 = 0.5;

#[derive(Component)]
pub struct Player;

/// The Boat is What the Fireflies Gather Around
#[derive(Component, Debug, Clone)]
pub struct Boat(pub RippleBoat);

#[derive(Component)]
pub struct Ripple(pub RippleMark);

pub struct BoatPlugin;

impl Plugin for BoatPlugin {
	fn build(&self, app: &mut App) {
		app
			.add_systems(Startup, spawn_boat)
			.add_systems(Update, (
				click_ripple,
				move_boat.after(click_ripple),
				animate_ripples,
			));
	}
}

pub fn spawn_boat(mut commands: Commands, config: Res<NightConfig>) {
	let start = config.boat.start_position;
	let px = start * PIXELS_PER_UNIT;

	commands.spawn((
		Player,
		Boat(RippleBoat::new(start)),
		Sprite::from_color(
			Color::srgb(0.42, 0.30, 0.20),
			Vec2::new(0.45, 1.1) * PIXELS_PER_UNIT,
		),
		Transform::from_xyz(px.x, px.y, BOAT_Z),
	));
}

/// Left Click on the Water: Ring + Splash, and the Boat Drifts Away From It
pub fn click_ripple(
	mut commands: Commands,
	mouse: Res<ButtonInput<MouseButton>>,
	q_window: Query<&Window>,
	q_camera: Query<(&Camera, &GlobalTransform), With<FollowCamera>>,
	config: Res<NightConfig>,
	mut q_boat: Query<&mut Boat, With<Player>>,
	mut meshes: ResMut<Assets<Mesh>>,
	mut materials: ResMut<Assets<ColorMaterial>>,
	mut sfx: MessageWriter<PlaySfx>,
) {
	if !mouse.just_pressed(MouseButton::Left) {
		return;
	}
	let Some(cursor) = q_window.iter().find_map(|w| w.cursor_position()) else {
		return;
	};
	let Some((camera, cam_tf)) = q_camera.iter().next() else {
		return;
	};
	let world_px = match camera.viewport_to_world_2d(cam_tf, cursor) {
		Ok(p) => p,
		Err(e) => {
			debug!("Click outside viewport: {e:?}");
			return;
		}
	};
	let click = world_px / PIXELS_PER_UNIT;

	for mut boat in q_boat.iter_mut() {
		if boat.0.push_from(click, &config.boat) {
			debug!("Ripple at {click} pushed the boat");
		}
	}

	commands.spawn((
		Ripple(RippleMark::new(click)),
		Mesh2d(meshes.add(Annulus::new(0.9, 1.0))),
		MeshMaterial2d(materials.add(ColorMaterial::from(Color::srgba(0.8, 0.9, 1.0, 0.8)))),
		Transform::from_xyz(world_px.x, world_px.y, RIPPLE_Z).with_scale(Vec3::splat(0.01)),
	));

	sfx.write(PlaySfx {
		kind: SfxKind::RippleSplash,
		pos: world_px.extend(0.0),
	});
}

pub fn move_boat(
	time: Res<Time>,
	config: Res<NightConfig>,
	mut q_boat: Query<(&mut Boat, &mut Transform), With<Player>>,
	mut sfx: MessageWriter<PlaySfx>,
) {
	let now = time.elapsed_secs();
	let dt = time.delta_secs();

	for (mut boat, mut tf) in q_boat.iter_mut() {
		boat.0.update(&config.boat, now, dt);
		if boat.0.contain(config.boat.pond_min, config.boat.pond_max, &config.boat) {
			sfx.write(PlaySfx {
				kind: SfxKind::BoatBump,
				pos: tf.translation,
			});
		}

		let px = boat.0.position * PIXELS_PER_UNIT;
		tf.translation.x = px.x;
		tf.translation.y = px.y;
		tf.rotation = Quat::from_rotation_z(boat.0.rotation.to_radians());
	}
}

/// Grow + Fade Click Rings, Despawn Once Spent
pub fn animate_ripples(
	mut commands: Commands,
	time: Res<Time>,
	config: Res<NightConfig>,
	mut materials: ResMut<Assets<ColorMaterial>>,
	mut q: Query<(Entity, &mut Ripple, &mut Transform, &MeshMaterial2d<ColorMaterial>)>,
) {
	for (e, mut ripple, mut tf, material) in q.iter_mut() {
		ripple.0.advance(time.delta_secs());
		if ripple.0.is_done(&config.ripple) {
			commands.entity(e).despawn();
			continue;
		}

		let radius = (ripple.0.radius(&config.ripple) * PIXELS_PER_UNIT).max(0.01);
		tf.scale = Vec3::new(radius, radius, 1.0);
		if let Some(mat) = materials.get_mut(&material.0) {
			mat.color = mat.color.with_alpha(ripple.0.alpha(&config.ripple));
		}
	}
}
