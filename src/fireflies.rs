/*
Nightglow - Night Pond Scene
*/
use bevy::prelude::*;

use crate::companion::{Anchor, CompanionOutput, CompanionState, FrameTime};
use crate::config::{NightConfig, SwarmConfig};
use crate::player::{move_boat, Boat, Player, PIXELS_PER_UNIT};
use crate::swarm::CompanionSwarm;

const FIREFLY_Z: f32 = 2.0;
const HALO_SCALE: f32 = 4.0;
const HALO_ALPHA: f32 = 0.25;

pub const CENSUS_KEY: KeyCode = KeyCode::F3;

#[derive(Resource)]
pub struct Fireflies(pub CompanionSwarm);

/// Index Into the Swarm
#[derive(Component, Clone, Copy)]
pub struct Firefly(pub usize);

#[derive(Component, Clone, Copy)]
pub struct FireflyHalo(pub usize);

pub struct FireflyPlugin;

impl Plugin for FireflyPlugin {
	fn build(&self, app: &mut App) {
		app
			.add_systems(Startup, spawn_fireflies)
			.add_systems(Update, (
				tick_swarm.after(move_boat),
				sync_fireflies.after(tick_swarm),
				log_swarm_census,
			));
	}
}

fn firefly_color(alpha: f32) -> Color {
	Color::srgba(1.0, 0.8, 0.2, alpha)
}

fn spawn_fireflies(mut commands: Commands, config: Res<NightConfig>) {
	let swarm = match CompanionSwarm::new(config.swarm.clone()) {
		Ok(s) => s,
		Err(e) => {
			error!("Swarm config rejected ({e}), using defaults");
			match CompanionSwarm::new(SwarmConfig::default()) {
				Ok(s) => s,
				Err(e) => {
					error!("Default swarm config rejected: {e}");
					return;
				}
			}
		}
	};

	for (index, CompanionOutput { position, visual_scale, .. }) in swarm.outputs().enumerate() {
		let px = position * PIXELS_PER_UNIT;
		commands
			.spawn((
				Firefly(index),
				Sprite::from_color(firefly_color(1.0), Vec2::splat(PIXELS_PER_UNIT)),
				Transform::from_xyz(px.x, px.y, FIREFLY_Z).with_scale(Vec3::splat(visual_scale)),
			))
			.with_children(|p| {
				p.spawn((
					FireflyHalo(index),
					Sprite::from_color(
						firefly_color(HALO_ALPHA),
						Vec2::splat(PIXELS_PER_UNIT * HALO_SCALE),
					),
					Transform::from_xyz(0.0, 0.0, -0.1),
				));
			});
	}

	commands.insert_resource(Fireflies(swarm));
}

fn tick_swarm(
	time: Res<Time>,
	swarm: Option<ResMut<Fireflies>>,
	q_player: Query<&Boat, With<Player>>,
) {
	let Some(mut swarm) = swarm else {
		return;
	};
	let anchor = q_player.iter().next().map(|boat| Anchor {
		position: boat.0.position,
		velocity: boat.0.velocity(),
	});
	let frame = FrameTime::new(time.elapsed_secs(), time.delta_secs());
	swarm.0.tick(&anchor, frame);
}

fn sync_fireflies(
	swarm: Option<Res<Fireflies>>,
	mut q_body: Query<(&Firefly, &mut Transform, &mut Sprite), Without<FireflyHalo>>,
	mut q_halo: Query<(&FireflyHalo, &mut Sprite), Without<Firefly>>,
) {
	let Some(swarm) = swarm else {
		return;
	};
	let outputs: Vec<CompanionOutput> = swarm.0.outputs().collect();

	for (firefly, mut tf, mut sprite) in q_body.iter_mut() {
		let Some(out) = outputs.get(firefly.0) else {
			continue;
		};
		let px = out.position * PIXELS_PER_UNIT;
		tf.translation.x = px.x;
		tf.translation.y = px.y;
		tf.scale = Vec3::splat(out.visual_scale);
		sprite.color = firefly_color(out.visual_intensity.clamp(0.0, 1.0));
	}

	// Orbit Boost Pushes Intensity Past 1; the Halo Carries the Extra Glow
	for (halo, mut sprite) in q_halo.iter_mut() {
		let Some(out) = outputs.get(halo.0) else {
			continue;
		};
		sprite.color = firefly_color((out.visual_intensity * HALO_ALPHA).clamp(0.0, 1.0));
	}
}

fn log_swarm_census(keys: Res<ButtonInput<KeyCode>>, swarm: Option<Res<Fireflies>>) {
	if !keys.just_pressed(CENSUS_KEY) {
		return;
	}
	let Some(swarm) = swarm else {
		return;
	};
	info!(
		"Fireflies: {} roaming, {} homing, {} orbiting",
		swarm.0.count_in(CompanionState::Roaming),
		swarm.0.count_in(CompanionState::Homing),
		swarm.0.count_in(CompanionState::Orbiting),
	);
}
