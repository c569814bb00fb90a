/*
Nightglow - Night Pond Scene
*/
use bevy::prelude::*;

use crate::audio::MusicDirector;
use crate::config::NightConfig;
use crate::player::{Boat, Player, PIXELS_PER_UNIT};
use crate::scene::{SceneLoadRequested, SceneLoaded, SceneRequest};
use crate::smoothing::interpolate;

const OVERLAY_Z: i32 = 9999;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FadePhase {
    #[default]
    Idle,
    Fading,
    /// Fully Black for One Tick Before the Load Goes Out
    Holding,
    Done,
    /// New Scene Up: Black Overlay Clearing to Transparent
    Entering,
}

/// Output of One Fade Tick
#[derive(Debug, Clone, PartialEq)]
pub struct FadeFrame {
    pub alpha: f32,
    /// Multiplier for the Music While Fading; `None` Leaves Music Alone
    pub music_gain: Option<f32>,
    pub stop_music: bool,
    pub load_scene: Option<String>,
}

/// Fade-to-Black Scene Transition Driven by Elapsed Time
///
/// Triggers at most once. The caller feeds it one delta per tick and acts on
/// the returned [`FadeFrame`].
#[derive(Debug, Clone)]
pub struct SceneFade {
    target_scene: String,
    duration: f32,
    fade_audio: bool,
    elapsed: f32,
    phase: FadePhase,
}

impl SceneFade {
    pub fn new(target_scene: impl Into<String>, duration: f32, fade_audio: bool) -> Self {
        Self {
            target_scene: target_scene.into(),
            duration,
            fade_audio,
            elapsed: 0.0,
            phase: FadePhase::Idle,
        }
    }

    pub fn from_config(config: &NightConfig) -> Self {
        Self::new(
            config.fade.target_scene.clone(),
            config.fade.fade_duration,
            config.fade.fade_audio,
        )
    }

    pub fn phase(&self) -> FadePhase {
        self.phase
    }

    /// True Once the Portal Fired (Until the Next Scene Finishes Entering)
    pub fn has_triggered(&self) -> bool {
        matches!(self.phase, FadePhase::Fading | FadePhase::Holding | FadePhase::Done)
    }

    /// Start the Fade if the Anchor is Within Range; Later Calls Do Nothing
    pub fn check_trigger(&mut self, portal: Vec2, trigger_distance: f32, anchor: Option<Vec2>) -> bool {
        if self.phase != FadePhase::Idle {
            return false;
        }
        let Some(anchor) = anchor else {
            return false;
        };
        if anchor.distance(portal) > trigger_distance {
            return false;
        }
        self.trigger();
        true
    }

    pub fn trigger(&mut self) {
        if self.phase != FadePhase::Idle {
            return;
        }
        info!("Scene transition triggered -> {}", self.target_scene);
        self.phase = FadePhase::Fading;
        self.elapsed = 0.0;
    }

    pub fn tick(&mut self, dt: f32) -> FadeFrame {
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
        match self.phase {
            FadePhase::Idle => FadeFrame {
                alpha: 0.0,
                music_gain: None,
                stop_music: false,
                load_scene: None,
            },
            FadePhase::Fading => {
                self.elapsed += dt;
                let alpha = interpolate(self.elapsed, self.duration, 0.0, 1.0);
                let gain = interpolate(self.elapsed, self.duration, 1.0, 0.0);
                let finished = self.elapsed >= self.duration;
                if finished {
                    self.phase = FadePhase::Holding;
                }
                FadeFrame {
                    alpha: if finished { 1.0 } else { alpha },
                    music_gain: self.fade_audio.then_some(if finished { 0.0 } else { gain }),
                    stop_music: finished && self.fade_audio,
                    load_scene: None,
                }
            }
            FadePhase::Holding => {
                self.phase = FadePhase::Done;
                let load_scene = if self.target_scene.trim().is_empty() {
                    error!("Scene transition has no target scene name");
                    None
                } else {
                    Some(self.target_scene.clone())
                };
                FadeFrame {
                    alpha: 1.0,
                    music_gain: self.fade_audio.then_some(0.0),
                    stop_music: false,
                    load_scene,
                }
            }
            FadePhase::Done => FadeFrame {
                alpha: 1.0,
                music_gain: None,
                stop_music: false,
                load_scene: None,
            },
            FadePhase::Entering => {
                self.elapsed += dt;
                let finished = self.elapsed >= self.duration;
                if finished {
                    self.phase = FadePhase::Idle;
                    self.elapsed = 0.0;
                }
                FadeFrame {
                    alpha: if finished {
                        0.0
                    } else {
                        interpolate(self.elapsed, self.duration, 1.0, 0.0)
                    },
                    music_gain: None,
                    stop_music: false,
                    load_scene: None,
                }
            }
        }
    }

    /// Start Clearing the Overlay From Black (Scene Start)
    pub fn enter(&mut self) {
        self.phase = FadePhase::Entering;
        self.elapsed = 0.0;
    }

    /// Back to Idle + Transparent (After the New Scene is Up)
    pub fn reset(&mut self) {
        self.phase = FadePhase::Idle;
        self.elapsed = 0.0;
    }
}

// ---------- Bevy Glue ----------

#[derive(Resource)]
pub struct PortalFade(pub SceneFade);

#[derive(Component)]
pub struct FadeOverlay;

#[derive(Component)]
pub struct Portal;

pub struct FadePlugin;

impl Plugin for FadePlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, spawn_fade_overlay)
            .add_systems(Update, (enter_on_scene_loaded, portal_fade).chain());
    }
}

fn spawn_fade_overlay(mut commands: Commands, config: Res<NightConfig>) {
    commands.insert_resource(PortalFade(SceneFade::from_config(&config)));

    commands.spawn((
        FadeOverlay,
        Node {
            position_type: PositionType::Absolute,
            width: Val::Percent(100.0),
            height: Val::Percent(100.0),
            ..default()
        },
        BackgroundColor(Color::BLACK),
        GlobalZIndex(OVERLAY_Z),
    ));

    // Portal Marker: Faint Pale Disc Where the Transition Triggers
    let portal = config.fade.portal_position * PIXELS_PER_UNIT;
    commands.spawn((
        Portal,
        Sprite::from_color(
            Color::srgba(0.75, 0.85, 1.0, 0.35),
            Vec2::splat(config.fade.trigger_distance * 2.0 * PIXELS_PER_UNIT),
        ),
        Transform::from_xyz(portal.x, portal.y, -1.0),
    ));
}

fn portal_fade(
    time: Res<Time>,
    config: Res<NightConfig>,
    mut fade: ResMut<PortalFade>,
    mut director: ResMut<MusicDirector>,
    q_player: Query<&Boat, With<Player>>,
    mut q_overlay: Query<&mut BackgroundColor, With<FadeOverlay>>,
    mut requests: MessageWriter<SceneLoadRequested>,
) {
    let anchor = q_player.iter().next().map(|boat| boat.0.position);
    fade.0.check_trigger(
        config.fade.portal_position,
        config.fade.trigger_distance,
        anchor,
    );

    let frame = fade.0.tick(time.delta_secs());

    for mut bg in q_overlay.iter_mut() {
        bg.0 = Color::srgba(0.0, 0.0, 0.0, frame.alpha);
    }

    if let Some(gain) = frame.music_gain {
        director.set_gain(gain);
    }
    if frame.stop_music {
        director.stop_now();
    }
    if let Some(name) = frame.load_scene {
        requests.write(SceneLoadRequested(SceneRequest::ByName(name)));
    }
}

fn enter_on_scene_loaded(mut loaded: MessageReader<SceneLoaded>, mut fade: ResMut<PortalFade>) {
    if loaded.read().last().is_some() {
        fade.0.enter();
    }
}
