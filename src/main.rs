/*
Nightglow - Night Pond Scene
*/
use bevy::log::{Level, LogPlugin};
use bevy::prelude::*;
use glowlib::audio::NightAudioPlugin;
use glowlib::camera::CameraFollowPlugin;
use glowlib::config::NightConfig;
use glowlib::fade::FadePlugin;
use glowlib::fireflies::FireflyPlugin;
use glowlib::player::BoatPlugin;
use glowlib::scene::SceneFlowPlugin;
use glowlib::subtitle::SubtitlePlugin;

fn main() {
    let mut app = App::new();
    app.add_plugins(
        DefaultPlugins
            .set(WindowPlugin {
                primary_window: Some(Window {
                    title: "Nightglow".into(),
                    resolution: (1280, 720).into(),
                    ..default()
                }),
                ..default()
            })
            .set(LogPlugin {
                level: Level::INFO,
                filter: "wgpu=error,naga=warn,glowlib=debug".into(),
                ..default()
            }),
    );

    // Logging is Up by Now, so Config Warnings Reach the Console
    app.insert_resource(NightConfig::load())
        .add_plugins((
            SceneFlowPlugin,
            NightAudioPlugin,
            BoatPlugin,
            CameraFollowPlugin,
            FireflyPlugin,
            FadePlugin,
            SubtitlePlugin,
        ))
        .run();
}
