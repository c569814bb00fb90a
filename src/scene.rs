/*
Nightglow - Night Pond Scene
*/
use bevy::prelude::*;

use crate::audio::MusicDirector;
use crate::config::NightConfig;
use crate::player::{Boat, Player};
use crate::ripple::RippleBoat;

/// Camera Clear Color for the Night Pond
pub const NIGHT_COLOR: Color = Color::srgb(0.141, 0.188, 0.298);
pub const DAWN_COLOR: Color = Color::srgb(0.86, 0.64, 0.55);

pub const NEXT_SCENE_KEY: KeyCode = KeyCode::KeyN;

/// Scenes in Load Order; the Index Picks the Music Track
pub const SCENES: [&str; 2] = ["night_pond", "dawn"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SceneRequest {
    ByName(String),
    ByIndex(usize),
}

#[derive(Debug, Clone, Message)]
pub struct SceneLoadRequested(pub SceneRequest);

#[derive(Debug, Clone, Message)]
pub struct SceneLoaded {
    pub index: usize,
    pub name: String,
}

#[derive(Resource, Debug, Clone)]
pub struct SceneDirector {
    names: Vec<String>,
    current: usize,
}

impl Default for SceneDirector {
    fn default() -> Self {
        Self::new(SCENES.iter().map(|s| s.to_string()).collect())
    }
}

impl SceneDirector {
    pub fn new(names: Vec<String>) -> Self {
        Self { names, current: 0 }
    }

    pub fn current(&self) -> usize {
        self.current
    }

    pub fn name(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }

    pub fn resolve(&self, request: &SceneRequest) -> Option<usize> {
        match request {
            SceneRequest::ByName(name) => self.names.iter().position(|n| n == name),
            SceneRequest::ByIndex(i) => (*i < self.names.len()).then_some(*i),
        }
    }

    /// Index After the Current One, Wrapping
    pub fn next(&self) -> usize {
        if self.names.is_empty() {
            0
        } else {
            (self.current + 1) % self.names.len()
        }
    }

    /// Switch to `request`; `None` if No Such Scene
    pub fn load(&mut self, request: &SceneRequest) -> Option<SceneLoaded> {
        let index = self.resolve(request)?;
        self.current = index;
        Some(SceneLoaded {
            index,
            name: self.names[index].clone(),
        })
    }
}

pub fn clear_color_for(index: usize) -> Color {
    match index {
        0 => NIGHT_COLOR,
        _ => DAWN_COLOR,
    }
}

pub struct SceneFlowPlugin;

impl Plugin for SceneFlowPlugin {
    fn build(&self, app: &mut App) {
        app.add_message::<SceneLoadRequested>()
            .add_message::<SceneLoaded>()
            .init_resource::<SceneDirector>()
            .insert_resource(ClearColor(NIGHT_COLOR))
            .add_systems(Startup, announce_first_scene)
            .add_systems(Update, (next_scene_hotkey, load_requested_scenes));
    }
}

fn announce_first_scene(director: Res<SceneDirector>, mut loaded: MessageWriter<SceneLoaded>) {
    let index = director.current();
    let name = director.name(index).unwrap_or_default().to_string();
    info!("Entering scene {name}");
    loaded.write(SceneLoaded { index, name });
}

/// Debug: Fade the Music Out and Move On to the Next Scene
fn next_scene_hotkey(
    keys: Res<ButtonInput<KeyCode>>,
    scenes: Res<SceneDirector>,
    mut music: ResMut<MusicDirector>,
) {
    if keys.just_pressed(NEXT_SCENE_KEY) {
        music.load_scene_with_fade(SceneRequest::ByIndex(scenes.next()));
    }
}

fn load_requested_scenes(
    config: Res<NightConfig>,
    mut requests: MessageReader<SceneLoadRequested>,
    mut director: ResMut<SceneDirector>,
    mut clear: ResMut<ClearColor>,
    mut q_boat: Query<&mut Boat, With<Player>>,
    mut loaded: MessageWriter<SceneLoaded>,
) {
    for SceneLoadRequested(request) in requests.read() {
        let Some(ev) = director.load(request) else {
            error!("No scene matches {request:?}");
            continue;
        };
        info!("Entering scene {}", ev.name);

        clear.0 = clear_color_for(ev.index);
        for mut boat in q_boat.iter_mut() {
            boat.0 = RippleBoat::new(config.boat.start_position);
        }
        loaded.write(ev);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_by_name_and_index() {
        let d = SceneDirector::default();
        assert_eq!(d.resolve(&SceneRequest::ByName("dawn".into())), Some(1));
        assert_eq!(d.resolve(&SceneRequest::ByIndex(0)), Some(0));
        assert_eq!(d.resolve(&SceneRequest::ByName("noon".into())), None);
        assert_eq!(d.resolve(&SceneRequest::ByIndex(5)), None);
    }

    #[test]
    fn test_load_moves_current() {
        let mut d = SceneDirector::default();
        let ev = d.load(&SceneRequest::ByName("dawn".into()));
        assert_eq!(ev.map(|e| (e.index, e.name)), Some((1, "dawn".to_string())));
        assert_eq!(d.current(), 1);
        assert_eq!(d.next(), 0);
    }

    #[test]
    fn test_unknown_scene_keeps_current() {
        let mut d = SceneDirector::default();
        assert!(d.load(&SceneRequest::ByIndex(9)).is_none());
        assert_eq!(d.current(), 0);
    }

    #[test]
    fn test_portal_target_is_a_known_scene() {
        let config = NightConfig::default();
        let d = SceneDirector::default();
        assert!(d.resolve(&SceneRequest::ByName(config.fade.target_scene)).is_some());
    }
}
