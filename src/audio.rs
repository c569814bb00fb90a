/*
Nightglow - Night Pond Scene
*/
use bevy::prelude::*;
use bevy::audio::{
	AudioPlayer,
	AudioSinkPlayback,
	AudioSource,
	PlaybackSettings,
	Volume,
};
use std::collections::HashMap;
use rand::RngExt;

use crate::config::{MusicConfig, NightConfig};
use crate::scene::{SceneLoadRequested, SceneLoaded, SceneRequest};
use crate::smoothing::interpolate;

// ---------- Sound Effects ----------

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SfxKind {
    RippleSplash,
    BoatBump,
}

#[derive(Clone, Copy, Debug, Message)]
pub struct PlaySfx {
    pub kind: SfxKind,
    pub pos: Vec3,
}

#[derive(Resource, Default)]
pub struct SfxLibrary {
    pub map: HashMap<SfxKind, Vec<Handle<AudioSource>>>,
}

impl SfxLibrary {
    pub fn insert_one(&mut self, k: SfxKind, h: Handle<AudioSource>) {
        self.map.entry(k).or_default().push(h);
    }
}

pub fn setup_audio(mut commands: Commands, asset_server: Res<AssetServer>) {
    let mut lib = SfxLibrary::default();

    // Several Splashes so Repeated Clicks Don't Sound Identical
    lib.insert_one(SfxKind::RippleSplash, asset_server.load("sounds/sfx/ripple_0.ogg"));
    lib.insert_one(SfxKind::RippleSplash, asset_server.load("sounds/sfx/ripple_1.ogg"));
    lib.insert_one(SfxKind::RippleSplash, asset_server.load("sounds/sfx/ripple_2.ogg"));
    lib.insert_one(SfxKind::BoatBump, asset_server.load("sounds/sfx/boat_bump.ogg"));

    commands.insert_resource(lib);
}

pub fn play_sfx_events(
    lib: Res<SfxLibrary>,
    mut commands: Commands,
    mut ev: MessageReader<PlaySfx>,
) {
    for e in ev.read() {
        let Some(list) = lib.map.get(&e.kind) else {
            warn!("Missing SFX for {:?}", e.kind);
            continue;
        };
        if list.is_empty() {
            continue;
        }

        let i = rand::rng().random_range(0..list.len());
        let clip = list[i].clone();

        let volume = match e.kind {
            SfxKind::RippleSplash => 0.6,
            SfxKind::BoatBump => 0.9,
        };

        commands.spawn((
            Transform::from_translation(e.pos),
            AudioPlayer::new(clip),
            PlaybackSettings::DESPAWN.with_volume(Volume::Linear(volume)),
        ));
    }
}

// ---------- Background Music ----------

/// Marker Component: the Background Music Entity
#[derive(Component)]
pub struct MusicTrack;

/// What the Host Should Do With the Music Player
#[derive(Debug, Clone, PartialEq)]
pub enum MusicCommand {
    Play(String),
    Stop,
    LoadScene(SceneRequest),
}

/// What Happens Once a Fade Out Completes
#[derive(Debug, Clone, PartialEq)]
enum AfterFadeOut {
    Nothing,
    Switch(String),
    Load(SceneRequest),
}

#[derive(Debug, Clone, PartialEq)]
enum MusicPhase {
    Steady,
    FadingOut { elapsed: f32, from: f32, then: AfterFadeOut },
    FadingIn { elapsed: f32, from: f32 },
}

/// Per-Scene Background Music With Fades
///
/// Survives scene loads. Each call to [`MusicDirector::tick`] advances the
/// current fade and returns the player commands for that tick; the volume to
/// apply is read back through [`MusicDirector::volume`].
#[derive(Resource, Debug, Clone)]
pub struct MusicDirector {
    tracks: Vec<String>,
    fade_duration: f32,
    target_volume: f32,
    current: Option<String>,
    playing: bool,
    volume: f32,
    /// External Multiplier (Portal Fade)
    gain: f32,
    phase: MusicPhase,
    pending: Vec<MusicCommand>,
}

impl MusicDirector {
    pub fn new(config: &MusicConfig) -> Self {
        Self {
            tracks: config.tracks.clone(),
            fade_duration: config.fade_duration,
            target_volume: config.target_volume,
            current: None,
            playing: false,
            volume: 0.0,
            gain: 1.0,
            phase: MusicPhase::Steady,
            pending: Vec::new(),
        }
    }

    pub fn current_track(&self) -> Option<&str> {
        self.current.as_deref()
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// Effective Sink Volume (Fade Volume Times External Gain)
    pub fn volume(&self) -> f32 {
        self.volume * self.gain
    }

    pub fn set_gain(&mut self, gain: f32) {
        self.gain = if gain.is_finite() { gain.clamp(0.0, 1.0) } else { 0.0 };
    }

    /// Track for a Scene Index; Falls Back to the First Track
    pub fn track_for_scene(&self, index: usize) -> Option<&str> {
        self.tracks
            .get(index)
            .or_else(|| self.tracks.first())
            .map(String::as_str)
    }

    pub fn on_scene_loaded(&mut self, index: usize) {
        info!("Scene {index} loaded");
        self.gain = 1.0;
        match self.track_for_scene(index).map(str::to_owned) {
            Some(track) => self.crossfade_to(track),
            None => self.fade_out(AfterFadeOut::Nothing),
        }
    }

    /// Fade the Music Out, Then Ask the Host to Load `request`
    pub fn load_scene_with_fade(&mut self, request: SceneRequest) {
        info!("Starting scene switch -> {request:?}");
        self.fade_out(AfterFadeOut::Load(request));
    }

    pub fn crossfade_to(&mut self, track: String) {
        if self.playing && self.current.as_deref() == Some(track.as_str()) {
            debug!("Already playing {track}, no switch needed");
            return;
        }
        if self.playing {
            self.fade_out(AfterFadeOut::Switch(track));
        } else {
            self.start(track);
        }
    }

    /// Cut the Music Immediately
    pub fn stop_now(&mut self) {
        if self.playing {
            self.pending.push(MusicCommand::Stop);
        }
        self.playing = false;
        self.volume = 0.0;
        self.phase = MusicPhase::Steady;
    }

    pub fn tick(&mut self, dt: f32) -> Vec<MusicCommand> {
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };

        match std::mem::replace(&mut self.phase, MusicPhase::Steady) {
            MusicPhase::Steady => {}
            MusicPhase::FadingIn { elapsed, from } => {
                let elapsed = elapsed + dt;
                if elapsed >= self.fade_duration {
                    self.volume = self.target_volume;
                    debug!("Music fade in done");
                } else {
                    self.volume = interpolate(elapsed, self.fade_duration, from, self.target_volume);
                    self.phase = MusicPhase::FadingIn { elapsed, from };
                }
            }
            MusicPhase::FadingOut { elapsed, from, then } => {
                let elapsed = elapsed + dt;
                if elapsed >= self.fade_duration {
                    self.volume = 0.0;
                    self.playing = false;
                    self.pending.push(MusicCommand::Stop);
                    debug!("Music fade out done");
                    self.finish_fade_out(then);
                } else {
                    self.volume = interpolate(elapsed, self.fade_duration, from, 0.0);
                    self.phase = MusicPhase::FadingOut { elapsed, from, then };
                }
            }
        }

        std::mem::take(&mut self.pending)
    }

    fn start(&mut self, track: String) {
        debug!("Music fade in: {track}");
        self.pending.push(MusicCommand::Play(track.clone()));
        self.current = Some(track);
        self.playing = true;
        self.volume = 0.0;
        self.phase = MusicPhase::FadingIn { elapsed: 0.0, from: 0.0 };
    }

    fn fade_out(&mut self, then: AfterFadeOut) {
        if !self.playing {
            // Nothing Audible to Fade
            self.finish_fade_out(then);
            return;
        }
        self.phase = MusicPhase::FadingOut { elapsed: 0.0, from: self.volume, then };
    }

    fn finish_fade_out(&mut self, then: AfterFadeOut) {
        match then {
            AfterFadeOut::Nothing => {}
            AfterFadeOut::Switch(track) => self.start(track),
            AfterFadeOut::Load(request) => self.pending.push(MusicCommand::LoadScene(request)),
        }
    }
}

// ---------- Bevy Glue ----------

pub struct NightAudioPlugin;

impl Plugin for NightAudioPlugin {
    fn build(&self, app: &mut App) {
        app.add_message::<PlaySfx>()
            .add_systems(Startup, (setup_audio, setup_music_director))
            .add_systems(
                Update,
                (music_on_scene_loaded, drive_music, play_sfx_events).chain(),
            );
    }
}

fn setup_music_director(mut commands: Commands, config: Res<NightConfig>) {
    commands.insert_resource(MusicDirector::new(&config.music));
}

fn music_on_scene_loaded(
    mut loaded: MessageReader<SceneLoaded>,
    mut director: ResMut<MusicDirector>,
) {
    for ev in loaded.read() {
        director.on_scene_loaded(ev.index);
    }
}

fn drive_music(
    time: Res<Time>,
    asset_server: Res<AssetServer>,
    mut commands: Commands,
    mut director: ResMut<MusicDirector>,
    q_music: Query<Entity, With<MusicTrack>>,
    mut q_sinks: Query<&mut AudioSink, With<MusicTrack>>,
    mut requests: MessageWriter<SceneLoadRequested>,
) {
    for cmd in director.tick(time.delta_secs()) {
        match cmd {
            MusicCommand::Play(path) => {
                for e in q_music.iter() {
                    commands.entity(e).despawn();
                }
                commands.spawn((
                    MusicTrack,
                    AudioPlayer::<AudioSource>::new(asset_server.load(path)),
                    PlaybackSettings::LOOP.with_volume(Volume::Linear(0.0)),
                ));
            }
            MusicCommand::Stop => {
                for e in q_music.iter() {
                    commands.entity(e).despawn();
                }
            }
            MusicCommand::LoadScene(request) => {
                requests.write(SceneLoadRequested(request));
            }
        }
    }

    let volume = Volume::Linear(director.volume());
    for mut sink in q_sinks.iter_mut() {
        sink.set_volume(volume);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn director() -> MusicDirector {
        MusicDirector::new(&MusicConfig {
            tracks: vec!["night.ogg".into(), "dawn.ogg".into()],
            fade_duration: 1.0,
            target_volume: 0.8,
        })
    }

    fn run(d: &mut MusicDirector, seconds: f32) -> Vec<MusicCommand> {
        let mut out = Vec::new();
        let steps = (seconds / 0.1).round() as usize;
        for _ in 0..steps {
            out.extend(d.tick(0.1));
        }
        out
    }

    #[test]
    fn test_first_scene_fades_music_in() {
        let mut d = director();
        d.on_scene_loaded(0);
        let cmds = d.tick(0.5);
        assert_eq!(cmds, vec![MusicCommand::Play("night.ogg".into())]);
        assert!((d.volume() - 0.4).abs() < 1e-5);

        run(&mut d, 1.0);
        assert!((d.volume() - 0.8).abs() < 1e-5);
        assert_eq!(d.current_track(), Some("night.ogg"));
    }

    #[test]
    fn test_same_track_is_not_restarted() {
        let mut d = director();
        d.on_scene_loaded(0);
        run(&mut d, 2.0);
        d.on_scene_loaded(0);
        assert!(run(&mut d, 2.0).is_empty());
        assert!((d.volume() - 0.8).abs() < 1e-5);
    }

    #[test]
    fn test_crossfade_fades_out_then_switches() {
        let mut d = director();
        d.on_scene_loaded(0);
        run(&mut d, 2.0);

        d.on_scene_loaded(1);
        let cmds = d.tick(0.5);
        assert!(cmds.is_empty());
        assert!((d.volume() - 0.4).abs() < 1e-5);

        let cmds = run(&mut d, 0.6);
        assert_eq!(
            cmds,
            vec![MusicCommand::Stop, MusicCommand::Play("dawn.ogg".into())]
        );
        run(&mut d, 2.0);
        assert_eq!(d.current_track(), Some("dawn.ogg"));
        assert!((d.volume() - 0.8).abs() < 1e-5);
    }

    #[test]
    fn test_unknown_scene_uses_first_track() {
        let d = director();
        assert_eq!(d.track_for_scene(7), Some("night.ogg"));
    }

    #[test]
    fn test_no_tracks_fades_out() {
        let mut d = MusicDirector::new(&MusicConfig {
            tracks: Vec::new(),
            ..MusicConfig::default()
        });
        d.on_scene_loaded(0);
        assert!(d.tick(0.1).is_empty());
        assert!(!d.is_playing());
    }

    #[test]
    fn test_load_with_fade_waits_for_silence() {
        let mut d = director();
        d.on_scene_loaded(0);
        run(&mut d, 2.0);

        d.load_scene_with_fade(SceneRequest::ByIndex(1));
        assert!(d.tick(0.5).is_empty());
        let cmds = run(&mut d, 0.6);
        assert_eq!(
            cmds,
            vec![MusicCommand::Stop, MusicCommand::LoadScene(SceneRequest::ByIndex(1))]
        );
        assert_eq!(d.volume(), 0.0);
    }

    #[test]
    fn test_load_with_fade_when_silent_is_immediate() {
        let mut d = director();
        d.load_scene_with_fade(SceneRequest::ByName("dawn".into()));
        assert_eq!(
            d.tick(0.0),
            vec![MusicCommand::LoadScene(SceneRequest::ByName("dawn".into()))]
        );
    }

    #[test]
    fn test_gain_scales_volume_and_resets_on_load() {
        let mut d = director();
        d.on_scene_loaded(0);
        run(&mut d, 2.0);
        d.set_gain(0.5);
        assert!((d.volume() - 0.4).abs() < 1e-5);
        d.on_scene_loaded(0);
        assert!((d.volume() - 0.8).abs() < 1e-5);
    }

    #[test]
    fn test_stop_now_silences() {
        let mut d = director();
        d.on_scene_loaded(0);
        run(&mut d, 2.0);
        d.stop_now();
        assert_eq!(d.tick(0.1), vec![MusicCommand::Stop]);
        assert!(!d.is_playing());
        assert_eq!(d.volume(), 0.0);
    }
}
