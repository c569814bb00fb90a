/*
Nightglow - Night Pond Scene

Floating text: the opening caption and the signs around the pond.

Every fade is a restartable alpha tween owned by the caller and advanced one
delta per tick, so retargeting mid-fade starts from whatever alpha is showing.
*/
use bevy::prelude::*;

use crate::config::{CaptionConfig, NightConfig, ProximitySignConfig, WorldSignConfig};
use crate::player::{Boat, Player, PIXELS_PER_UNIT};
use crate::smoothing::interpolate;

/// Targets Closer Than This Do Not Restart a Fade
const RETARGET_EPSILON: f32 = 1e-4;
/// Out-of-View Signs Above This Alpha Get Faded Out
const VISIBLE_ALPHA: f32 = 0.01;
const SIGN_FONT_SIZE: f32 = 20.0;
const SIGN_Z: f32 = 5.0;
const SIGN_COLOR: Color = Color::srgb(0.95, 0.93, 0.78);
const CAPTION_COLOR: Color = Color::WHITE;

fn sanitize(dt: f32) -> f32 {
    if dt.is_finite() { dt.max(0.0) } else { 0.0 }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubtitleFade {
    alpha: f32,
    from: f32,
    target: f32,
    elapsed: f32,
    duration: f32,
}

impl SubtitleFade {
    /// Fully Transparent and at Rest
    pub fn hidden(duration: f32) -> Self {
        Self {
            alpha: 0.0,
            from: 0.0,
            target: 0.0,
            elapsed: 0.0,
            duration,
        }
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    pub fn target(&self) -> f32 {
        self.target
    }

    /// Head for `target` From the Current Alpha; Same Target Keeps Going
    pub fn fade_to(&mut self, target: f32) {
        let target = target.clamp(0.0, 1.0);
        if (target - self.target).abs() <= RETARGET_EPSILON {
            return;
        }
        self.from = self.alpha;
        self.target = target;
        self.elapsed = 0.0;
    }

    pub fn tick(&mut self, dt: f32) -> f32 {
        self.elapsed += sanitize(dt);
        self.alpha = if self.elapsed >= self.duration {
            self.target
        } else {
            interpolate(self.elapsed, self.duration, self.from, self.target)
        };
        self.alpha
    }
}

/// Fades Fully In on Entering Range, Out on Leaving
///
/// A sign too far from the camera is faded out regardless, and only a later
/// range crossing fades it back in.
#[derive(Debug, Clone)]
pub struct ProximitySubtitle {
    trigger_distance: f32,
    max_view_distance: f32,
    in_range: bool,
    fade: SubtitleFade,
}

impl ProximitySubtitle {
    pub fn new(trigger_distance: f32, max_view_distance: f32, fade_duration: f32) -> Self {
        Self {
            trigger_distance,
            max_view_distance,
            in_range: false,
            fade: SubtitleFade::hidden(fade_duration),
        }
    }

    pub fn from_config(config: &ProximitySignConfig) -> Self {
        Self::new(
            config.trigger_distance,
            config.max_view_distance,
            config.fade_duration,
        )
    }

    pub fn in_range(&self) -> bool {
        self.in_range
    }

    /// No Anchor Leaves the Current Fade Running Untouched
    pub fn update(&mut self, anchor_distance: Option<f32>, camera_distance: f32, dt: f32) -> f32 {
        if let Some(distance) = anchor_distance {
            let was_in_range = self.in_range;
            self.in_range = distance <= self.trigger_distance;

            if camera_distance > self.max_view_distance {
                if self.fade.alpha() > VISIBLE_ALPHA {
                    self.fade.fade_to(0.0);
                }
            } else if self.in_range != was_in_range {
                self.fade.fade_to(if self.in_range { 1.0 } else { 0.0 });
            }
        }
        self.fade.tick(dt)
    }
}

/// Opacity Grows Linearly as the Anchor Closes In, Zero Outside Range
#[derive(Debug, Clone)]
pub struct WorldSubtitle {
    trigger_distance: f32,
    fade: SubtitleFade,
}

impl WorldSubtitle {
    pub fn new(trigger_distance: f32, fade_duration: f32) -> Self {
        Self {
            trigger_distance,
            fade: SubtitleFade::hidden(fade_duration),
        }
    }

    pub fn from_config(config: &WorldSignConfig) -> Self {
        Self::new(config.trigger_distance, config.fade_duration)
    }

    pub fn target_for(&self, distance: f32) -> f32 {
        if distance <= self.trigger_distance && self.trigger_distance > 0.0 {
            1.0 - distance / self.trigger_distance
        } else {
            0.0
        }
    }

    pub fn update(&mut self, anchor_distance: Option<f32>, dt: f32) -> f32 {
        if let Some(distance) = anchor_distance {
            let target = self.target_for(distance);
            self.fade.fade_to(target);
        }
        self.fade.tick(dt)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptionPhase {
    FadingIn,
    Holding,
    FadingOut,
    Gone,
}

/// Opening Caption: Fade In, Hold, Fade Out, Then Gone for Good
///
/// Leaving `destroy_distance` of the origin cuts it short with a fade out
/// from whatever alpha is showing.
#[derive(Debug, Clone)]
pub struct StarterCaption {
    phase: CaptionPhase,
    elapsed: f32,
    alpha: f32,
    fade_out_from: f32,
    fade_in: f32,
    hold: f32,
    fade_out: f32,
    destroy_distance: f32,
    destroy_on_leave: bool,
}

impl StarterCaption {
    pub fn from_config(config: &CaptionConfig) -> Self {
        Self {
            phase: CaptionPhase::FadingIn,
            elapsed: 0.0,
            alpha: 0.0,
            fade_out_from: 1.0,
            fade_in: config.fade_in,
            hold: config.display_duration,
            fade_out: config.fade_out,
            destroy_distance: config.destroy_distance,
            destroy_on_leave: config.destroy_on_leave,
        }
    }

    pub fn phase(&self) -> CaptionPhase {
        self.phase
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    fn begin_fade_out(&mut self) {
        self.phase = CaptionPhase::FadingOut;
        self.fade_out_from = self.alpha;
        self.elapsed = 0.0;
    }

    /// `anchor_distance` is Measured From the Caption Origin
    pub fn update(&mut self, anchor_distance: Option<f32>, dt: f32) -> f32 {
        let dt = sanitize(dt);

        let left = anchor_distance.is_some_and(|d| d > self.destroy_distance);
        if self.destroy_on_leave
            && left
            && matches!(self.phase, CaptionPhase::FadingIn | CaptionPhase::Holding)
        {
            info!("Starter caption dismissed, boat left the start");
            self.begin_fade_out();
        }

        match self.phase {
            CaptionPhase::FadingIn => {
                self.elapsed += dt;
                if self.elapsed >= self.fade_in {
                    self.alpha = 1.0;
                    self.phase = CaptionPhase::Holding;
                    self.elapsed = 0.0;
                } else {
                    self.alpha = interpolate(self.elapsed, self.fade_in, 0.0, 1.0);
                }
            }
            CaptionPhase::Holding => {
                self.elapsed += dt;
                self.alpha = 1.0;
                if self.elapsed >= self.hold {
                    self.begin_fade_out();
                }
            }
            CaptionPhase::FadingOut => {
                self.elapsed += dt;
                if self.elapsed >= self.fade_out {
                    self.alpha = 0.0;
                    self.phase = CaptionPhase::Gone;
                    debug!("Starter caption gone");
                } else {
                    self.alpha = interpolate(self.elapsed, self.fade_out, self.fade_out_from, 0.0);
                }
            }
            CaptionPhase::Gone => self.alpha = 0.0,
        }
        self.alpha
    }
}

// ---------- Bevy Glue ----------

#[derive(Component)]
pub struct ProximitySign {
    pub position: Vec2,
    pub logic: ProximitySubtitle,
}

#[derive(Component)]
pub struct WorldSign {
    pub position: Vec2,
    pub logic: WorldSubtitle,
}

#[derive(Component)]
pub struct Caption {
    pub origin: Vec2,
    pub logic: StarterCaption,
}

#[derive(Component)]
pub struct CaptionText;

pub struct SubtitlePlugin;

impl Plugin for SubtitlePlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, spawn_subtitles)
            .add_systems(Update, (fade_signs, fade_caption));
    }
}

fn sign_bundle(text: &str, position: Vec2) -> impl Bundle {
    let px = position * PIXELS_PER_UNIT;
    (
        Text2d::new(text),
        TextFont {
            font_size: SIGN_FONT_SIZE,
            ..default()
        },
        TextColor(SIGN_COLOR.with_alpha(0.0)),
        Transform::from_xyz(px.x, px.y, SIGN_Z),
    )
}

fn spawn_subtitles(mut commands: Commands, config: Res<NightConfig>) {
    let subtitles = &config.subtitles;

    for sign in &subtitles.proximity_signs {
        commands.spawn((
            ProximitySign {
                position: sign.position,
                logic: ProximitySubtitle::from_config(sign),
            },
            sign_bundle(&sign.text, sign.position),
        ));
    }

    for sign in &subtitles.world_signs {
        commands.spawn((
            WorldSign {
                position: sign.position,
                logic: WorldSubtitle::from_config(sign),
            },
            sign_bundle(&sign.text, sign.position),
        ));
    }

    let Some(caption) = &subtitles.caption else {
        return;
    };
    commands
        .spawn((
            Caption {
                origin: caption.origin,
                logic: StarterCaption::from_config(caption),
            },
            Node {
                position_type: PositionType::Absolute,
                bottom: Val::Px(caption.bottom_offset),
                width: Val::Percent(100.0),
                justify_content: JustifyContent::Center,
                ..default()
            },
        ))
        .with_children(|ui| {
            ui.spawn((
                CaptionText,
                Text::new(caption.text.clone()),
                TextFont {
                    font_size: caption.font_size,
                    ..default()
                },
                TextColor(CAPTION_COLOR.with_alpha(0.0)),
            ));
        });
}

fn fade_signs(
    time: Res<Time>,
    q_player: Query<&Boat, With<Player>>,
    q_camera: Query<&Transform, With<Camera2d>>,
    mut q_proximity: Query<(&mut ProximitySign, &mut TextColor), Without<WorldSign>>,
    mut q_world: Query<(&mut WorldSign, &mut TextColor), Without<ProximitySign>>,
) {
    let dt = time.delta_secs();
    let anchor = q_player.iter().next().map(|boat| boat.0.position);
    let camera = q_camera
        .iter()
        .next()
        .map(|t| t.translation.truncate() / PIXELS_PER_UNIT);

    for (mut sign, mut color) in q_proximity.iter_mut() {
        let position = sign.position;
        // Without a Camera Nothing is Out of View
        let camera_distance = camera.map_or(0.0, |c| c.distance(position));
        let alpha = sign
            .logic
            .update(anchor.map(|a| a.distance(position)), camera_distance, dt);
        color.0 = SIGN_COLOR.with_alpha(alpha);
    }

    for (mut sign, mut color) in q_world.iter_mut() {
        let position = sign.position;
        let alpha = sign.logic.update(anchor.map(|a| a.distance(position)), dt);
        color.0 = SIGN_COLOR.with_alpha(alpha);
    }
}

fn fade_caption(
    mut commands: Commands,
    time: Res<Time>,
    q_player: Query<&Boat, With<Player>>,
    mut q_caption: Query<(Entity, &mut Caption)>,
    mut q_text: Query<&mut TextColor, With<CaptionText>>,
) {
    let anchor = q_player.iter().next().map(|boat| boat.0.position);

    for (entity, mut caption) in q_caption.iter_mut() {
        let origin = caption.origin;
        let alpha = caption
            .logic
            .update(anchor.map(|a| a.distance(origin)), time.delta_secs());

        if caption.logic.phase() == CaptionPhase::Gone {
            commands.entity(entity).despawn();
            continue;
        }
        for mut color in q_text.iter_mut() {
            color.0 = CAPTION_COLOR.with_alpha(alpha);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caption() -> CaptionConfig {
        CaptionConfig {
            fade_in: 1.0,
            display_duration: 2.0,
            fade_out: 1.0,
            destroy_distance: 8.0,
            destroy_on_leave: true,
            ..CaptionConfig::default()
        }
    }

    #[test]
    fn test_fade_reaches_target_over_duration() {
        let mut fade = SubtitleFade::hidden(1.0);
        fade.fade_to(1.0);
        assert!((fade.tick(0.25) - 0.25).abs() < 1e-5);
        assert!((fade.tick(0.25) - 0.5).abs() < 1e-5);
        assert_eq!(fade.tick(1.0), 1.0);
        assert_eq!(fade.tick(1.0), 1.0);
    }

    #[test]
    fn test_retarget_starts_from_current_alpha() {
        let mut fade = SubtitleFade::hidden(1.0);
        fade.fade_to(1.0);
        fade.tick(0.5);
        fade.fade_to(0.0);
        assert!((fade.tick(0.0) - 0.5).abs() < 1e-5);
        assert!((fade.tick(0.5) - 0.25).abs() < 1e-5);
        assert_eq!(fade.tick(0.5), 0.0);
    }

    #[test]
    fn test_same_target_does_not_restart() {
        let mut fade = SubtitleFade::hidden(1.0);
        fade.fade_to(1.0);
        fade.tick(0.5);
        fade.fade_to(1.0);
        assert!((fade.tick(0.25) - 0.75).abs() < 1e-5);
    }

    #[test]
    fn test_proximity_fades_in_and_out_with_range() {
        let mut sign = ProximitySubtitle::new(3.0, 12.0, 1.0);
        assert_eq!(sign.update(Some(5.0), 0.0, 0.5), 0.0);

        sign.update(Some(2.0), 0.0, 0.5);
        assert!(sign.in_range());
        let mut alpha = 0.0;
        for _ in 0..4 {
            alpha = sign.update(Some(2.0), 0.0, 0.5);
        }
        assert_eq!(alpha, 1.0);

        sign.update(Some(4.0), 0.0, 0.5);
        assert!(!sign.in_range());
        for _ in 0..4 {
            alpha = sign.update(Some(4.0), 0.0, 0.5);
        }
        assert_eq!(alpha, 0.0);
    }

    #[test]
    fn test_proximity_hides_past_view_distance() {
        let mut sign = ProximitySubtitle::new(3.0, 12.0, 1.0);
        for _ in 0..4 {
            sign.update(Some(1.0), 0.0, 0.5);
        }
        assert_eq!(sign.update(Some(1.0), 0.0, 0.0), 1.0);

        let mut alpha = 1.0;
        for _ in 0..4 {
            alpha = sign.update(Some(1.0), 20.0, 0.5);
        }
        assert_eq!(alpha, 0.0);
        assert!(sign.in_range());
    }

    #[test]
    fn test_proximity_without_anchor_keeps_fading() {
        let mut sign = ProximitySubtitle::new(3.0, 12.0, 1.0);
        sign.update(Some(1.0), 0.0, 0.5);
        let a = sign.update(None, 0.0, 0.25);
        let b = sign.update(None, 0.0, 0.25);
        assert!(b > a);
    }

    #[test]
    fn test_world_sign_is_clearer_up_close() {
        let sign = WorldSubtitle::new(4.0, 1.0);
        assert_eq!(sign.target_for(0.0), 1.0);
        assert!((sign.target_for(1.0) - 0.75).abs() < 1e-5);
        assert_eq!(sign.target_for(4.0), 0.0);
        assert_eq!(sign.target_for(9.0), 0.0);
    }

    #[test]
    fn test_world_sign_settles_on_distance_opacity() {
        let mut sign = WorldSubtitle::new(4.0, 0.5);
        let mut alpha = 0.0;
        for _ in 0..10 {
            alpha = sign.update(Some(2.0), 0.1);
        }
        assert!((alpha - 0.5).abs() < 1e-5);

        for _ in 0..10 {
            alpha = sign.update(Some(6.0), 0.1);
        }
        assert_eq!(alpha, 0.0);
    }

    #[test]
    fn test_caption_runs_its_course() {
        let mut c = StarterCaption::from_config(&caption());
        assert!((c.update(Some(0.0), 0.5) - 0.5).abs() < 1e-5);
        assert_eq!(c.phase(), CaptionPhase::FadingIn);

        c.update(Some(0.0), 0.5);
        assert_eq!(c.phase(), CaptionPhase::Holding);
        assert_eq!(c.alpha(), 1.0);

        c.update(Some(0.0), 1.0);
        assert_eq!(c.phase(), CaptionPhase::Holding);
        c.update(Some(0.0), 1.0);
        assert_eq!(c.phase(), CaptionPhase::FadingOut);

        assert!((c.update(Some(0.0), 0.5) - 0.5).abs() < 1e-5);
        assert_eq!(c.update(Some(0.0), 0.5), 0.0);
        assert_eq!(c.phase(), CaptionPhase::Gone);
        assert_eq!(c.update(Some(0.0), 1.0), 0.0);
    }

    #[test]
    fn test_caption_dismissed_when_boat_leaves() {
        let mut c = StarterCaption::from_config(&caption());
        c.update(Some(0.0), 0.5);
        let alpha = c.update(Some(9.0), 0.25);
        assert_eq!(c.phase(), CaptionPhase::FadingOut);
        // Fading Out From the Half-Faded-In Alpha
        assert!((alpha - 0.375).abs() < 1e-5);

        c.update(Some(9.0), 1.0);
        assert_eq!(c.phase(), CaptionPhase::Gone);
    }

    #[test]
    fn test_caption_stays_when_leaving_is_allowed() {
        let mut c = StarterCaption::from_config(&CaptionConfig {
            destroy_on_leave: false,
            ..caption()
        });
        c.update(Some(0.0), 1.0);
        c.update(Some(50.0), 0.5);
        assert_eq!(c.phase(), CaptionPhase::Holding);
    }

    #[test]
    fn test_caption_zero_durations_finish_promptly() {
        let mut c = StarterCaption::from_config(&CaptionConfig {
            fade_in: 0.0,
            display_duration: 0.0,
            fade_out: 0.0,
            ..caption()
        });
        assert_eq!(c.update(None, 0.0), 1.0);
        c.update(None, 0.0);
        assert_eq!(c.phase(), CaptionPhase::FadingOut);
        c.update(None, 0.0);
        assert_eq!(c.phase(), CaptionPhase::Gone);
    }
}
