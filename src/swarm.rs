/*
Nightglow - Night Pond Scene
*/
use bevy::log::info;
use bevy::math::Vec2;

use crate::companion::{Anchor, CompanionEntity, CompanionOutput, CompanionState, FrameTime};
use crate::config::{ConfigError, SwarmConfig};
use crate::random::{CoherentNoise, NoiseSource};

/// Injected Source of the Tracked Anchor
/// `None` Means the Anchor Doesn't Exist (Yet); the Swarm Just Roams
pub trait AnchorProvider {
    fn anchor(&self) -> Option<Anchor>;
}

impl AnchorProvider for Anchor {
    fn anchor(&self) -> Option<Anchor> {
        Some(*self)
    }
}

impl AnchorProvider for Option<Anchor> {
    fn anchor(&self) -> Option<Anchor> {
        *self
    }
}

/// Anchor Provider for Hosts Without One
pub struct NoAnchor;

impl AnchorProvider for NoAnchor {
    fn anchor(&self) -> Option<Anchor> {
        None
    }
}

/// Fixed Pool of Companions Sharing One Config and One Noise Field
pub struct CompanionSwarm<N: NoiseSource = CoherentNoise> {
    config: SwarmConfig,
    entities: Vec<CompanionEntity>,
    noise: N,
}

impl CompanionSwarm<CoherentNoise> {
    pub fn new(config: SwarmConfig) -> Result<Self, ConfigError> {
        // Noise Seed Only Needs to be Stable per Swarm Seed
        let noise = CoherentNoise::with_seed(config.seed as i32);
        Self::with_noise(config, noise)
    }
}

impl<N: NoiseSource> CompanionSwarm<N> {
    pub fn with_noise(config: SwarmConfig, noise: N) -> Result<Self, ConfigError> {
        config.validate()?;

        let entities = (0..config.count)
            .map(|i| CompanionEntity::spawn(i, &config))
            .collect();

        info!("Spawned swarm of {} fireflies (seed {})", config.count, config.seed);

        Ok(Self { config, entities, noise })
    }

    pub fn config(&self) -> &SwarmConfig {
        &self.config
    }

    pub fn entities(&self) -> &[CompanionEntity] {
        &self.entities
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Advance Every Companion One Tick
    /// The Anchor is Read Once so All Companions See the Same Snapshot
    pub fn tick<A: AnchorProvider + ?Sized>(&mut self, anchor: &A, frame: FrameTime) {
        let snapshot = anchor.anchor();
        for entity in &mut self.entities {
            entity.step(&self.config, snapshot, frame, &self.noise);
        }
    }

    /// Same as [`Self::tick`] but Visiting Companions in `order`
    /// Indices Out of Range are Skipped
    pub fn tick_in_order<A: AnchorProvider + ?Sized>(
        &mut self,
        anchor: &A,
        frame: FrameTime,
        order: &[usize],
    ) {
        let snapshot = anchor.anchor();
        for &i in order {
            if let Some(entity) = self.entities.get_mut(i) {
                entity.step(&self.config, snapshot, frame, &self.noise);
            }
        }
    }

    pub fn outputs(&self) -> impl Iterator<Item = CompanionOutput> + '_ {
        self.entities.iter().map(CompanionEntity::output)
    }

    pub fn count_in(&self, state: CompanionState) -> usize {
        self.entities.iter().filter(|e| e.state == state).count()
    }

    /// Reposition a Companion (Scripted Scenes / Tests)
    pub fn place(&mut self, index: usize, position: Vec2) {
        if let Some(entity) = self.entities.get_mut(index) {
            entity.position = position;
            entity.target_position = position;
        }
    }
}
