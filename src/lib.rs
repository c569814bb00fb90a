/*
Nightglow - Night Pond Scene
*/
pub mod audio;
pub mod camera;
pub mod companion;
pub mod config;
pub mod fade;
pub mod fireflies;
pub mod player;
pub mod random;
pub mod ripple;
pub mod scene;
pub mod smoothing;
pub mod subtitle;
pub mod swarm;
