pub mod animation;
pub mod effects;
pub mod enemy;
pub mod geom;
pub mod physics;
pub mod player;
pub mod tile;
pub mod tilemap;
