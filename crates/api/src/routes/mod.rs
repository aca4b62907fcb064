pub mod camera;
pub mod emotion;
