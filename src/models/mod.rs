pub mod camera;
pub mod details;
pub mod discord;
pub mod incident;
