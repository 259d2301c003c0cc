pub mod geo;
pub mod loader;
pub mod markers;
pub mod models;
pub mod nearest;
pub mod state;
