pub mod app;
pub mod audio;
pub mod config;
pub mod encoder;
pub mod features;
pub mod fractal;
pub mod motion;
pub mod pipeline;
pub mod presets;
