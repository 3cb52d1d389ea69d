use anyhow::Result;
use clap::Parser;

use fractal_visualizer::app;
use fractal_visualizer::config::Config;

fn main() -> Result<()> {
    app::run(Config::parse())
}
