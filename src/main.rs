use log::info;
use torus_life::{LifeApp, LifeConfig};

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = LifeConfig::from_env()?;
    info!(
        "Starting {} ({} backend, {}px cells)",
        config.window_title, config.backend, config.cell_size
    );

    LifeApp::new(config)?.run()
}
