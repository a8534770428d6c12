//! Lumen Script Runner
//!
//! Loads a saved node script, runs it for a number of ticks and logs each
//! result. The script can be written back out, which normalizes the record
//! and drops nodes whose types are no longer registered.
//!
//! Run with: cargo run -p lumen_runner -- scripts/dimmer.json
//!       or: LUMEN_TICKS=10 lumen --config lumen.toml

mod config;
mod error;
mod runner;

use config::RunnerConfig;
use lumen_graph::NodeTypeRegistry;

fn main() {
    // Initialize logging
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info")
    ).init();

    let config = match RunnerConfig::load() {
        Ok(config) => config,
        Err(e) => {
            log::error!("Failed to load runner config: {}", e);
            std::process::exit(2);
        }
    };
    config.print_summary();

    let registry = NodeTypeRegistry::global();
    lumen_nodes::register_builtin_nodes(registry);

    match runner::run(&config, registry) {
        Ok(run) => {
            if config.debug {
                match run.record.to_json_pretty() {
                    Ok(json) => log::info!("Saved record:\n{}", json),
                    Err(e) => log::warn!("Failed to encode saved record: {}", e),
                }
            }
            if let Some(result) = run.last() {
                println!("{}", result);
            }
        }
        Err(e) => {
            log::error!("Script run failed: {}", e);
            std::process::exit(1);
        }
    }
}
