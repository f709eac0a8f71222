// weather_pusher - Push temperature readings from weather APIs to a Prometheus Pushgateway
//
// Copyright 2023 weather_pusher authors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.
//

use clap::Parser;
use std::error::Error;
use std::io;
use std::path::PathBuf;
use std::process;
use tokio::signal::unix::{self, SignalKind};
use tracing::Level;
use weather_pusher::config::Config;
use weather_pusher::metrics::PushGateway;
use weather_pusher::poller::Poller;
use weather_pusher::provider::{self, WeatherProvider};
use weather_pusher::registry::{Registry, DEFAULT_PROVIDER};

const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[derive(Debug, Parser)]
#[clap(name = "weather_pusher", version = clap::crate_version!())]
struct WeatherPusherApplication {
    /// Path to the TOML configuration file with settings, API keys, and locations
    #[clap(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Logging verbosity. Allowed values are 'trace', 'debug', 'info', 'warn', and 'error'
    /// (case insensitive). Overrides the level from the configuration file.
    #[clap(long)]
    log_level: Option<Level>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let opts = WeatherPusherApplication::parse();
    let config = Config::load(&opts.config).unwrap_or_else(|e| {
        eprintln!("weather_pusher: {}", e);
        process::exit(1)
    });

    tracing::subscriber::set_global_default(
        tracing_subscriber::FmtSubscriber::builder()
            .with_max_level(opts.log_level.unwrap_or_else(|| config.settings.log_level()))
            .finish(),
    )
    .expect("failed to set tracing subscriber");

    if config.settings.check_interval_minutes == 0 {
        tracing::error!(message = "check interval must be at least one minute");
        process::exit(1)
    }

    let http_client = provider::http_client(config.settings.timeout()).unwrap_or_else(|e| {
        tracing::error!(message = "unable to initialize HTTP client", error = %e);
        process::exit(1)
    });

    let mut registry = Registry::from_api_keys(&config.api_keys)?;
    registry.register_provider(DEFAULT_PROVIDER, WeatherProvider::new(http_client.clone()))?;

    // Make sure every location refers to a source we can use before running indefinitely.
    // Sources other than weather.gov are only available when an API key is configured.
    for location in &config.locations {
        if let Err(e) = registry.source(&location.service) {
            let mut available: Vec<&str> = registry.source_names().collect();
            available.sort_unstable();
            tracing::error!(
                message = "invalid source for location",
                location = %location.name,
                available = ?available,
                error = %e,
            );
            process::exit(1)
        }
    }

    let gateway = PushGateway::new(http_client, &config.settings.pushgateway).unwrap_or_else(|e| {
        tracing::error!(message = "invalid push gateway", error = %e);
        process::exit(1)
    });

    tracing::info!(
        message = "temperature polling started",
        pushgateway = %config.settings.pushgateway,
        interval_minutes = config.settings.check_interval_minutes,
        locations = config.locations.len(),
    );

    let poller = Poller::new(
        registry,
        gateway,
        config.locations,
        config.settings.check_interval_minutes,
    )?;

    tokio::select! {
        res = poller.run() => {
            if let Err(e) = res {
                tracing::error!(message = "temperature polling stopped", error = %e);
                process::exit(1)
            }
        }
        // Wait for either SIGTERM or SIGINT to shutdown
        _ = sigterm() => {}
        _ = sigint() => {}
    }

    tracing::info!("shutdown");
    Ok(())
}

/// Return after the first SIGTERM signal received by this process
async fn sigterm() -> io::Result<()> {
    unix::signal(SignalKind::terminate())?.recv().await;
    Ok(())
}

/// Return after the first SIGINT signal received by this process
async fn sigint() -> io::Result<()> {
    unix::signal(SignalKind::interrupt())?.recv().await;
    Ok(())
}
