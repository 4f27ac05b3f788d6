//! `skysync version`

use serde::Serialize;

use crate::cli::GlobalOpts;
use crate::config;
use crate::error::CliError;
use crate::output;

#[derive(Debug, Serialize)]
struct VersionInfo {
    version: &'static str,
    flightdeck_url: Option<String>,
    skyspark_url: Option<String>,
    skyspark_project: Option<String>,
    /// Why configuration could not be shown.
    #[serde(skip_serializing_if = "Option::is_none")]
    config_error: Option<String>,
}

fn detail(info: &VersionInfo) -> String {
    let mut out = format!("skysync v{}\n\nConfiguration:", info.version);
    match &info.config_error {
        Some(err) => out.push_str(&format!("\n  not loaded: {err}")),
        None => {
            for (label, value) in [
                ("FlightDeck URL", &info.flightdeck_url),
                ("SkySpark URL", &info.skyspark_url),
                ("SkySpark Project", &info.skyspark_project),
            ] {
                let label = format!("{label}:");
                let value = value.as_deref().unwrap_or_default();
                out.push_str(&format!("\n  {label:<18}{value}"));
            }
        }
    }
    out
}

/// Print the version; configuration is shown when it loads.
pub fn handle(global: &GlobalOpts) -> Result<(), CliError> {
    let info = match config::load(global) {
        Ok(cfg) => VersionInfo {
            version: env!("CARGO_PKG_VERSION"),
            flightdeck_url: Some(cfg.flightdeck.api_url),
            skyspark_url: Some(cfg.skyspark.url),
            skyspark_project: Some(cfg.skyspark.project),
            config_error: None,
        },
        Err(err) => VersionInfo {
            version: env!("CARGO_PKG_VERSION"),
            flightdeck_url: None,
            skyspark_url: None,
            skyspark_project: None,
            config_error: Some(err.to_string()),
        },
    };
    output::print_output(&output::render(global.output, &info, detail)?);
    Ok(())
}
