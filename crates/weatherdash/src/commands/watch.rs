//! Periodic station refresh.

use chrono::Local;
use owo_colors::{OwoColorize, Stream};
use tracing::warn;
use weatherdash_core::{ModuleKind, StationSnapshot};

use crate::cli::{GlobalOpts, OutputFormat, WatchArgs};
use crate::error::CliError;
use crate::output;

use super::util;

/// One status line: station name, then a short summary per module.
fn summary(snap: &StationSnapshot) -> String {
    let mut parts = Vec::new();
    for (kind, m) in &snap.modules {
        let r = &m.readings;
        let part = match kind {
            ModuleKind::Main | ModuleKind::Indoor => format!(
                "{kind} {} {} {}",
                output::temperature(r.temperature),
                output::value(r.humidity, 0, "%"),
                output::co2(r.co2),
            ),
            ModuleKind::Outdoor => format!(
                "{kind} {} {}",
                output::temperature(r.temperature),
                output::value(r.humidity, 0, "%"),
            ),
            ModuleKind::Rain => format!("{kind} {}", output::value(r.rain_1h, 1, " mm/h")),
            ModuleKind::Wind => format!(
                "{kind} {} gusts {}",
                output::value(r.wind_strength, 0, " km/h"),
                output::value(r.gust_strength, 0, " km/h"),
            ),
        };
        parts.push(part);
    }
    let stamp = Local::now().format("%H:%M:%S").to_string();
    format!(
        "{} {} | {}",
        stamp.if_supports_color(Stream::Stdout, |t| t.dimmed()),
        snap.display_name()
            .if_supports_color(Stream::Stdout, |t| t.bold()),
        parts.join(" | ")
    )
}

fn render(snap: &StationSnapshot, format: &OutputFormat) -> Result<String, CliError> {
    match format {
        OutputFormat::Table | OutputFormat::Plain => Ok(summary(snap)),
        // One document per refresh.
        OutputFormat::Json | OutputFormat::JsonCompact => output::render_json_compact(snap),
        OutputFormat::Yaml => Ok(format!("---\n{}", output::render_yaml(snap)?)),
    }
}

pub async fn handle(args: WatchArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let session = util::connect(global).await?;
    let interval = *args.interval;
    let mut refreshes = 0u32;

    loop {
        // The first round may reuse the fetch started by the session restore.
        let result = if refreshes == 0 {
            util::station(&session.handle).await
        } else {
            session
                .handle
                .fetch_station_data()
                .await
                .map_err(CliError::from)
        };

        match result {
            Ok(snap) => output::print_output(&render(&snap, &global.output)?, global.quiet),
            Err(CliError::Network) => warn!("station refresh failed: network unavailable"),
            Err(CliError::ApiError { code, message }) => {
                warn!(code, %message, "station refresh rejected");
            }
            Err(e) => return Err(e),
        }

        refreshes += 1;
        if args.count.is_some_and(|max| refreshes >= max) {
            return Ok(());
        }

        tokio::select! {
            _ = tokio::signal::ctrl_c() => return Ok(()),
            () = tokio::time::sleep(interval) => {}
        }
    }
}
