//! Measurement history handler.

use std::sync::Arc;

use chrono::Local;
use tabled::builder::Builder;
use tabled::settings::Style;
use weatherdash_core::{CacheStatus, MeasurementKey, SyncHandle, TimeSeries};

use crate::cli::{GlobalOpts, MeasureArgs, OutputFormat};
use crate::error::CliError;
use crate::output;

use super::util;

/// Wait for `key` to leave `Idle`/`Loading` and return its series.
async fn await_series(
    handle: &SyncHandle,
    key: &MeasurementKey,
) -> Result<Arc<TimeSeries>, CliError> {
    let mut rx = handle.subscribe();
    let entry = rx
        .wait_for(|s| {
            matches!(
                s.measurement(key).status,
                CacheStatus::Ready | CacheStatus::Failed(_)
            )
        })
        .await
        .map_err(|_| CliError::Cancelled)?
        .measurement(key);

    match entry.status {
        CacheStatus::Failed(e) => Err(e.into()),
        _ => Ok(entry
            .data
            .unwrap_or_else(|| Arc::new(TimeSeries::empty(key.metrics())))),
    }
}

fn cell(v: Option<f64>) -> String {
    output::value(v, 1, "")
}

fn render_table(series: &TimeSeries) -> String {
    let mut builder = Builder::default();
    builder.push_record(
        std::iter::once("Time".to_owned()).chain(series.metrics.iter().map(ToString::to_string)),
    );
    for sample in &series.samples {
        builder.push_record(
            std::iter::once(
                sample
                    .at
                    .with_timezone(&Local)
                    .format("%Y-%m-%d %H:%M")
                    .to_string(),
            )
            .chain(sample.values.iter().copied().map(cell)),
        );
    }
    builder.build().with(Style::rounded()).to_string()
}

fn render_plain(series: &TimeSeries) -> String {
    series
        .samples
        .iter()
        .map(|s| {
            let values: Vec<String> = s
                .values
                .iter()
                .map(|v| v.map_or_else(String::new, |v| v.to_string()))
                .collect();
            format!("{}\t{}", s.at.to_rfc3339(), values.join("\t"))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Keep only the `n` most recent samples.
fn tail(series: &TimeSeries, n: usize) -> TimeSeries {
    let skip = series.samples.len().saturating_sub(n);
    TimeSeries {
        metrics: series.metrics.clone(),
        samples: series.samples[skip..].to_vec(),
    }
}

pub async fn handle(args: MeasureArgs, global: &GlobalOpts) -> Result<(), CliError> {
    if args.metrics.is_empty() {
        return Err(CliError::Validation {
            field: "metrics".into(),
            reason: "at least one metric is required".into(),
        });
    }

    let session = util::connect(global).await?;
    let snap = util::station(&session.handle).await?;
    let module = util::resolve_module(&snap, &args.module)?;

    let key = session.handle.fetch_measure(
        snap.device_id.clone(),
        module.id.clone(),
        args.metrics,
        args.range,
    );
    let spinner = util::spinner("Fetching measurements...", global.quiet);
    let series = await_series(&session.handle, &key).await;
    spinner.finish_and_clear();
    let series = series?;

    let series = match args.last {
        Some(n) => Arc::new(tail(&series, n)),
        None => series,
    };

    let out = match global.output {
        OutputFormat::Table if series.is_empty() => format!("No measurements for {key}"),
        OutputFormat::Table => render_table(&series),
        OutputFormat::Json => output::render_json_pretty(&*series)?,
        OutputFormat::JsonCompact => output::render_json_compact(&*series)?,
        OutputFormat::Yaml => output::render_yaml(&*series)?,
        OutputFormat::Plain => render_plain(&series),
    };
    output::print_output(&out, global.quiet);
    Ok(())
}
