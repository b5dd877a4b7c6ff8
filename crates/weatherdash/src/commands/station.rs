//! Station command handlers.

use chrono::Local;
use tabled::Tabled;
use weatherdash_core::{ModuleRecord, StationSnapshot};

use crate::cli::{GlobalOpts, StationArgs};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct ModuleRow {
    #[tabled(rename = "Module")]
    kind: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Temp")]
    temperature: String,
    #[tabled(rename = "Humidity")]
    humidity: String,
    #[tabled(rename = "CO2")]
    co2: String,
    #[tabled(rename = "Pressure")]
    pressure: String,
    #[tabled(rename = "Rain 1h")]
    rain: String,
    #[tabled(rename = "Wind")]
    wind: String,
    #[tabled(rename = "Battery")]
    battery: String,
    #[tabled(rename = "Online")]
    reachable: String,
}

impl From<&ModuleRecord> for ModuleRow {
    fn from(m: &ModuleRecord) -> Self {
        let r = &m.readings;
        Self {
            kind: m.kind.to_string(),
            name: m.name.clone().unwrap_or_default(),
            temperature: output::temperature(r.temperature),
            humidity: output::value(r.humidity, 0, "%"),
            co2: output::co2(r.co2),
            pressure: output::value(r.pressure, 1, " mbar"),
            rain: output::value(r.rain_1h, 1, " mm"),
            wind: wind(m),
            battery: m
                .battery_percent
                .map_or_else(|| "-".into(), |b| format!("{b}%")),
            reachable: output::reachable(m.reachable),
        }
    }
}

fn wind(m: &ModuleRecord) -> String {
    let r = &m.readings;
    match (r.wind_strength, r.wind_angle) {
        (Some(speed), Some(angle)) => format!("{speed:.0} km/h @ {angle:.0}°"),
        (Some(speed), None) => format!("{speed:.0} km/h"),
        _ => "-".into(),
    }
}

fn header(snap: &StationSnapshot) -> String {
    format!(
        "{}  (fetched {})",
        snap.display_name(),
        snap.fetched_at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S")
    )
}

fn detail(m: &ModuleRecord) -> String {
    let r = &m.readings;
    let mut lines = vec![
        format!("Module:    {}", m.kind),
        format!("ID:        {}", m.id),
        format!("Name:      {}", m.name.as_deref().unwrap_or("-")),
        format!("Online:    {}", output::reachable(m.reachable)),
    ];
    if let Some(at) = r.measured_at {
        lines.push(format!(
            "Measured:  {}",
            at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S")
        ));
    }
    if r.temperature.is_some() {
        lines.push(format!(
            "Temp:      {} (min {}, max {}, {})",
            output::temperature(r.temperature),
            output::value(r.min_temperature, 1, "°C"),
            output::value(r.max_temperature, 1, "°C"),
            r.temperature_trend.as_deref().unwrap_or("-"),
        ));
    }
    if r.humidity.is_some() {
        lines.push(format!("Humidity:  {}", output::value(r.humidity, 0, "%")));
    }
    if r.co2.is_some() {
        lines.push(format!("CO2:       {}", output::co2(r.co2)));
    }
    if r.noise.is_some() {
        lines.push(format!("Noise:     {}", output::value(r.noise, 0, " dB")));
    }
    if r.pressure.is_some() {
        lines.push(format!(
            "Pressure:  {} ({})",
            output::value(r.pressure, 1, " mbar"),
            r.pressure_trend.as_deref().unwrap_or("-"),
        ));
    }
    if r.rain.is_some() || r.rain_1h.is_some() {
        lines.push(format!(
            "Rain:      {} now, {} last hour, {} today",
            output::value(r.rain, 1, " mm"),
            output::value(r.rain_1h, 1, " mm"),
            output::value(r.rain_24h, 1, " mm"),
        ));
    }
    if r.wind_strength.is_some() {
        lines.push(format!("Wind:      {}", wind(m)));
        lines.push(format!(
            "Gusts:     {}",
            output::value(r.gust_strength, 0, " km/h")
        ));
    }
    if let Some(b) = m.battery_percent {
        lines.push(format!("Battery:   {b}%"));
    }
    if let Some(s) = m.signal {
        lines.push(format!("Signal:    {s}"));
    }
    if let Some(fw) = m.firmware {
        lines.push(format!("Firmware:  {fw}"));
    }
    lines.join("\n")
}

pub async fn handle(args: StationArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let session = util::connect(global).await?;
    let snap = util::station(&session.handle).await?;

    let out = if let Some(kind) = args.module {
        let module = util::resolve_module(&snap, &kind.to_string())?;
        output::render_single(&global.output, module, detail, |m| m.id.clone())?
    } else {
        let modules: Vec<&ModuleRecord> = snap.modules.values().collect();
        let rendered = output::render_list(
            &global.output,
            &*snap,
            &modules,
            |m| ModuleRow::from(*m),
            |m| format!("{}\t{}", m.kind, m.id),
        )?;
        if matches!(global.output, crate::cli::OutputFormat::Table) {
            format!("{}\n{rendered}", header(&snap))
        } else {
            rendered
        }
    };

    output::print_output(&out, global.quiet);
    Ok(())
}
