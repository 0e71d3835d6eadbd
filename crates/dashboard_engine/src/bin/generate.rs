use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, FixedOffset, Local, SecondsFormat};
use clap::Parser;
use dashboard_engine::{
    generate_dashboard, write_dashboard_json, DealSource, EngineConfig, FileDealSource,
};
use models::DateField;

#[derive(Parser, Debug)]
#[command(
    name = "generate-dashboard",
    about = "Derive the sales dashboard JSON from a list of CRM deals"
)]
struct Args {
    /// JSON file holding an array of deals
    #[arg(long, default_value = "deals.json")]
    deals: PathBuf,

    /// Settings file (target, palette, date field, logging). Without it, settings.json
    /// in the working directory is tried, then built-in defaults.
    #[arg(long)]
    settings: Option<PathBuf>,

    #[arg(long, default_value = "dashboard/dashboard.json")]
    out: PathBuf,

    /// Reference instant as RFC 3339, e.g. 2025-01-20T09:00:00-03:00. Defaults to the local clock.
    #[arg(long)]
    now: Option<DateTime<FixedOffset>>,

    /// data_fechamento or previsao_fechamento; overrides the settings file
    #[arg(long)]
    date_field: Option<DateField>,

    #[arg(long)]
    pretty: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // an explicit file must load; the implicit one may be absent or broken
    let settings = match settings_loader::load_optional_settings(args.settings.as_ref())? {
        Some(settings) => settings,
        None => settings_loader::load_settings_with_fallback(None),
    };
    logger::init(&settings.logging)?;

    let mut config = EngineConfig::from_settings(&settings).context("invalid settings")?;
    if let Some(field) = args.date_field {
        config = config.with_date_field(field);
    }

    tracing::info!(
        deals = %args.deals.display(),
        out = %args.out.display(),
        date_field = %config.date_field(),
        "generating dashboard"
    );

    let source = FileDealSource::new(&args.deals);
    let deals = source
        .load_deals()
        .with_context(|| format!("Loading deals from {}", source.path().display()))?;

    let mut dashboard = match args.now {
        Some(now) => generate_dashboard(&deals, &now, &config),
        None => generate_dashboard(&deals, &Local::now(), &config),
    };
    dashboard.metadata.generated_at = Local::now().to_rfc3339_opts(SecondsFormat::Secs, false);

    write_dashboard_json(&dashboard.rounded(), &args.out, args.pretty)
        .context("write dashboard.json")?;

    tracing::info!(path = %args.out.display(), "dashboard written");
    Ok(())
}
