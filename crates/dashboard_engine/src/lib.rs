//! Sales dashboard engine.
//!
//! Turns a flat list of CRM deals into the four views of the revenue
//! dashboard: won revenue per month and funnel, current-month performance
//! against target, open pipeline per stage, and forecast per expected close
//! month. Every pass is a pure function of the deal list and an explicit
//! "now"; nothing here reads the clock.

pub mod cache;
pub mod calendar;
pub mod config;
pub mod error;
pub mod forecast;
pub mod monthly;
pub mod normalize;
pub mod performance;
pub mod pipeline;
pub mod source;

use std::{fs, path::Path};

use anyhow::{Context, Result};
use chrono::{DateTime, Offset, TimeZone};
use models::{Dashboard, DashboardMetadata, Deal};

pub use cache::DashboardCache;
pub use config::EngineConfig;
pub use error::EngineError;
pub use forecast::forecast_by_funnel;
pub use monthly::aggregate_won_by_month_and_funnel;
pub use normalize::{normalize_amount, open_funnels};
pub use performance::current_month_performance;
pub use pipeline::pipeline_by_funnel;
pub use source::{deals_from_json, DealSource, FileDealSource};

/// Runs all four passes over `deals`.
///
/// The funnel universe comes from the monthly series (won funnels, then
/// open-only funnels) and is shared by the other three views, so every view
/// lists the same funnels in the same order.
pub fn generate_dashboard<Tz: TimeZone>(
    deals: &[Deal],
    now: &DateTime<Tz>,
    config: &EngineConfig,
) -> Dashboard {
    let open = open_funnels(deals);
    let monthly = aggregate_won_by_month_and_funnel(deals, config.date_field(), &open);
    let performance = current_month_performance(deals, &monthly.funnels, now, config);
    let pipelines = pipeline_by_funnel(deals, &monthly.funnels);
    let forecasts = forecast_by_funnel(deals, &monthly.funnels, now);

    tracing::info!(
        deals = deals.len(),
        funnels = monthly.funnels.len(),
        months = monthly.rows.len(),
        "dashboard derived"
    );

    let reference_now = now.with_timezone(&now.offset().fix()).to_rfc3339();
    Dashboard {
        metadata: DashboardMetadata {
            generated_at: reference_now.clone(),
            reference_now,
            settings_version: config.settings_version(),
            date_field: config.date_field(),
            target_per_funnel: config.target_per_funnel(),
        },
        monthly,
        performance,
        pipelines,
        forecasts,
    }
}

pub fn write_dashboard_json(output: &Dashboard, out_path: &Path, pretty: bool) -> Result<()> {
    if let Some(parent) = out_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Creating output dir: {}", parent.display()))?;
        }
    }
    let json = if pretty {
        serde_json::to_string_pretty(output)?
    } else {
        serde_json::to_string(output)?
    };
    fs::write(out_path, json)
        .with_context(|| format!("Writing output file: {}", out_path.display()))?;
    Ok(())
}
