use chrono::{DateTime, Datelike, TimeZone};
use models::{Deal, FunnelPerformance};

use crate::calendar::{days_in_month, month_key};
use crate::config::EngineConfig;
use crate::normalize::{explicit_or_component_total, funnel_name, is_won, parse_timestamp};

fn clamp_percentage(value: f64) -> f64 {
    value.clamp(0.0, 100.0)
}

/// Won revenue of the current month per funnel, against its target.
///
/// "Current month" and the day used for prorating come from `now`'s own time
/// zone; close dates are viewed in that zone too. Deals without a funnel
/// name never match. Actual revenue prefers the explicit `valor` total.
pub fn current_month_performance<Tz: TimeZone>(
    deals: &[Deal],
    funnels: &[String],
    now: &DateTime<Tz>,
    config: &EngineConfig,
) -> Vec<FunnelPerformance> {
    let tz = now.timezone();
    let current_month = month_key(now);
    let current_day = now.day();
    let month_days = days_in_month(now.year(), now.month());
    let elapsed = f64::from(current_day) / f64::from(month_days);

    let month_deals: Vec<&Deal> = deals
        .iter()
        .filter(|d| is_won(d))
        .filter(|d| {
            parse_timestamp(d.data_fechamento.as_ref())
                .is_some_and(|closed_at| month_key(&closed_at.with_timezone(&tz)) == current_month)
        })
        .collect();

    tracing::debug!(
        month = %current_month,
        day = current_day,
        days = month_days,
        deals = month_deals.len(),
        "current month performance"
    );

    funnels
        .iter()
        .enumerate()
        .map(|(index, funnel)| {
            let target = config.target_for(funnel);
            let prorated_target = target * elapsed;
            let actual: f64 = month_deals
                .iter()
                .filter(|d| funnel_name(d) == Some(funnel.as_str()))
                .map(|d| explicit_or_component_total(d))
                .sum();

            FunnelPerformance {
                funnel: funnel.clone(),
                actual,
                target,
                prorated_target,
                percentage: clamp_percentage(actual / target * 100.0),
                prorated_percentage: clamp_percentage(prorated_target / target * 100.0),
                color: config.color_for(index).to_string(),
            }
        })
        .collect()
}
