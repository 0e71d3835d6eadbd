use std::collections::HashMap;

use chrono::{DateTime, Datelike, TimeZone};
use models::{Deal, ForecastBucket, FunnelForecast};

use crate::calendar::{month_key, month_label, start_of_month};
use crate::normalize::{component_sum, funnel_name, is_open, parse_timestamp};

/// Expected revenue of open deals per funnel and month of expected close.
///
/// Forecasts dated before the first day of `now`'s month are stale and left
/// out. Months are keyed in `now`'s zone and ordered by date.
pub fn forecast_by_funnel<Tz: TimeZone>(
    deals: &[Deal],
    funnels: &[String],
    now: &DateTime<Tz>,
) -> Vec<FunnelForecast> {
    let tz = now.timezone();
    let month_start = start_of_month(now);

    funnels
        .iter()
        .map(|funnel| {
            let mut months: Vec<ForecastBucket> = Vec::new();
            let mut index: HashMap<String, usize> = HashMap::new();

            for deal in deals
                .iter()
                .filter(|d| is_open(d) && funnel_name(d) == Some(funnel.as_str()))
            {
                let Some(expected) = parse_timestamp(deal.previsao_fechamento.as_ref()) else {
                    continue;
                };
                if expected < month_start {
                    continue;
                }

                let local = expected.with_timezone(&tz);
                let key = month_key(&local);
                let slot = match index.get(&key) {
                    Some(&slot) => slot,
                    None => {
                        months.push(ForecastBucket {
                            month_key: key.clone(),
                            label: month_label(local.year(), local.month()),
                            total: 0.0,
                            date: expected,
                        });
                        index.insert(key, months.len() - 1);
                        months.len() - 1
                    }
                };
                months[slot].total += component_sum(deal);
            }

            months.sort_by_key(|m| m.date);
            FunnelForecast {
                funnel: funnel.clone(),
                months,
            }
        })
        .collect()
}
