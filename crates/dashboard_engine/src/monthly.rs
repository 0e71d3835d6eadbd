use std::collections::{BTreeMap, HashMap};

use models::{DateField, Deal, FunnelAmount, MonthlyFunnelRow, MonthlyFunnelSeries};

use crate::calendar::month_key;
use crate::normalize::{
    component_sum, funnel_name, funnel_universe, is_won, parse_timestamp, NO_FUNNEL,
};

/// Won revenue per UTC month and funnel.
///
/// Every row lists all funnels of the universe (closed funnels, then
/// `open_funnels` not already present) with zero where nothing was won;
/// `total` only sums the closed funnels. Deals whose selected date does not
/// parse are skipped.
pub fn aggregate_won_by_month_and_funnel(
    deals: &[Deal],
    date_field: DateField,
    open_funnels: &[String],
) -> MonthlyFunnelSeries {
    let mut by_month: BTreeMap<String, HashMap<String, f64>> = BTreeMap::new();
    let mut closed_funnels: Vec<String> = Vec::new();
    let mut skipped = 0usize;

    for deal in deals.iter().filter(|d| is_won(d)) {
        let Some(closed_at) = parse_timestamp(deal.date(date_field)) else {
            skipped += 1;
            continue;
        };

        let month = month_key(&closed_at);
        let funnel = funnel_name(deal).unwrap_or(NO_FUNNEL);
        if !closed_funnels.iter().any(|f| f == funnel) {
            closed_funnels.push(funnel.to_string());
        }

        *by_month
            .entry(month)
            .or_default()
            .entry(funnel.to_string())
            .or_insert(0.0) += component_sum(deal);
    }

    if skipped > 0 {
        tracing::debug!(skipped, field = %date_field, "won deals without a usable date");
    }

    let funnels = funnel_universe(&closed_funnels, open_funnels);
    let rows = by_month
        .into_iter()
        .map(|(month, amounts)| {
            let total = closed_funnels
                .iter()
                .map(|f| amounts.get(f).copied().unwrap_or(0.0))
                .sum::<f64>();
            MonthlyFunnelRow {
                month,
                funnels: funnels
                    .iter()
                    .map(|f| FunnelAmount {
                        funnel: f.clone(),
                        amount: amounts.get(f).copied().unwrap_or(0.0),
                    })
                    .collect(),
                total,
            }
        })
        .collect();

    MonthlyFunnelSeries {
        rows,
        closed_funnels,
        funnels,
    }
}
