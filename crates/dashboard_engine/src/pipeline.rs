use std::collections::HashMap;

use models::{Deal, FunnelPipeline, StageBucket};

use crate::normalize::{funnel_name, is_open, normalize_amount, stage_label, stage_order};

/// Open deals of each funnel grouped by stage.
///
/// Buckets keep first-seen order, take their order from the first deal of the
/// stage and are then stably sorted by it, so equal orders stay in input order.
pub fn pipeline_by_funnel(deals: &[Deal], funnels: &[String]) -> Vec<FunnelPipeline> {
    funnels
        .iter()
        .map(|funnel| FunnelPipeline {
            funnel: funnel.clone(),
            stages: stages_for(deals, funnel),
        })
        .collect()
}

fn stages_for(deals: &[Deal], funnel: &str) -> Vec<StageBucket> {
    let mut stages: Vec<StageBucket> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for deal in deals
        .iter()
        .filter(|d| is_open(d) && funnel_name(d) == Some(funnel))
    {
        let label = stage_label(deal);
        let slot = match index.get(label) {
            Some(&slot) => slot,
            None => {
                stages.push(StageBucket {
                    stage: label.to_string(),
                    order: stage_order(deal),
                    count: 0,
                    recurring: 0.0,
                    non_recurring: 0.0,
                });
                index.insert(label.to_string(), stages.len() - 1);
                stages.len() - 1
            }
        };

        let bucket = &mut stages[slot];
        bucket.count += 1;
        bucket.recurring += normalize_amount(deal.valor_recorrente.as_ref());
        bucket.non_recurring += normalize_amount(deal.valor_nao_recorrente.as_ref());
    }

    stages.sort_by_key(|s| s.order);
    stages
}
