//! Field normalization shared by every pass.
//!
//! Raw deals come from a CRM export with inconsistent keys and encodings. The
//! functions here turn one record into canonical values and never fail: bad
//! numbers become 0, bad dates become `None`, missing names become sentinels.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use models::{Deal, DealStatus, FunnelField};
use serde_json::Value;

/// Label for won deals without any funnel name in the monthly series.
pub const NO_FUNNEL: &str = "Sem funil";
pub const NO_STAGE: &str = "Sem estágio";
/// Stage order used when a deal carries none; sorts after real stages.
pub const STAGE_ORDER_LAST: i64 = 999;

/// Lookup order for the funnel name. The first non-empty field wins.
pub const FUNNEL_FIELDS: [FunnelField; 4] = [
    FunnelField::Funil,
    FunnelField::PipelineName,
    FunnelField::Pipeline,
    FunnelField::NomeFunil,
];

const NAIVE_DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];
const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%Y/%m/%d"];

pub fn funnel_name(deal: &Deal) -> Option<&str> {
    FUNNEL_FIELDS
        .iter()
        .filter_map(|field| deal.funnel_field(*field))
        .map(str::trim)
        .find(|name| !name.is_empty())
}

pub fn is_won(deal: &Deal) -> bool {
    deal.status() == DealStatus::Won
}

pub fn is_open(deal: &Deal) -> bool {
    deal.status() == DealStatus::Open
}

/// Coerces a raw monetary value to a finite number.
///
/// Strings containing a comma use it as the decimal separator, with periods
/// read as thousands separators (`"1.234,56"` is 1234.56). A period after the
/// comma makes the value unparseable, so `"1,234.56"` is 0.
pub fn normalize_amount(value: Option<&Value>) -> f64 {
    let parsed = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => parse_decimal(s),
        _ => None,
    };
    parsed.filter(|n| n.is_finite()).unwrap_or(0.0)
}

fn parse_decimal(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    match trimmed.rfind(',') {
        // "1,234.56": a period after the decimal comma is not a thousands separator
        Some(comma) if trimmed[comma..].contains('.') => None,
        Some(_) => trimmed.replace('.', "").replace(',', ".").parse().ok(),
        None => trimmed.parse().ok(),
    }
}

/// Recurring plus non-recurring value. Ignores the explicit `valor` total.
pub fn component_sum(deal: &Deal) -> f64 {
    normalize_amount(deal.valor_recorrente.as_ref())
        + normalize_amount(deal.valor_nao_recorrente.as_ref())
}

/// `valor` when present and non-zero, otherwise the component sum.
pub fn explicit_or_component_total(deal: &Deal) -> f64 {
    let explicit = normalize_amount(deal.valor.as_ref());
    if explicit != 0.0 {
        explicit
    } else {
        component_sum(deal)
    }
}

pub fn stage_label(deal: &Deal) -> &str {
    deal.estagio
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(NO_STAGE)
}

pub fn stage_order(deal: &Deal) -> i64 {
    let order = match deal.ordem_estagio.as_ref() {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f as i64)),
        Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    order.unwrap_or(STAGE_ORDER_LAST)
}

/// Parses a raw date value into an instant.
///
/// Accepts RFC 3339 strings, naive date-times and plain dates (read as UTC),
/// and integers as epoch milliseconds.
pub fn parse_timestamp(value: Option<&Value>) -> Option<DateTime<Utc>> {
    match value? {
        Value::String(s) => parse_timestamp_str(s),
        Value::Number(n) => n
            .as_i64()
            .and_then(|millis| Utc.timestamp_millis_opt(millis).single()),
        _ => None,
    }
}

fn parse_timestamp_str(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Some(naive) = NAIVE_DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
    {
        return Some(Utc.from_utc_datetime(&naive));
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// Funnels with at least one open deal, in first-seen order.
pub fn open_funnels(deals: &[Deal]) -> Vec<String> {
    let mut funnels: Vec<String> = Vec::new();
    for deal in deals.iter().filter(|d| is_open(d)) {
        if let Some(name) = funnel_name(deal) {
            if !funnels.iter().any(|f| f == name) {
                funnels.push(name.to_string());
            }
        }
    }
    funnels
}

/// Union of closed and open funnels; closed first, both in first-seen order.
pub fn funnel_universe(closed: &[String], open: &[String]) -> Vec<String> {
    let mut universe = closed.to_vec();
    for funnel in open {
        if !universe.contains(funnel) {
            universe.push(funnel.clone());
        }
    }
    universe
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_funnel_name_priority() {
        let deal = Deal {
            pipeline_name: Some("Pipeline".to_string()),
            nome_funil: Some("Nome".to_string()),
            ..Default::default()
        };
        assert_eq!(funnel_name(&deal), Some("Pipeline"));

        let deal = Deal {
            funil: Some("Funil".to_string()),
            pipeline_name: Some("Pipeline".to_string()),
            ..Default::default()
        };
        assert_eq!(funnel_name(&deal), Some("Funil"));
    }

    #[test]
    fn test_funnel_name_skips_blank_values() {
        let deal = Deal {
            funil: Some("  ".to_string()),
            pipeline: Some("Energia".to_string()),
            ..Default::default()
        };
        assert_eq!(funnel_name(&deal), Some("Energia"));
        assert_eq!(funnel_name(&Deal::default()), None);
    }

    #[test]
    fn test_normalize_amount_comma_decimal() {
        assert_eq!(normalize_amount(Some(&json!("1.234,56"))), 1234.56);
        assert_eq!(normalize_amount(Some(&json!("10,5"))), 10.5);
        assert_eq!(normalize_amount(Some(&json!("1234.5"))), 1234.5);
        assert_eq!(normalize_amount(Some(&json!(" 42 "))), 42.0);
    }

    #[test]
    fn test_normalize_amount_garbage_is_zero() {
        assert_eq!(normalize_amount(None), 0.0);
        assert_eq!(normalize_amount(Some(&Value::Null)), 0.0);
        assert_eq!(normalize_amount(Some(&json!(""))), 0.0);
        assert_eq!(normalize_amount(Some(&json!("abc"))), 0.0);
        assert_eq!(normalize_amount(Some(&json!("NaN"))), 0.0);
        assert_eq!(normalize_amount(Some(&json!("inf"))), 0.0);
        assert_eq!(normalize_amount(Some(&json!(true))), 0.0);
        assert_eq!(normalize_amount(Some(&json!([1, 2]))), 0.0);
        assert_eq!(normalize_amount(Some(&json!("1,234.56"))), 0.0);
        assert_eq!(normalize_amount(Some(&json!("1.234,5.6"))), 0.0);
        assert_eq!(normalize_amount(Some(&json!(99.5))), 99.5);
    }

    #[test]
    fn test_explicit_total_overrides_only_when_non_zero() {
        let mut deal = Deal {
            valor_recorrente: Some(json!(100)),
            valor_nao_recorrente: Some(json!("50")),
            valor: Some(json!(1000)),
            ..Default::default()
        };
        assert_eq!(component_sum(&deal), 150.0);
        assert_eq!(explicit_or_component_total(&deal), 1000.0);

        deal.valor = Some(json!(0));
        assert_eq!(explicit_or_component_total(&deal), 150.0);
        deal.valor = Some(json!("n/a"));
        assert_eq!(explicit_or_component_total(&deal), 150.0);
    }

    #[test]
    fn test_stage_defaults() {
        let deal = Deal::default();
        assert_eq!(stage_label(&deal), NO_STAGE);
        assert_eq!(stage_order(&deal), STAGE_ORDER_LAST);

        let deal = Deal {
            estagio: Some("Proposta".to_string()),
            ordem_estagio: Some(json!("3")),
            ..Default::default()
        };
        assert_eq!(stage_label(&deal), "Proposta");
        assert_eq!(stage_order(&deal), 3);
        let deal = Deal {
            ordem_estagio: Some(json!(2.0)),
            ..Default::default()
        };
        assert_eq!(stage_order(&deal), 2);
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let expected = Utc.with_ymd_and_hms(2025, 1, 15, 0, 0, 0).unwrap();
        assert_eq!(parse_timestamp(Some(&json!("2025-01-15"))), Some(expected));
        assert_eq!(
            parse_timestamp(Some(&json!("2025-01-15T00:00:00.000Z"))),
            Some(expected)
        );
        assert_eq!(
            parse_timestamp(Some(&json!("2025-01-15T00:00:00"))),
            Some(expected)
        );
        assert_eq!(parse_timestamp(Some(&json!("2025/01/15"))), Some(expected));
        assert_eq!(
            parse_timestamp(Some(&json!("2025-01-14T21:00:00-03:00"))),
            Some(expected)
        );
        assert_eq!(
            parse_timestamp(Some(&json!(expected.timestamp_millis()))),
            Some(expected)
        );
    }

    #[test]
    fn test_parse_timestamp_rejects_garbage() {
        assert_eq!(parse_timestamp(None), None);
        assert_eq!(parse_timestamp(Some(&json!(""))), None);
        assert_eq!(parse_timestamp(Some(&json!("soon"))), None);
        assert_eq!(parse_timestamp(Some(&json!("2025-13-01"))), None);
        assert_eq!(parse_timestamp(Some(&json!({"d": 1}))), None);
    }

    #[test]
    fn test_open_funnels_and_universe() {
        let deals = vec![
            Deal {
                status: Some("Em andamento".to_string()),
                funil: Some("B".to_string()),
                ..Default::default()
            },
            Deal {
                status: Some("Em andamento".to_string()),
                ..Default::default()
            },
            Deal {
                status: Some("Perdida".to_string()),
                funil: Some("C".to_string()),
                ..Default::default()
            },
            Deal {
                status: Some("Em andamento".to_string()),
                pipeline: Some("A".to_string()),
                ..Default::default()
            },
        ];
        let open = open_funnels(&deals);
        assert_eq!(open, vec!["B".to_string(), "A".to_string()]);

        let closed = vec!["A".to_string()];
        assert_eq!(
            funnel_universe(&closed, &open),
            vec!["A".to_string(), "B".to_string()]
        );
    }
}
