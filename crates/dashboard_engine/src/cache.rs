use std::sync::Arc;

use chrono::{DateTime, Offset, TimeZone};
use models::{Dashboard, Deal};

use crate::config::EngineConfig;
use crate::generate_dashboard;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CacheKey {
    minute: i64,
    utc_offset: i32,
}

impl CacheKey {
    fn of<Tz: TimeZone>(now: &DateTime<Tz>) -> Self {
        Self {
            minute: now.timestamp().div_euclid(60),
            utc_offset: now.offset().fix().local_minus_utc(),
        }
    }
}

struct CacheEntry {
    deals: Arc<Vec<Deal>>,
    key: CacheKey,
    dashboard: Dashboard,
}

/// Keeps the last dashboard for callers that redraw often.
///
/// A hit needs the very same `Arc` (pointer identity, not content) and the
/// same wall-clock minute and UTC offset for "now".
pub struct DashboardCache {
    config: EngineConfig,
    entry: Option<CacheEntry>,
    computations: usize,
}

impl DashboardCache {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            entry: None,
            computations: 0,
        }
    }

    pub fn get_or_compute<Tz: TimeZone>(
        &mut self,
        deals: &Arc<Vec<Deal>>,
        now: &DateTime<Tz>,
    ) -> &Dashboard {
        let key = CacheKey::of(now);
        let entry = match self.entry.take() {
            Some(entry) if Arc::ptr_eq(&entry.deals, deals) && entry.key == key => entry,
            _ => {
                self.computations += 1;
                tracing::debug!(deals = deals.len(), minute = key.minute, "recomputing dashboard");
                CacheEntry {
                    deals: Arc::clone(deals),
                    key,
                    dashboard: generate_dashboard(deals.as_slice(), now, &self.config),
                }
            }
        };
        &self.entry.insert(entry).dashboard
    }

    /// Number of times the dashboard was actually derived.
    pub fn computations(&self) -> usize {
        self.computations
    }

    pub fn clear(&mut self) {
        self.entry = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    fn deals() -> Arc<Vec<Deal>> {
        Arc::new(vec![serde_json::from_value(json!({
            "status": "Ganha",
            "funil": "A",
            "data_fechamento": "2025-01-15",
            "valor_recorrente": 100
        }))
        .unwrap()])
    }

    #[test]
    fn test_hit_within_same_minute() {
        let mut cache = DashboardCache::new(EngineConfig::default());
        let deals = deals();
        let first = Utc.with_ymd_and_hms(2025, 1, 20, 12, 0, 5).unwrap();
        let later = Utc.with_ymd_and_hms(2025, 1, 20, 12, 0, 55).unwrap();

        let month = cache.get_or_compute(&deals, &first).monthly.rows[0].month.clone();
        cache.get_or_compute(&deals, &later);

        assert_eq!(month, "2025-01");
        assert_eq!(cache.computations(), 1);
    }

    #[test]
    fn test_miss_on_new_minute_or_new_list() {
        let mut cache = DashboardCache::new(EngineConfig::default());
        let deals = deals();
        let now = Utc.with_ymd_and_hms(2025, 1, 20, 12, 0, 5).unwrap();
        let next_minute = Utc.with_ymd_and_hms(2025, 1, 20, 12, 1, 0).unwrap();

        cache.get_or_compute(&deals, &now);
        cache.get_or_compute(&deals, &next_minute);
        assert_eq!(cache.computations(), 2);

        // same content, different allocation
        let copy = Arc::new(deals.as_ref().clone());
        cache.get_or_compute(&copy, &next_minute);
        assert_eq!(cache.computations(), 3);

        cache.clear();
        cache.get_or_compute(&copy, &next_minute);
        assert_eq!(cache.computations(), 4);
    }
}
