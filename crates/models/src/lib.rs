
use chrono::{DateTime, Utc};
use logger::LogConfig;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

pub const STATUS_WON: &str = "Ganha";
pub const STATUS_OPEN: &str = "Em andamento";

pub const DEFAULT_TARGET_PER_FUNNEL: f64 = 600_000.0;
pub const DEFAULT_FUNNEL_COLORS: [&str; 6] = [
	"#1976d2", "#9c27b0", "#2e7d32", "#ed6c02", "#d32f2f", "#0288d1",
];

// Raw input record, as exported by the CRM.
// Monetary and date fields stay as raw JSON values; coercion happens in the engine.
// Text fields holding anything but a string read as missing, so the record
// keeps its amounts and falls back to the sentinels.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Deal {
	#[serde(default, deserialize_with = "lenient_string")]
	pub status: Option<String>,
	#[serde(default, deserialize_with = "lenient_string")]
	pub funil: Option<String>,
	#[serde(default, deserialize_with = "lenient_string")]
	pub pipeline_name: Option<String>,
	#[serde(default, deserialize_with = "lenient_string")]
	pub pipeline: Option<String>,
	#[serde(default, deserialize_with = "lenient_string")]
	pub nome_funil: Option<String>,
	#[serde(default, deserialize_with = "lenient_string")]
	pub estagio: Option<String>,
	pub ordem_estagio: Option<Value>,
	pub valor_recorrente: Option<Value>,
	pub valor_nao_recorrente: Option<Value>,
	pub valor: Option<Value>,
	pub data_fechamento: Option<Value>,
	pub previsao_fechamento: Option<Value>,
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
	D: Deserializer<'de>,
{
	match Option::<Value>::deserialize(deserializer)? {
		Some(Value::String(s)) => Ok(Some(s)),
		_ => Ok(None),
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DealStatus {
	Won,
	Open,
	Other,
}

impl DealStatus {
	pub fn from_label(label: &str) -> Self {
		match label {
			STATUS_WON => DealStatus::Won,
			STATUS_OPEN => DealStatus::Open,
			_ => DealStatus::Other,
		}
	}
}

/// Source keys that may carry the funnel name of a deal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunnelField {
	Funil,
	PipelineName,
	Pipeline,
	NomeFunil,
}

/// Which timestamp marks a won deal as closed in the monthly series.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DateField {
	#[default]
	#[serde(rename = "data_fechamento")]
	CloseDate,
	#[serde(rename = "previsao_fechamento")]
	ExpectedCloseDate,
}

impl DateField {
	pub fn as_str(&self) -> &'static str {
		match self {
			DateField::CloseDate => "data_fechamento",
			DateField::ExpectedCloseDate => "previsao_fechamento",
		}
	}
}

impl fmt::Display for DateField {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for DateField {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"data_fechamento" | "close" => Ok(DateField::CloseDate),
			"previsao_fechamento" | "forecast" => Ok(DateField::ExpectedCloseDate),
			other => Err(format!(
				"unknown date field '{}', expected data_fechamento or previsao_fechamento",
				other
			)),
		}
	}
}

impl Deal {
	pub fn status(&self) -> DealStatus {
		self.status
			.as_deref()
			.map(DealStatus::from_label)
			.unwrap_or(DealStatus::Other)
	}

	pub fn funnel_field(&self, field: FunnelField) -> Option<&str> {
		match field {
			FunnelField::Funil => self.funil.as_deref(),
			FunnelField::PipelineName => self.pipeline_name.as_deref(),
			FunnelField::Pipeline => self.pipeline.as_deref(),
			FunnelField::NomeFunil => self.nome_funil.as_deref(),
		}
	}

	pub fn date(&self, field: DateField) -> Option<&Value> {
		match field {
			DateField::CloseDate => self.data_fechamento.as_ref(),
			DateField::ExpectedCloseDate => self.previsao_fechamento.as_ref(),
		}
	}
}

// Settings models
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
	#[serde(default = "default_settings_version")]
	pub settings_version: u32,
	#[serde(default = "default_target_per_funnel")]
	pub target_per_funnel: f64,
	/// Per-funnel overrides of `target_per_funnel`.
	#[serde(default)]
	pub funnel_targets: HashMap<String, f64>,
	#[serde(default = "default_palette")]
	pub palette: Vec<String>,
	#[serde(default)]
	pub date_field: DateField,
	#[serde(default)]
	pub logging: LogConfig,
}

fn default_settings_version() -> u32 {
	1
}

fn default_target_per_funnel() -> f64 {
	DEFAULT_TARGET_PER_FUNNEL
}

pub fn default_palette() -> Vec<String> {
	DEFAULT_FUNNEL_COLORS.iter().map(|c| c.to_string()).collect()
}

impl Default for Settings {
	fn default() -> Self {
		Self {
			settings_version: default_settings_version(),
			target_per_funnel: default_target_per_funnel(),
			funnel_targets: HashMap::new(),
			palette: default_palette(),
			date_field: DateField::default(),
			logging: LogConfig::default(),
		}
	}
}

// Output models
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunnelAmount {
	pub funnel: String,
	pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyFunnelRow {
	pub month: String,
	/// One entry per funnel of the universe, in universe order.
	pub funnels: Vec<FunnelAmount>,
	pub total: f64,
}

impl MonthlyFunnelRow {
	pub fn amount(&self, funnel: &str) -> Option<f64> {
		self.funnels
			.iter()
			.find(|f| f.funnel == funnel)
			.map(|f| f.amount)
	}
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MonthlyFunnelSeries {
	pub rows: Vec<MonthlyFunnelRow>,
	/// Funnels with at least one won deal in the series.
	pub closed_funnels: Vec<String>,
	/// Closed funnels followed by funnels that only have open deals.
	pub funnels: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunnelPerformance {
	pub funnel: String,
	pub actual: f64,
	pub target: f64,
	pub prorated_target: f64,
	pub percentage: f64,
	pub prorated_percentage: f64,
	pub color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageBucket {
	pub stage: String,
	pub order: i64,
	pub count: usize,
	pub recurring: f64,
	pub non_recurring: f64,
}

impl StageBucket {
	pub fn total(&self) -> f64 {
		self.recurring + self.non_recurring
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunnelPipeline {
	pub funnel: String,
	pub stages: Vec<StageBucket>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastBucket {
	pub month_key: String,
	pub label: String,
	pub total: f64,
	pub date: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunnelForecast {
	pub funnel: String,
	pub months: Vec<ForecastBucket>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardMetadata {
	/// Wall-clock time the file was written; equals `reference_now` unless the caller stamps it.
	pub generated_at: String,
	pub reference_now: String,
	pub settings_version: u32,
	pub date_field: DateField,
	pub target_per_funnel: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dashboard {
	pub metadata: DashboardMetadata,
	pub monthly: MonthlyFunnelSeries,
	pub performance: Vec<FunnelPerformance>,
	pub pipelines: Vec<FunnelPipeline>,
	pub forecasts: Vec<FunnelForecast>,
}

fn round2(v: f64) -> f64 {
	(v * 100.0).round() / 100.0
}

impl Dashboard {
	/// Rounds every amount and percentage to cents for file output.
	pub fn rounded(mut self) -> Self {
		for row in self.monthly.rows.iter_mut() {
			for f in row.funnels.iter_mut() {
				f.amount = round2(f.amount);
			}
			row.total = round2(row.total);
		}
		for p in self.performance.iter_mut() {
			p.actual = round2(p.actual);
			p.target = round2(p.target);
			p.prorated_target = round2(p.prorated_target);
			p.percentage = round2(p.percentage);
			p.prorated_percentage = round2(p.prorated_percentage);
		}
		for pipeline in self.pipelines.iter_mut() {
			for s in pipeline.stages.iter_mut() {
				s.recurring = round2(s.recurring);
				s.non_recurring = round2(s.non_recurring);
			}
		}
		for forecast in self.forecasts.iter_mut() {
			for m in forecast.months.iter_mut() {
				m.total = round2(m.total);
			}
		}
		self
	}
}
