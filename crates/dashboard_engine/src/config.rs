use std::collections::HashMap;

use models::{DateField, Settings, DEFAULT_TARGET_PER_FUNNEL};

const DEFAULT_SETTINGS_VERSION: u32 = 1;

use crate::error::{EngineError, Result};

/// Engine parameters. Targets are validated on the way in so the passes can
/// divide by them without checks.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    target_per_funnel: f64,
    funnel_targets: HashMap<String, f64>,
    palette: Vec<String>,
    date_field: DateField,
    settings_version: u32,
}

fn check_target(label: &str, target: f64) -> Result<f64> {
    if target.is_finite() && target > 0.0 {
        Ok(target)
    } else {
        Err(EngineError::InvalidConfig(format!(
            "target for {} must be a positive number, got {}",
            label, target
        )))
    }
}

impl EngineConfig {
    pub fn new(target_per_funnel: f64) -> Result<Self> {
        Ok(Self {
            target_per_funnel: check_target("every funnel", target_per_funnel)?,
            funnel_targets: HashMap::new(),
            palette: models::default_palette(),
            date_field: DateField::default(),
            settings_version: DEFAULT_SETTINGS_VERSION,
        })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let mut config = Self::new(settings.target_per_funnel)?
            .with_palette(settings.palette.clone())?
            .with_date_field(settings.date_field);
        config.settings_version = settings.settings_version;
        for (funnel, target) in &settings.funnel_targets {
            config = config.with_funnel_target(funnel.clone(), *target)?;
        }
        Ok(config)
    }

    pub fn with_funnel_target(mut self, funnel: impl Into<String>, target: f64) -> Result<Self> {
        let funnel = funnel.into();
        let target = check_target(&format!("funnel '{}'", funnel), target)?;
        self.funnel_targets.insert(funnel, target);
        Ok(self)
    }

    pub fn with_palette(mut self, palette: Vec<String>) -> Result<Self> {
        if palette.is_empty() {
            return Err(EngineError::InvalidConfig(
                "palette needs at least one color".to_string(),
            ));
        }
        self.palette = palette;
        Ok(self)
    }

    pub fn with_date_field(mut self, date_field: DateField) -> Self {
        self.date_field = date_field;
        self
    }

    pub fn target_per_funnel(&self) -> f64 {
        self.target_per_funnel
    }

    pub fn target_for(&self, funnel: &str) -> f64 {
        self.funnel_targets
            .get(funnel)
            .copied()
            .unwrap_or(self.target_per_funnel)
    }

    /// Palette entry for the funnel at `index` in the universe, cycling.
    pub fn color_for(&self, index: usize) -> &str {
        &self.palette[index % self.palette.len()]
    }

    pub fn date_field(&self) -> DateField {
        self.date_field
    }

    /// Version of the settings file this config was built from.
    pub fn settings_version(&self) -> u32 {
        self.settings_version
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            target_per_funnel: DEFAULT_TARGET_PER_FUNNEL,
            funnel_targets: HashMap::new(),
            palette: models::default_palette(),
            date_field: DateField::default(),
            settings_version: DEFAULT_SETTINGS_VERSION,
        }
    }
}
