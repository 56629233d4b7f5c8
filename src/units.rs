//! Weight units - display label and kg/lbs conversion

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::store::{KeyValueStore, UNIT_SYSTEM_KEY};

const LBS_PER_KG: f64 = 2.20462;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum UnitSystem {
    #[default]
    Metric,
    Imperial,
}

impl UnitSystem {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnitSystem::Metric => "metric",
            UnitSystem::Imperial => "imperial",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "metric" => Some(UnitSystem::Metric),
            "imperial" => Some(UnitSystem::Imperial),
            _ => None,
        }
    }

    /// Read the preference, metric when missing or unreadable
    pub fn load(store: &dyn KeyValueStore) -> Self {
        match store.get_item(UNIT_SYSTEM_KEY) {
            Ok(Some(value)) => Self::parse(&value).unwrap_or_default(),
            Ok(None) => Self::default(),
            Err(e) => {
                warn!("Failed to read unit system: {}", e);
                Self::default()
            }
        }
    }

    pub fn save(&self, store: &dyn KeyValueStore) -> anyhow::Result<()> {
        store.set_item(UNIT_SYSTEM_KEY, self.as_str())
    }

    /// Label shown next to weight inputs
    pub fn weight_unit(&self) -> &'static str {
        match self {
            UnitSystem::Metric => "kg",
            UnitSystem::Imperial => "lbs",
        }
    }

    /// Stored kilograms to display units, lbs rounded to one decimal
    pub fn convert_weight(&self, kg: f64) -> f64 {
        match self {
            UnitSystem::Metric => kg,
            UnitSystem::Imperial => (kg * LBS_PER_KG * 10.0).round() / 10.0,
        }
    }

    pub fn format_weight(&self, kg: f64) -> String {
        format!("{} {}", self.convert_weight(kg), self.weight_unit())
    }

    /// Typed weight back to kilograms, 0 for non-numeric input
    pub fn parse_weight_input(&self, raw: &str) -> f64 {
        let Some(value) = crate::session::input::parse_float_prefix(raw) else {
            return 0.0;
        };
        match self {
            UnitSystem::Metric => value,
            UnitSystem::Imperial => value / LBS_PER_KG,
        }
    }
}
