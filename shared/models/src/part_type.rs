//! Part type domain models.
//!
//! Part types are the nodes of the composition graph. They are owned by the
//! catalog; BOM entities only reference them by id.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

pub type PartTypeId = i64;
pub type ScenarioId = i64;

/// Unit of measure used when none is given.
pub const DEFAULT_UNIT_OF_MEASURE: &str = "EA";

/// Manufacturable or purchasable item.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct PartType {
    pub id: PartTypeId,
    #[validate(length(min = 1, max = 64, message = "Part number must be between 1 and 64 characters"))]
    pub part_number: String,
    #[validate(length(min = 1, max = 200, message = "Name must be between 1 and 200 characters"))]
    pub name: String,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    pub category: PartCategory,
    #[validate(length(min = 1, max = 16))]
    pub unit_of_measure: String,
    pub unit_cost: Decimal,
    /// `None` for global parts visible in every scenario.
    pub scenario_id: Option<ScenarioId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartCategory {
    RawMaterial,
    Component,
    SubAssembly,
    FinishedGood,
}

impl PartCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RawMaterial => "raw_material",
            Self::Component => "component",
            Self::SubAssembly => "sub_assembly",
            Self::FinishedGood => "finished_good",
        }
    }

    /// Parse the stored form. Accepts the snake_case names only.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "raw_material" => Some(Self::RawMaterial),
            "component" => Some(Self::Component),
            "sub_assembly" => Some(Self::SubAssembly),
            "finished_good" => Some(Self::FinishedGood),
            _ => None,
        }
    }

    /// Raw materials are bought as-is and never carry a BOM.
    pub fn can_have_bom(&self) -> bool {
        !matches!(self, Self::RawMaterial)
    }
}

impl std::fmt::Display for PartCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Default for PartType {
    fn default() -> Self {
        Self {
            id: 0,
            part_number: String::new(),
            name: String::new(),
            description: None,
            category: PartCategory::Component,
            unit_of_measure: DEFAULT_UNIT_OF_MEASURE.to_string(),
            unit_cost: Decimal::ZERO,
            scenario_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }
}

impl PartType {
    /// Creates an unsaved part type; the store assigns the id.
    pub fn new(part_number: impl Into<String>, name: impl Into<String>, category: PartCategory) -> Self {
        Self {
            part_number: part_number.into(),
            name: name.into(),
            category,
            ..Self::default()
        }
    }

    pub fn display_name(&self) -> String {
        format!("{} - {}", self.part_number, self.name)
    }

    pub fn can_have_bom(&self) -> bool {
        self.category.can_have_bom()
    }

    /// True when the part is visible from `scenario`: global parts are
    /// visible everywhere, scoped parts only in their own scenario. `None`
    /// is the unscoped view and sees every part.
    pub fn is_visible_in(&self, scenario: Option<ScenarioId>) -> bool {
        match (self.scenario_id, scenario) {
            (None, _) => true,
            (Some(own), Some(requested)) => own == requested,
            (Some(_), None) => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_materials_cannot_have_a_bom() {
        assert!(!PartCategory::RawMaterial.can_have_bom());
        assert!(PartCategory::Component.can_have_bom());
        assert!(PartCategory::SubAssembly.can_have_bom());
        assert!(PartCategory::FinishedGood.can_have_bom());
    }

    #[test]
    fn display_name_joins_number_and_name() {
        let part = PartType::new("WIDGET", "Widget", PartCategory::FinishedGood);
        assert_eq!(part.display_name(), "WIDGET - Widget");
    }

    #[test]
    fn category_parse_rejects_unknown() {
        assert_eq!(PartCategory::parse("sub_assembly"), Some(PartCategory::SubAssembly));
        assert_eq!(PartCategory::parse("SubAssembly"), None);
    }

    #[test]
    fn scoped_parts_hidden_from_other_scenarios() {
        let mut part = PartType::new("P-1", "Part", PartCategory::Component);
        assert!(part.is_visible_in(Some(7)));

        part.scenario_id = Some(3);
        assert!(part.is_visible_in(Some(3)));
        assert!(!part.is_visible_in(Some(7)));
        assert!(part.is_visible_in(None));
    }
}
