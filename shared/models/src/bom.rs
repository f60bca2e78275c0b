//! Bill of materials domain models.
//!
//! A [`BomHeader`] is one version of the composition of a single parent part
//! type; its [`BomItem`]s are the component edges of the composition graph.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::part_type::{PartCategory, PartTypeId, DEFAULT_UNIT_OF_MEASURE};

pub type BomHeaderId = i64;
pub type BomItemId = i64;

/// Gap between consecutive item sequence numbers. Leaves room for manual
/// reinsertion without renumbering siblings.
pub const SEQUENCE_STEP: i32 = 10;

/// Sequence for the next item appended after `current_max`; `None` when
/// the step would overflow.
pub fn next_sequence(current_max: Option<i32>) -> Option<i32> {
    current_max.unwrap_or(0).checked_add(SEQUENCE_STEP)
}

/// One versioned composition definition of a part type.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BomHeader {
    pub id: BomHeaderId,
    pub part_type_id: PartTypeId,
    pub version: i32,
    pub is_active: bool,
    pub effective_date: DateTime<Utc>,
    pub expiration_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Ordered by (sequence, component part number).
    pub items: Vec<BomItem>,
}

impl BomHeader {
    /// Whether `at` falls inside the header's effective window.
    pub fn is_effective_at(&self, at: DateTime<Utc>) -> bool {
        at >= self.effective_date && self.expiration_date.map_or(true, |exp| at < exp)
    }

    pub fn contains_component(&self, part_type_id: PartTypeId) -> bool {
        self.items.iter().any(|i| i.component_part_type_id == part_type_id)
    }

    pub fn component_ids(&self) -> impl Iterator<Item = PartTypeId> + '_ {
        self.items.iter().map(|i| i.component_part_type_id)
    }
}

/// Component edge from a header to a part type.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BomItem {
    pub id: BomItemId,
    pub bom_header_id: BomHeaderId,
    pub component_part_type_id: PartTypeId,
    pub quantity: Decimal,
    pub unit_of_measure: String,
    pub sequence: i32,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub component: Option<ComponentSummary>,
}

impl BomItem {
    pub fn quantity_display(&self) -> String {
        format!("{} {}", self.quantity.normalize(), self.unit_of_measure)
    }
}

/// Display fields of the component joined onto an item listing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ComponentSummary {
    pub part_number: String,
    pub name: String,
    pub category: PartCategory,
    pub unit_of_measure: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
#[validate(schema(function = "validate_new_header_window"))]
pub struct NewBomHeader {
    pub part_type_id: PartTypeId,
    #[validate(range(min = 1, message = "Version must be at least 1"))]
    pub version: i32,
    pub is_active: bool,
    pub effective_date: DateTime<Utc>,
    pub expiration_date: Option<DateTime<Utc>>,
}

impl NewBomHeader {
    /// First active version of a part type's BOM, effective now.
    pub fn initial(part_type_id: PartTypeId) -> Self {
        Self {
            part_type_id,
            version: 1,
            is_active: true,
            effective_date: Utc::now(),
            expiration_date: None,
        }
    }
}

/// Mutable header metadata.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
#[validate(schema(function = "validate_header_update_window"))]
pub struct BomHeaderUpdate {
    pub id: BomHeaderId,
    #[validate(range(min = 1, message = "Version must be at least 1"))]
    pub version: i32,
    pub is_active: bool,
    pub effective_date: DateTime<Utc>,
    pub expiration_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct NewBomItem {
    pub component_part_type_id: PartTypeId,
    #[validate(custom = "validate_positive_quantity")]
    pub quantity: Decimal,
    #[validate(length(min = 1, max = 16))]
    pub unit_of_measure: String,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

impl NewBomItem {
    pub fn new(component_part_type_id: PartTypeId, quantity: Decimal) -> Self {
        Self {
            component_part_type_id,
            quantity,
            unit_of_measure: DEFAULT_UNIT_OF_MEASURE.to_string(),
            notes: None,
        }
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit_of_measure = unit.into();
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct BomItemUpdate {
    pub id: BomItemId,
    #[validate(custom = "validate_positive_quantity")]
    pub quantity: Decimal,
    #[validate(length(min = 1, max = 16))]
    pub unit_of_measure: String,
    pub sequence: i32,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

/// One line of a flattened multi-level explosion.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExplosionLine {
    /// 1 for direct components of the exploded part.
    pub level: usize,
    pub part_type_id: PartTypeId,
    pub part_number: String,
    pub part_name: String,
    /// Item quantity multiplied through every level above.
    pub quantity: Decimal,
    pub unit_of_measure: String,
    pub category: PartCategory,
}

impl ExplosionLine {
    pub fn indented_part_number(&self) -> String {
        format!("{}{}", " ".repeat(self.level * 4), self.part_number)
    }
}

fn validate_positive_quantity(quantity: &Decimal) -> Result<(), ValidationError> {
    if quantity.is_sign_positive() && !quantity.is_zero() {
        Ok(())
    } else {
        Err(ValidationError::new("quantity_not_positive"))
    }
}

fn check_window(
    effective: DateTime<Utc>,
    expiration: Option<DateTime<Utc>>,
) -> Result<(), ValidationError> {
    match expiration {
        Some(exp) if exp < effective => Err(ValidationError::new("expiration_before_effective")),
        _ => Ok(()),
    }
}

fn validate_new_header_window(header: &NewBomHeader) -> Result<(), ValidationError> {
    check_window(header.effective_date, header.expiration_date)
}

fn validate_header_update_window(update: &BomHeaderUpdate) -> Result<(), ValidationError> {
    check_window(update.effective_date, update.expiration_date)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn sequence_starts_at_ten_and_steps_by_ten() {
        assert_eq!(next_sequence(None), Some(10));
        assert_eq!(next_sequence(Some(10)), Some(20));
        assert_eq!(next_sequence(Some(35)), Some(45));
    }

    #[test]
    fn sequence_near_the_top_has_no_successor() {
        assert_eq!(next_sequence(Some(i32::MAX - SEQUENCE_STEP)), Some(i32::MAX));
        assert_eq!(next_sequence(Some(i32::MAX)), None);
        assert_eq!(next_sequence(Some(-5)), Some(5));
    }

    #[test]
    fn item_quantity_must_be_positive() {
        assert!(NewBomItem::new(1, Decimal::from(4)).validate().is_ok());
        assert!(NewBomItem::new(1, Decimal::new(25, 2)).validate().is_ok());
        assert!(NewBomItem::new(1, Decimal::ZERO).validate().is_err());
        assert!(NewBomItem::new(1, Decimal::from(-1)).validate().is_err());
    }

    #[test]
    fn item_unit_must_not_be_empty() {
        let item = NewBomItem::new(1, Decimal::ONE).with_unit("");
        assert!(item.validate().is_err());
    }

    #[test]
    fn header_window_rejects_expiration_before_effective() {
        let mut header = NewBomHeader::initial(1);
        assert!(header.validate().is_ok());

        header.expiration_date = Some(header.effective_date - Duration::days(1));
        assert!(header.validate().is_err());

        header.expiration_date = Some(header.effective_date + Duration::days(30));
        assert!(header.validate().is_ok());
    }

    #[test]
    fn header_version_starts_at_one() {
        let mut header = NewBomHeader::initial(1);
        header.version = 0;
        assert!(header.validate().is_err());
    }

    #[test]
    fn effective_window_is_half_open() {
        let now = Utc::now();
        let header = BomHeader {
            id: 1,
            part_type_id: 1,
            version: 1,
            is_active: true,
            effective_date: now,
            expiration_date: Some(now + Duration::days(10)),
            created_at: now,
            updated_at: now,
            items: Vec::new(),
        };

        assert!(header.is_effective_at(now));
        assert!(header.is_effective_at(now + Duration::days(9)));
        assert!(!header.is_effective_at(now + Duration::days(10)));
        assert!(!header.is_effective_at(now - Duration::seconds(1)));
    }

    #[test]
    fn quantity_display_drops_trailing_zeros() {
        let item = BomItem {
            id: 1,
            bom_header_id: 1,
            component_part_type_id: 2,
            quantity: Decimal::new(4000, 3),
            unit_of_measure: "EA".to_string(),
            sequence: 10,
            notes: None,
            created_at: Utc::now(),
            component: None,
        };
        assert_eq!(item.quantity_display(), "4 EA");
    }
}
