use crate::error::{BomError, BomResult};
use rust_decimal::Decimal;
use validator::{Validate, ValidationErrors, ValidationErrorsKind};

pub fn validate_model<T: Validate>(model: &T) -> BomResult<()> {
    match model.validate() {
        Ok(()) => Ok(()),
        Err(errors) => {
            let (field, message) = first_field_and_messages(&errors);
            Err(BomError::validation(field, message))
        }
    }
}

pub fn format_validation_errors(errors: &ValidationErrors) -> String {
    let mut messages = Vec::new();

    for (field, kind) in errors.errors() {
        let field_errors = match kind {
            ValidationErrorsKind::Field(field_errors) => field_errors,
            // Nested structs are not used by the BOM payloads.
            _ => continue,
        };

        for error in field_errors {
            let message = match (*field, &*error.code) {
                ("__all__", "expiration_before_effective") => {
                    "Expiration date must not be before the effective date".to_string()
                }
                (_, "quantity_not_positive") => "Quantity must be greater than zero.".to_string(),
                (_, "length") => format!("Length validation failed for field '{}'", field),
                (_, "range") => format!("Value out of range for field '{}'", field),
                (_, "required") => format!("Field '{}' is required", field),
                (_, code) => format!("Validation failed for field '{}': {}", field, code),
            };
            messages.push(message);
        }
    }

    messages.sort();
    messages.join(", ")
}

fn first_field_and_messages(errors: &ValidationErrors) -> (String, String) {
    let mut fields: Vec<&str> = errors.errors().keys().copied().collect();
    fields.sort_unstable();
    let field = match fields.first() {
        Some(&"__all__") | None => "model".to_string(),
        Some(field) => field.to_string(),
    };
    (field, format_validation_errors(errors))
}

pub fn validate_quantity(quantity: Decimal) -> BomResult<()> {
    if quantity <= Decimal::ZERO {
        return Err(BomError::validation(
            "quantity",
            "Quantity must be greater than zero.",
        ));
    }
    Ok(())
}
