// src/common/validation.rs

use chrono::NaiveDate;
use rust_decimal::Decimal;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::common::error::AppError;

/// Regras que o `#[derive(Validate)]` não expressa por campo (datas cruzadas,
/// contato condicional). Os erros entram no mesmo mapa, com o nome do campo afetado.
pub trait CrossFieldRules: Validate {
    fn cross_field_rules(&self, _errors: &mut ValidationErrors) {}

    fn validate_all(&self) -> Result<(), AppError> {
        let mut errors = self.validate().err().unwrap_or_default();
        self.cross_field_rules(&mut errors);
        if errors.errors().is_empty() {
            Ok(())
        } else {
            Err(AppError::ValidationError(errors))
        }
    }
}

/// Aceita `12345678901` ou `123.456.789-01`.
pub fn validate_cpf(cpf: &str) -> Result<(), ValidationError> {
    let well_formed = cpf.chars().all(|c| c.is_ascii_digit() || c == '.' || c == '-');
    let digits = cpf.chars().filter(|c| c.is_ascii_digit()).count();
    if well_formed && digits == 11 {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_cpf"))
    }
}

pub fn validate_non_negative(value: &Decimal) -> Result<(), ValidationError> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(ValidationError::new("negative_value"));
    }
    Ok(())
}

pub fn check_date_range(
    start: NaiveDate,
    end: Option<NaiveDate>,
    end_field: &'static str,
    errors: &mut ValidationErrors,
) {
    if end.is_some_and(|end| end < start) {
        errors.add(end_field, ValidationError::new("invalid_date_range"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn cpf_accepts_plain_and_formatted_digits() {
        assert!(validate_cpf("12345678901").is_ok());
        assert!(validate_cpf("123.456.789-01").is_ok());
        assert!(validate_cpf("1234567890").is_err());
        assert!(validate_cpf("123.456.789-0a").is_err());
    }

    #[test]
    fn negative_amounts_are_rejected() {
        assert!(validate_non_negative(&Decimal::from_str("150.00").unwrap()).is_ok());
        assert!(validate_non_negative(&Decimal::ZERO).is_ok());
        assert!(validate_non_negative(&Decimal::from_str("-0.01").unwrap()).is_err());
    }

    #[test]
    fn end_before_start_is_reported_on_the_end_field() {
        let start = NaiveDate::from_ymd_opt(2026, 3, 10).unwrap();
        let mut errors = ValidationErrors::new();
        check_date_range(start, NaiveDate::from_ymd_opt(2026, 3, 1), "end_date", &mut errors);
        assert!(errors.field_errors().contains_key("end_date"));

        let mut errors = ValidationErrors::new();
        check_date_range(start, None, "end_date", &mut errors);
        check_date_range(start, Some(start), "end_date", &mut errors);
        assert!(errors.errors().is_empty());
    }
}
