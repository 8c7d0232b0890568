use serde::{Deserialize, Serialize};
use time::{Date, Month};

use crate::classify::keywords::{self, NormalizedText};
use crate::domain::WarrantyClass;
use crate::error::AppError;

/// Category lookup, checked in order. Structure wins over installations when a category
/// names both.
const CLASS_TABLE: [(WarrantyClass, &[&str]); 3] = [
    (WarrantyClass::Estructura, keywords::STRUCTURE_CATEGORY),
    (WarrantyClass::Instalaciones, INSTALLATION_CATEGORY),
    (WarrantyClass::Terminaciones, keywords::FINISHES_CATEGORY),
];

const INSTALLATION_CATEGORY: &[&str] = &[
    "electric*",
    "eléctric*",
    "electricidad",
    "agua",
    "plomeria",
    "plomería",
    "gasfiteria",
    "gasfitería",
    "sanitari*",
    "instalacion*",
    "instalación",
];

pub fn warranty_class_for(category: &str) -> Option<WarrantyClass> {
    let text = NormalizedText::new(category);
    if text.is_blank() {
        return None;
    }
    CLASS_TABLE
        .iter()
        .find(|(_, terms)| text.matches_any(terms))
        .map(|(class, _)| *class)
}

/// Warranty length per class, in years. Required configuration: there is no default table.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct WarrantyDurations {
    pub estructura_years: u16,
    pub instalaciones_years: u16,
    pub terminaciones_years: u16,
}

impl WarrantyDurations {
    pub fn years_for(&self, class: WarrantyClass) -> u16 {
        match class {
            WarrantyClass::Estructura => self.estructura_years,
            WarrantyClass::Instalaciones => self.instalaciones_years,
            WarrantyClass::Terminaciones => self.terminaciones_years,
        }
    }

    pub fn validate(&self) -> Result<(), AppError> {
        for (class, years) in [
            ("estructura_years", self.estructura_years),
            ("instalaciones_years", self.instalaciones_years),
            ("terminaciones_years", self.terminaciones_years),
        ] {
            if years == 0 {
                return Err(AppError::new(
                    "CONFIG_WARRANTY_DURATION_INVALID",
                    format!("warranty.{class} must be at least 1 year"),
                ));
            }
        }
        Ok(())
    }
}

/// Resolves warranty expiry and validity from a housing delivery date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WarrantyResolver {
    durations: WarrantyDurations,
}

impl WarrantyResolver {
    pub fn new(durations: WarrantyDurations) -> Result<Self, AppError> {
        durations.validate()?;
        Ok(Self { durations })
    }

    pub fn durations(&self) -> &WarrantyDurations {
        &self.durations
    }

    pub fn compute_expiry(
        &self,
        delivery: Option<Date>,
        class: Option<WarrantyClass>,
    ) -> Option<Date> {
        let (delivery, class) = (delivery?, class?);
        Some(add_years(delivery, self.durations.years_for(class)))
    }

    /// Valid through the expiry date inclusive.
    pub fn is_currently_valid(
        &self,
        delivery: Option<Date>,
        class: Option<WarrantyClass>,
        today: Date,
    ) -> Option<bool> {
        self.compute_expiry(delivery, class)
            .map(|expiry| today <= expiry)
    }
}

// Feb 29 lands on Feb 28 when the target year is not a leap year.
fn add_years(date: Date, years: u16) -> Date {
    let target = date.year().saturating_add(i32::from(years));
    date.replace_year(target).unwrap_or_else(|_| {
        Date::from_calendar_date(target, Month::February, 28).unwrap_or(Date::MAX)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    fn resolver() -> WarrantyResolver {
        WarrantyResolver::new(WarrantyDurations {
            estructura_years: 10,
            instalaciones_years: 5,
            terminaciones_years: 3,
        })
        .expect("resolver")
    }

    #[test]
    fn leap_day_delivery_clamps_to_feb_28() {
        assert_eq!(add_years(date!(2024 - 02 - 29), 3), date!(2027 - 02 - 28));
        assert_eq!(add_years(date!(2024 - 02 - 29), 4), date!(2028 - 02 - 29));
    }

    #[test]
    fn zero_years_is_rejected() {
        let err = WarrantyResolver::new(WarrantyDurations {
            estructura_years: 10,
            instalaciones_years: 0,
            terminaciones_years: 3,
        })
        .unwrap_err();
        assert_eq!(err.code, "CONFIG_WARRANTY_DURATION_INVALID");
        assert!(err.message.contains("instalaciones_years"));
    }

    #[test]
    fn validity_is_inclusive_of_expiry_day() {
        let r = resolver();
        let delivery = Some(date!(2020 - 06 - 15));
        let class = Some(WarrantyClass::Terminaciones);
        assert_eq!(r.compute_expiry(delivery, class), Some(date!(2023 - 06 - 15)));
        assert_eq!(
            r.is_currently_valid(delivery, class, date!(2023 - 06 - 15)),
            Some(true)
        );
        assert_eq!(
            r.is_currently_valid(delivery, class, date!(2023 - 06 - 16)),
            Some(false)
        );
    }
}
