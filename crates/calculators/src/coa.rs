use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use meridian_core::{Citation, CalculationRecord};

pub const COA_FORMULA_VERSION: &str = "coa-published-components-v1";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResidencyStatus {
    InState,
    OutOfState,
    International,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HousingType {
    OnCampus,
    OffCampus,
    WithFamily,
}

/// Published cost components for one institution / residency / housing
/// / academic-year combination, already resolved by the caller from
/// `cds_data` (the calculator does no lookup of its own — spec §4.5
/// names the calculator as pure compute over inputs, with the lookup
/// itself being a Storage-boundary concern upstream of it).
#[derive(Debug, Clone, PartialEq)]
pub struct CoaInputs {
    pub institution: String,
    pub academic_year: String,
    pub residency: ResidencyStatus,
    pub housing: HousingType,
    pub tuition: f64,
    pub fees: f64,
    pub housing_cost: f64,
    pub food: f64,
    pub books: f64,
    pub transportation: f64,
    pub source_url: String,
    pub last_verified: DateTime<Utc>,
}

#[derive(Debug, thiserror::Error)]
pub enum CoaError {
    #[error("negative published component: {field} = {value}")]
    NegativeComponent { field: &'static str, value: f64 },
    #[error("institution name must not be empty")]
    EmptyInstitution,
    #[error("a student living with family has no published housing component to assess, but {0} was supplied")]
    UnexpectedHousingCostForFamilyResidence(f64),
}

#[derive(Debug, Clone)]
pub struct CoaResult {
    pub total: f64,
    pub components: BTreeMap<String, f64>,
    pub version: String,
    pub citation: Citation,
}

impl CoaResult {
    pub fn into_record(self, inputs: &CoaInputs) -> CalculationRecord {
        let mut raw_inputs = BTreeMap::new();
        raw_inputs.insert("tuition".to_string(), inputs.tuition);
        raw_inputs.insert("fees".to_string(), inputs.fees);
        raw_inputs.insert("housing_cost".to_string(), inputs.housing_cost);
        raw_inputs.insert("food".to_string(), inputs.food);
        raw_inputs.insert("books".to_string(), inputs.books);
        raw_inputs.insert("transportation".to_string(), inputs.transportation);

        let mut outputs = self.components.clone();
        outputs.insert("total".to_string(), self.total);

        CalculationRecord {
            name: "coa".to_string(),
            version: self.version,
            inputs: raw_inputs,
            outputs,
            citation: self.citation,
        }
    }
}

/// Sum published Cost of Attendance components for one institution.
///
/// Residency status is part of the inputs' identity (it determines
/// which published tuition figure the caller resolved) but does not
/// change the arithmetic here; it is carried through to the citation
/// so the result stays traceable to the specific published row it was
/// drawn from.
pub fn compute_coa(inputs: CoaInputs) -> Result<CoaResult, CoaError> {
    if inputs.institution.trim().is_empty() {
        return Err(CoaError::EmptyInstitution);
    }
    for (field, value) in [
        ("tuition", inputs.tuition),
        ("fees", inputs.fees),
        ("housing_cost", inputs.housing_cost),
        ("food", inputs.food),
        ("books", inputs.books),
        ("transportation", inputs.transportation),
    ] {
        if value < 0.0 {
            return Err(CoaError::NegativeComponent { field, value });
        }
    }
    if inputs.housing == HousingType::WithFamily && inputs.housing_cost > 0.0 {
        return Err(CoaError::UnexpectedHousingCostForFamilyResidence(inputs.housing_cost));
    }

    let total = inputs.tuition
        + inputs.fees
        + inputs.housing_cost
        + inputs.food
        + inputs.books
        + inputs.transportation;

    let mut components = BTreeMap::new();
    components.insert("tuition".to_string(), inputs.tuition);
    components.insert("fees".to_string(), inputs.fees);
    components.insert("housing_cost".to_string(), inputs.housing_cost);
    components.insert("food".to_string(), inputs.food);
    components.insert("books".to_string(), inputs.books);
    components.insert("transportation".to_string(), inputs.transportation);

    let citation = Citation::formula(COA_FORMULA_VERSION);

    Ok(CoaResult {
        total,
        components,
        version: COA_FORMULA_VERSION.to_string(),
        citation,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs() -> CoaInputs {
        CoaInputs {
            institution: "Example University".to_string(),
            academic_year: "2024-25".to_string(),
            residency: ResidencyStatus::InState,
            housing: HousingType::OnCampus,
            tuition: 12_000.0,
            fees: 1_500.0,
            housing_cost: 14_000.0,
            food: 5_500.0,
            books: 1_200.0,
            transportation: 900.0,
            source_url: "https://example.edu/cost-of-attendance".to_string(),
            last_verified: Utc::now(),
        }
    }

    #[test]
    fn sums_all_published_components() {
        let result = compute_coa(inputs()).unwrap();
        assert_eq!(result.total, 12_000.0 + 1_500.0 + 14_000.0 + 5_500.0 + 1_200.0 + 900.0);
    }

    #[test]
    fn rejects_negative_component() {
        assert!(matches!(
            compute_coa(CoaInputs { tuition: -1.0, ..inputs() }),
            Err(CoaError::NegativeComponent { field: "tuition", .. })
        ));
    }

    #[test]
    fn rejects_empty_institution() {
        assert!(matches!(
            compute_coa(CoaInputs { institution: String::new(), ..inputs() }),
            Err(CoaError::EmptyInstitution)
        ));
    }

    #[test]
    fn family_residence_with_nonzero_housing_cost_is_rejected() {
        let result = compute_coa(CoaInputs {
            housing: HousingType::WithFamily,
            housing_cost: 500.0,
            ..inputs()
        });
        assert!(matches!(
            result,
            Err(CoaError::UnexpectedHousingCostForFamilyResidence(_))
        ));
    }

    #[test]
    fn citation_is_a_formula_kind_citation() {
        let result = compute_coa(inputs()).unwrap();
        assert_eq!(result.citation.url, format!("formula:{COA_FORMULA_VERSION}"));
        assert_eq!(result.citation.kind, meridian_core::CitationKind::Formula);
    }
}
