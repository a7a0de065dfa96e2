//! A small, illustrative corpus bundled with the binary so `meridian ask`
//! and `meridian doctor` have something concrete to query without a real
//! ingestion pipeline (out of scope, spec §1). Mirrors the shape of the
//! `storage` crate's own test fixtures, just larger and across every
//! collection.

use std::collections::BTreeMap;

use chrono::{TimeZone, Utc};
use meridian_core::{Collection, Document};
use meridian_storage::{content_hash, CorpusBuilder};

fn tags(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
}

fn doc(
    id: &str,
    collection: Collection,
    source_url: &str,
    body: &str,
    year: i32,
    entity_tags: BTreeMap<String, String>,
) -> Document {
    let last_verified = Utc.with_ymd_and_hms(year, 6, 1, 0, 0, 0).unwrap();
    Document::new(id, collection, source_url, body, last_verified, entity_tags, content_hash(body))
        .expect("bundled fixture documents satisfy their collection's required tags")
}

/// Builds the bundled fixture as a ready-to-use [`CorpusBuilder`]. Callers
/// finish it (or pass it to [`meridian_storage::InMemoryCorpus::replace`]
/// to reload at runtime) rather than receiving a built corpus directly, so
/// `ingest-fixture` can rebuild it on demand.
pub fn builder() -> CorpusBuilder {
    CorpusBuilder::new()
        .add(doc(
            "aid-pell-001",
            Collection::AidPolicies,
            "https://studentaid.gov/understand-aid/types/grants/pell",
            "Federal Pell Grant eligibility is determined by the Student Aid Index and enrollment \
             intensity; DACA and TPS recipients remain federally ineligible regardless of financial \
             need, though many states and institutions offer equivalent need-based aid from state or \
             institutional funds.",
            2024,
            tags(&[("institution", "federal"), ("policy_topic", "pell_grant")]),
        ))
        .add(doc(
            "aid-parent-plus-001",
            Collection::AidPolicies,
            "https://studentaid.gov/understand-aid/types/loans/plus/parent",
            "A parent denied a Direct PLUS Loan due to adverse credit history does not change the \
             student's dependency status; the student instead becomes eligible for additional \
             unsubsidized Direct Loan funds once the parent's denial is on file with the servicer.",
            2024,
            tags(&[("institution", "federal"), ("policy_topic", "parent_plus_denial")]),
        ))
        .add(doc(
            "aid-foster-001",
            Collection::AidPolicies,
            "https://studentaid.gov/apply-for-aid/fafsa/filling-out/dependency",
            "Students who were in foster care at any point after age 13, or who are unaccompanied \
             and homeless as determined by a school or shelter official, are considered independent \
             for FAFSA purposes and file without parental financial information.",
            2024,
            tags(&[("institution", "federal"), ("policy_topic", "foster_care_independence")]),
        ))
        .add(doc(
            "gate-ucsd-cs-001",
            Collection::MajorGates,
            "https://cse.ucsd.edu/undergraduate/advising/transfer-admissions",
            "Internal transfer into Computer Science requires a 3.2 cumulative GPA across the \
             preparatory course sequence; the program is capacity-impacted and admits by competitive \
             review each cycle rather than by threshold alone.",
            2024,
            tags(&[
                ("institution", "UC San Diego"),
                ("major", "Computer Science"),
                ("gpa_threshold", "3.2"),
                ("capacity_flag", "impacted"),
            ]),
        ))
        .add(doc(
            "cds-ucb-001",
            Collection::CdsData,
            "https://opa.berkeley.edu/campus-data/common-data-set",
            "Published cost of attendance components for the current academic year: tuition and \
             fees, on-campus housing, food, books and supplies, and transportation, reported per the \
             Common Data Set format.",
            2024,
            tags(&[
                ("institution", "UC Berkeley"),
                ("academic_year", "2024-25"),
                ("metric_kind", "cost_of_attendance"),
                ("tuition", "14436"),
                ("fees", "2700"),
                ("housing_cost", "18000"),
                ("food", "3200"),
                ("books", "1200"),
                ("transportation", "1100"),
            ]),
        ))
        .add(doc(
            "artic-ccc-ucsd-001",
            Collection::Articulation,
            "https://assist.org/transfer/results",
            "CIS 22A and CIS 22B at the community college articulate to CSE 8A and CSE 8B; a maximum \
             of 70 semester units transfer, and the Transfer Admission Guarantee applies only to \
             students who complete the full preparatory pattern by the spring prior to transfer.",
            2024,
            tags(&[
                ("origin_institution", "community college district"),
                ("destination_institution", "UC San Diego"),
                ("course_equivalence", "CIS 22A/22B -> CSE 8A/8B"),
            ]),
        ))
        .add(doc(
            "cited-504-001",
            Collection::CitedAnswers,
            "https://www2.ed.gov/about/offices/list/ocr/504faq.html",
            "Section 504 and ADA accommodations guarantee equal access to coursework, not a reduced \
             course load at full aid eligibility; a financial aid office may use professional judgment \
             to treat a documented reduced load as full-time for aid purposes on a case-by-case basis.",
            2024,
            tags(&[("topic", "disability_accommodations")]),
        ))
        .add(doc(
            "cited-cc-transfer-001",
            Collection::CitedAnswers,
            "https://www.universityofcalifornia.edu/admissions/transfer",
            "Community college transfer applicants are evaluated on major preparation, GPA in \
             required courses, and completion of the transferable general education pattern.",
            2023,
            tags(&[("topic", "community_college_transfer")]),
        ))
}
