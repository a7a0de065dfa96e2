use crate::common::TopicHandler;

pub const PRIORITY: u16 = 130;

pub const VOCABULARY: &[&str] = &["tribal", "bia", "cdib", "navajo"];

pub fn handler() -> TopicHandler {
    TopicHandler {
        id: "tribal",
        trigger_vocabulary: VOCABULARY,
        topic_terms: VOCABULARY,
        sections: &["BIA Higher Education Grant", "Tribal College Pathways", "Enrollment vs. Blood Quantum"],
        confidence: 0.75,
    }
}
