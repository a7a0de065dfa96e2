use crate::common::TopicHandler;

pub const PRIORITY: u16 = 135;

pub const VOCABULARY: &[&str] = &["dependent", "active duty", "gi bill", "military dependent"];

pub fn handler() -> TopicHandler {
    TopicHandler {
        id: "military_dependent",
        trigger_vocabulary: VOCABULARY,
        topic_terms: VOCABULARY,
        sections: &["In-State Eligibility", "Yellow Ribbon Program", "DODEA Transcript Handling"],
        confidence: 0.8,
    }
}
