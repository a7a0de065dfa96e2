use crate::common::TopicHandler;

pub const PRIORITY: u16 = 125;

pub const VOCABULARY: &[&str] = &["chapter 7", "incarcerated", "professional judgment", "bankruptcy"];

pub fn handler() -> TopicHandler {
    TopicHandler {
        id: "bankruptcy_incarceration",
        trigger_vocabulary: VOCABULARY,
        topic_terms: VOCABULARY,
        sections: &["Non-Custodial Parent Waivers", "Professional Judgment Appeals"],
        confidence: 0.75,
    }
}
