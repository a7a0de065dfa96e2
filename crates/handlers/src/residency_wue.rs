use crate::common::TopicHandler;

pub const PRIORITY: u16 = 100;

pub const VOCABULARY: &[&str] = &["residency", "wue", "in-state", "out-of-state"];

pub fn handler() -> TopicHandler {
    TopicHandler {
        id: "residency_wue",
        trigger_vocabulary: VOCABULARY,
        topic_terms: VOCABULARY,
        sections: &["Physical Presence and Intent", "Financial Independence", "WUE Exclusions"],
        confidence: 0.7,
    }
}
