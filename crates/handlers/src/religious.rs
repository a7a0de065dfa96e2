use crate::common::TopicHandler;

pub const PRIORITY: u16 = 115;

pub const VOCABULARY: &[&str] = &["sabbath", "kosher", "halal", "religious exemption"];

pub fn handler() -> TopicHandler {
    TopicHandler {
        id: "religious",
        trigger_vocabulary: VOCABULARY,
        topic_terms: VOCABULARY,
        sections: &["Accommodation Policy"],
        confidence: 0.7,
    }
}
