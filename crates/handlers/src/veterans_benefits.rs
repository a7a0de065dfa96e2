use crate::common::TopicHandler;

pub const PRIORITY: u16 = 100;

pub const VOCABULARY: &[&str] = &["post-9/11", "gi bill", "yellow ribbon", "veteran"];

pub fn handler() -> TopicHandler {
    TopicHandler {
        id: "veterans_benefits",
        trigger_vocabulary: VOCABULARY,
        topic_terms: VOCABULARY,
        sections: &["Benefit Stacking"],
        confidence: 0.75,
    }
}
