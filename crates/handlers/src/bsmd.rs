use crate::common::TopicHandler;

pub const PRIORITY: u16 = 100;

pub const VOCABULARY: &[&str] = &["bs/md", "plme", "pre-med"];

pub fn handler() -> TopicHandler {
    TopicHandler {
        id: "bsmd",
        trigger_vocabulary: VOCABULARY,
        topic_terms: VOCABULARY,
        sections: &["Program List", "MCAT/GPA Gates", "Program Costs"],
        confidence: 0.7,
    }
}
