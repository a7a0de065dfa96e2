use crate::common::TopicHandler;

pub const PRIORITY: u16 = 130;

pub const VOCABULARY: &[&str] = &["ects", "a-level", "international baccalaureate", "international", "f-1", "visa"];

pub fn handler() -> TopicHandler {
    TopicHandler {
        id: "international_transfer",
        trigger_vocabulary: VOCABULARY,
        topic_terms: VOCABULARY,
        sections: &["Credit Evaluation", "ABET Conformance", "F-1 Transfer Mechanics"],
        confidence: 0.75,
    }
}
