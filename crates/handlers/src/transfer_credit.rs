use crate::common::TopicHandler;

pub const PRIORITY: u16 = 110;

pub const VOCABULARY: &[&str] = &["international baccalaureate", "a-level", "ap credit", "dual enrollment"];

pub fn handler() -> TopicHandler {
    TopicHandler {
        id: "transfer_credit",
        trigger_vocabulary: VOCABULARY,
        topic_terms: VOCABULARY,
        sections: &["Credit Caps", "Score Thresholds"],
        confidence: 0.75,
    }
}
