use crate::common::TopicHandler;

pub const PRIORITY: u16 = 120;

pub const VOCABULARY: &[&str] = &["ncaa", "nil", "transfer portal"];

pub fn handler() -> TopicHandler {
    TopicHandler {
        id: "ncaa_and_nil",
        trigger_vocabulary: VOCABULARY,
        topic_terms: VOCABULARY,
        sections: &["Academic Redshirt Rules", "Equivalency Sport Limits", "F-1 NIL Restrictions"],
        confidence: 0.75,
    }
}
