use crate::common::TopicHandler;

pub const PRIORITY: u16 = 150;

pub const VOCABULARY: &[&str] = &["mission", "mission deferral", "lds", "gap year"];

pub fn handler() -> TopicHandler {
    TopicHandler {
        id: "religious_mission_deferral",
        trigger_vocabulary: VOCABULARY,
        topic_terms: VOCABULARY,
        sections: &["Deferral Policy", "Aid Retention During Deferral", "Visa Timing Considerations"],
        confidence: 0.8,
    }
}
