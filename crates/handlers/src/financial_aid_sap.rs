use crate::common::TopicHandler;

pub const PRIORITY: u16 = 100;

pub const VOCABULARY: &[&str] = &["sap", "suspension appeal", "suspension", "appeal"];

pub fn handler() -> TopicHandler {
    TopicHandler {
        id: "financial_aid_sap",
        trigger_vocabulary: VOCABULARY,
        topic_terms: VOCABULARY,
        sections: &["Appeal Procedure"],
        confidence: 0.75,
    }
}
