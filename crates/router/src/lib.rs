//! Router (spec §4.3): priority-scored handler selection over a set of
//! registered trigger predicates. This crate owns the registration and
//! selection machinery; `meridian-handlers` is the crate that actually
//! populates a [`Router`] with the ~20 domain predicates, which keeps
//! the dependency direction leaves-first (Router has no knowledge of
//! any specific handler).

use std::collections::BTreeSet;

use meridian_core::{CandidatePassage, QuerySignals};
use tracing::{debug, info};

/// What a firing trigger matched, so ties can be broken by "most
/// matched trigger terms" (spec §4.3).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TriggerMatch {
    pub matched_terms: BTreeSet<String>,
}

impl TriggerMatch {
    pub fn new(matched_terms: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            matched_terms: matched_terms.into_iter().map(Into::into).collect(),
        }
    }

    fn is_disjoint_from(&self, other: &TriggerMatch) -> bool {
        self.matched_terms.is_disjoint(&other.matched_terms)
    }
}

type Predicate = Box<dyn Fn(&QuerySignals, &[CandidatePassage]) -> Option<TriggerMatch> + Send + Sync>;

/// One entry in the handler registry: an id, its fixed priority
/// (spec §4.3: "priority in [100, 150]"), and the predicate that
/// decides whether it fires for a given request.
pub struct HandlerRegistration {
    pub id: String,
    pub priority: u16,
    predicate: Predicate,
}

impl HandlerRegistration {
    pub fn new(
        id: impl Into<String>,
        priority: u16,
        predicate: impl Fn(&QuerySignals, &[CandidatePassage]) -> Option<TriggerMatch> + Send + Sync + 'static,
    ) -> Self {
        Self {
            id: id.into(),
            priority,
            predicate: Box::new(predicate),
        }
    }
}

/// A handler chosen by routing, along with what triggered it.
#[derive(Debug, Clone)]
pub struct HandlerSelection {
    pub id: String,
    pub matched_terms: BTreeSet<String>,
}

#[derive(Debug, Clone)]
pub enum RouteDecision {
    /// Exactly one handler fired, or one clearly outranked the rest.
    Primary(HandlerSelection),
    /// Two handlers fired within 5 priority points of each other with
    /// disjoint trigger sets (spec §4.3 composition rule) — both run,
    /// their sections concatenate, and the Validator runs over the
    /// union of claims.
    Composed(HandlerSelection, HandlerSelection),
    /// Nothing fired but retrieval returned enough candidates to
    /// attempt a neutral cited summary.
    Fallback(HandlerSelection),
    /// Nothing fired and there isn't enough evidence to fall back to
    /// the generic summarizer either.
    Abstain,
}

/// Maximum priority-point gap within which two fired handlers may be
/// composed rather than just picking the higher-priority one.
const COMPOSITION_PRIORITY_WINDOW: i32 = 5;

/// Minimum candidate count required to fall back to the generic
/// cite-and-summarize handler when nothing else fires (spec §4.3).
const FALLBACK_MIN_CANDIDATES: usize = 3;

pub struct Router {
    registrations: Vec<HandlerRegistration>,
    fallback_id: String,
}

impl Router {
    /// `fallback_id` is the generic cite-and-summarize handler's id —
    /// it is not itself registered with a firing predicate; the Router
    /// selects it explicitly when nothing else fires (spec §4.3).
    pub fn new(fallback_id: impl Into<String>) -> Self {
        Self {
            registrations: Vec::new(),
            fallback_id: fallback_id.into(),
        }
    }

    pub fn register(&mut self, registration: HandlerRegistration) {
        self.registrations.push(registration);
    }

    pub fn route(&self, signals: &QuerySignals, candidates: &[CandidatePassage]) -> RouteDecision {
        // `enumerate` gives registration order, used as the "lower
        // priority id" stable tie-break (spec §4.3) — registrations
        // are inserted in priority-descending, then alphabetical, id
        // order by the handlers crate, so index order doubles as id
        // order.
        let mut fired: Vec<(usize, &HandlerRegistration, TriggerMatch)> = self
            .registrations
            .iter()
            .enumerate()
            .filter_map(|(idx, reg)| (reg.predicate)(signals, candidates).map(|m| (idx, reg, m)))
            .collect();

        if fired.is_empty() {
            return if candidates.len() >= FALLBACK_MIN_CANDIDATES {
                debug!(candidate_count = candidates.len(), "no handler fired; falling back to generic summarizer");
                RouteDecision::Fallback(HandlerSelection {
                    id: self.fallback_id.clone(),
                    matched_terms: BTreeSet::new(),
                })
            } else {
                debug!(candidate_count = candidates.len(), "no handler fired and too few candidates to fall back");
                RouteDecision::Abstain
            };
        }

        fired.sort_by(|(idx_a, reg_a, match_a), (idx_b, reg_b, match_b)| {
            reg_b
                .priority
                .cmp(&reg_a.priority)
                .then_with(|| match_b.matched_terms.len().cmp(&match_a.matched_terms.len()))
                .then_with(|| idx_a.cmp(idx_b))
        });

        let (_, primary, primary_match) = &fired[0];
        let primary_selection = HandlerSelection {
            id: primary.id.clone(),
            matched_terms: primary_match.matched_terms.clone(),
        };

        let secondary = fired.iter().skip(1).find(|(_, reg, candidate_match)| {
            (primary.priority as i32 - reg.priority as i32).abs() <= COMPOSITION_PRIORITY_WINDOW
                && candidate_match.is_disjoint_from(primary_match)
        });

        match secondary {
            Some((_, reg, candidate_match)) => {
                info!(primary = primary_selection.id.as_str(), secondary = reg.id.as_str(), "composing handlers");
                RouteDecision::Composed(
                    primary_selection,
                    HandlerSelection {
                        id: reg.id.clone(),
                        matched_terms: candidate_match.matched_terms.clone(),
                    },
                )
            }
            None => {
                info!(handler = primary_selection.id.as_str(), "routed to single handler");
                RouteDecision::Primary(primary_selection)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn always(terms: &'static [&'static str]) -> impl Fn(&QuerySignals, &[CandidatePassage]) -> Option<TriggerMatch> {
        move |_signals, _candidates| Some(TriggerMatch::new(terms.iter().copied()))
    }

    fn never(_signals: &QuerySignals, _candidates: &[CandidatePassage]) -> Option<TriggerMatch> {
        None
    }

    #[test]
    fn highest_priority_firing_handler_wins() {
        let mut router = Router::new("generic_cite_summarize");
        router.register(HandlerRegistration::new("low", 100, always(&["a"])));
        router.register(HandlerRegistration::new("high", 150, always(&["b"])));

        let decision = router.route(&QuerySignals::default(), &[]);
        match decision {
            RouteDecision::Primary(sel) | RouteDecision::Composed(sel, _) => assert_eq!(sel.id, "high"),
            other => panic!("expected a firing decision, got {other:?}"),
        }
    }

    #[test]
    fn ties_broken_by_matched_term_count_then_registration_order() {
        let mut router = Router::new("generic_cite_summarize");
        router.register(HandlerRegistration::new("first", 120, always(&["a"])));
        router.register(HandlerRegistration::new("second", 120, always(&["a", "b"])));

        let decision = router.route(&QuerySignals::default(), &[]);
        assert!(matches!(decision, RouteDecision::Primary(sel) if sel.id == "second"));
    }

    #[test]
    fn disjoint_close_priority_handlers_compose() {
        let mut router = Router::new("generic_cite_summarize");
        router.register(HandlerRegistration::new("intl", 130, always(&["international"])));
        router.register(HandlerRegistration::new("cs_transfer", 128, always(&["internal_transfer"])));

        let decision = router.route(&QuerySignals::default(), &[]);
        assert!(matches!(decision, RouteDecision::Composed(_, _)));
    }

    #[test]
    fn overlapping_triggers_do_not_compose() {
        let mut router = Router::new("generic_cite_summarize");
        router.register(HandlerRegistration::new("a", 130, always(&["status"])));
        router.register(HandlerRegistration::new("b", 128, always(&["status"])));

        let decision = router.route(&QuerySignals::default(), &[]);
        assert!(matches!(decision, RouteDecision::Primary(_)));
    }

    #[test]
    fn no_firing_handler_abstains_when_evidence_is_thin() {
        let mut router = Router::new("generic_cite_summarize");
        router.register(HandlerRegistration::new("a", 130, never));

        let decision = router.route(&QuerySignals::default(), &[]);
        assert!(matches!(decision, RouteDecision::Abstain));
    }

    #[test]
    fn no_firing_handler_falls_back_with_enough_candidates() {
        use chrono::Utc;
        use meridian_core::{Collection, Document, ScoreSource};
        use std::collections::BTreeMap;

        let mut router = Router::new("generic_cite_summarize");
        router.register(HandlerRegistration::new("a", 130, never));

        let mut tags = BTreeMap::new();
        tags.insert("topic".to_string(), "x".to_string());
        let make = |id: &str| CandidatePassage {
            document: Document::new(id, Collection::CitedAnswers, "https://a.edu/x", "body", Utc::now(), tags.clone(), "hash").unwrap(),
            score: 1.0,
            source: ScoreSource::Lexical,
            rank: 1,
        };
        let candidates = vec![make("d1"), make("d2"), make("d3")];

        let decision = router.route(&QuerySignals::default(), &candidates);
        assert!(matches!(decision, RouteDecision::Fallback(sel) if sel.id == "generic_cite_summarize"));
    }
}
