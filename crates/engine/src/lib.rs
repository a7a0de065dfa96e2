//! Engine (spec §5): orchestrates Normalizer → Retriever → Router →
//! Handler(s) → Validator for a single request, under a per-request
//! deadline and the handler retry-once-on-rejection policy. Formatting
//! the resulting [`Response`] into prose is a separate, optional step
//! ([`Engine::render`]) — the generative reformatter itself is an
//! external collaborator (spec §1).

use std::time::Duration;

use meridian_config::AppConfig;
use meridian_core::{
    Abstention, AbstentionReason, CandidatePassage, EngineError, HandlerResult, QuerySignals,
    Response, TemporalSignal,
};
use meridian_formatter::{Formatter, PassthroughFormatter, RenderedResponse};
use meridian_handlers::{build_registry, CalculatorSuite, DefaultCalculators, Handler, HandlerDirectory, HandlerOutcome};
use meridian_retrieval::{RetrievalOutcome, Retriever};
use meridian_router::{RouteDecision, Router};
use meridian_storage::Storage;
use meridian_validator::{FailedCheck, ValidationOutcome, Validator, ValidatorThresholds};
use tracing::{info, instrument, warn};

/// The full pipeline, holding its dependencies the way [`Engine::new`]
/// assembles them once at startup rather than re-wiring the registry
/// or the Validator's thresholds per request.
pub struct Engine<S: Storage> {
    storage: S,
    config: AppConfig,
    router: Router,
    directory: HandlerDirectory,
    validator: Validator,
    calculators: Box<dyn CalculatorSuite>,
}

impl<S: Storage> Engine<S> {
    pub fn new(storage: S, config: AppConfig) -> Self {
        let (router, directory) = build_registry();
        let validator = Validator::new(ValidatorThresholds {
            citation_coverage_floor: config.validator.citation_coverage_floor,
            min_authoritative_sources: config.validator.min_authoritative_sources,
        });
        Self {
            storage,
            config,
            router,
            directory,
            validator,
            calculators: Box::new(DefaultCalculators),
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Render a [`Response`] to prose via the reference
    /// [`PassthroughFormatter`] (spec §6). A real generative reformatter
    /// is out of scope; callers wanting a different one can format the
    /// `Response` returned by [`Engine::answer`] directly instead.
    pub fn render(&self, response: &Response) -> RenderedResponse {
        PassthroughFormatter.format(response)
    }

    /// Answer one request end-to-end, enforcing the `REQUEST_DEADLINE_MS`
    /// guardrail (spec §5: "Cancellation/timeout" — exceeding it yields
    /// an `INSUFFICIENT_EVIDENCE` abstention, not a technical error).
    ///
    /// `query_embedding` is an already-computed, L2-normalized dense
    /// vector from an external embedding model (spec §1, out of scope
    /// for this workspace); pass `None` to run lexical-only retrieval.
    #[instrument(skip(self, query_embedding), fields(current_year = self.config.engine.current_year))]
    pub async fn answer(
        &self,
        raw_query: &str,
        query_embedding: Option<&[f32]>,
    ) -> Result<Response, EngineError> {
        let deadline = Duration::from_millis(self.config.engine.request_deadline_ms);
        match tokio::time::timeout(deadline, self.answer_inner(raw_query, query_embedding)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(deadline_ms = self.config.engine.request_deadline_ms, "request exceeded its deadline");
                Ok(Response::abstained(Abstention::new(
                    AbstentionReason::InsufficientEvidence,
                    format!(
                        "the request exceeded its {}ms deadline before a handler could complete",
                        self.config.engine.request_deadline_ms
                    ),
                )))
            }
        }
    }

    async fn answer_inner(
        &self,
        raw_query: &str,
        query_embedding: Option<&[f32]>,
    ) -> Result<Response, EngineError> {
        let signals = match meridian_normalizer::normalize(raw_query, self.config.engine.current_year) {
            Ok(signals) => signals,
            Err(err) => {
                return Ok(Response::abstained(Abstention::new(AbstentionReason::OutOfScope, err.to_string())));
            }
        };

        if let Some(abstention) = guardrail_abstention(&signals) {
            return Ok(Response::abstained(abstention));
        }

        let outcome = self.retrieve(&signals, query_embedding, self.config.retrieval.clone()).await?;
        if outcome.insufficient_evidence {
            return Ok(Response::abstained(Abstention::new(
                AbstentionReason::InsufficientEvidence,
                "fewer than 3 candidate passages survived retrieval",
            )));
        }

        self.route_and_resolve(&signals, &outcome.candidates, query_embedding).await
    }

    async fn retrieve(
        &self,
        signals: &QuerySignals,
        query_embedding: Option<&[f32]>,
        config: meridian_config::RetrievalConfig,
    ) -> Result<RetrievalOutcome, EngineError> {
        Retriever::new(&self.storage, config)
            .retrieve(signals, query_embedding, None)
            .await
            .map_err(|err| EngineError::StorageUnreachable(err.to_string()))
    }

    async fn route_and_resolve(
        &self,
        signals: &QuerySignals,
        candidates: &[CandidatePassage],
        query_embedding: Option<&[f32]>,
    ) -> Result<Response, EngineError> {
        match self.router.route(signals, candidates) {
            RouteDecision::Abstain => Ok(Response::abstained(Abstention::new(
                AbstentionReason::InsufficientEvidence,
                "no handler's trigger matched this query and retrieval returned too few candidates \
                 for a generic cited summary",
            ))),
            RouteDecision::Primary(sel) | RouteDecision::Fallback(sel) => {
                self.resolve_single(&sel.id, signals, candidates, query_embedding).await
            }
            RouteDecision::Composed(primary, secondary) => {
                self.resolve_composed(&primary.id, &secondary.id, signals, candidates, query_embedding)
                    .await
            }
        }
    }

    async fn resolve_single(
        &self,
        id: &str,
        signals: &QuerySignals,
        candidates: &[CandidatePassage],
        query_embedding: Option<&[f32]>,
    ) -> Result<Response, EngineError> {
        let handler = self.lookup(id)?;
        match handler.apply(signals, candidates, self.calculators.as_ref()) {
            HandlerOutcome::Abstain(abstention) => Ok(Response::abstained(abstention)),
            HandlerOutcome::Answer(result) => {
                self.validate_with_retry(handler, signals, candidates, query_embedding, result).await
            }
        }
    }

    /// Run both composed handlers over the same candidate set and merge
    /// their sections into one [`HandlerResult`] (spec §4.3: "both run,
    /// their sections concatenate, and the Validator runs over the
    /// union of claims"). If one abstains, the other's result stands
    /// alone; if both abstain, the router's primary selection's
    /// abstention is returned.
    async fn resolve_composed(
        &self,
        primary_id: &str,
        secondary_id: &str,
        signals: &QuerySignals,
        candidates: &[CandidatePassage],
        query_embedding: Option<&[f32]>,
    ) -> Result<Response, EngineError> {
        let primary = self.lookup(primary_id)?;
        let secondary = self.lookup(secondary_id)?;

        let primary_outcome = primary.apply(signals, candidates, self.calculators.as_ref());
        let secondary_outcome = secondary.apply(signals, candidates, self.calculators.as_ref());

        match (primary_outcome, secondary_outcome) {
            (HandlerOutcome::Answer(a), HandlerOutcome::Answer(b)) => {
                let merged = merge_handler_results(a, b);
                // A validator-requested retry re-applies only the primary
                // handler at the widened candidate set; composition does
                // not retry both handlers jointly.
                self.validate_with_retry(primary, signals, candidates, query_embedding, merged).await
            }
            (HandlerOutcome::Answer(a), HandlerOutcome::Abstain(_)) => {
                self.validate_with_retry(primary, signals, candidates, query_embedding, a).await
            }
            (HandlerOutcome::Abstain(_), HandlerOutcome::Answer(b)) => {
                self.validate_with_retry(secondary, signals, candidates, query_embedding, b).await
            }
            (HandlerOutcome::Abstain(primary_abstention), HandlerOutcome::Abstain(_)) => {
                Ok(Response::abstained(primary_abstention))
            }
        }
    }

    async fn validate_with_retry(
        &self,
        handler: &dyn Handler,
        signals: &QuerySignals,
        candidates: &[CandidatePassage],
        query_embedding: Option<&[f32]>,
        result: HandlerResult,
    ) -> Result<Response, EngineError> {
        match self.validator.validate(result, candidates, false) {
            ValidationOutcome::Accepted(sealed) => Ok(Response::answered(&sealed)),
            ValidationOutcome::Abstained(abstention) => Ok(Response::abstained(abstention)),
            ValidationOutcome::Integrity { check, detail } => Err(self.integrity_error(check, detail)),
            ValidationOutcome::Retry { check, detail } => {
                if self.config.handler.retry_limit == 0 {
                    return Ok(Response::abstained(Abstention::new(AbstentionReason::InsufficientEvidence, detail)));
                }
                info!(handler = handler.id(), check = ?check, detail, "validator requested a retry; widening retrieval");

                let widened = self.retrieve(signals, query_embedding, self.config.retrieval.widened()).await?;
                match handler.apply(signals, &widened.candidates, self.calculators.as_ref()) {
                    HandlerOutcome::Abstain(abstention) => Ok(Response::abstained(abstention)),
                    HandlerOutcome::Answer(retried) => {
                        match self.validator.validate(retried, &widened.candidates, true) {
                            ValidationOutcome::Accepted(sealed) => Ok(Response::answered(&sealed)),
                            ValidationOutcome::Abstained(abstention) => Ok(Response::abstained(abstention)),
                            ValidationOutcome::Integrity { check, detail } => Err(self.integrity_error(check, detail)),
                            ValidationOutcome::Retry { check, detail } => Err(self.integrity_error(check, detail)),
                        }
                    }
                }
            }
        }
    }

    fn lookup(&self, id: &str) -> Result<&dyn Handler, EngineError> {
        self.directory
            .get(id)
            .map(|h| h.as_ref())
            .ok_or_else(|| EngineError::Other(anyhow::anyhow!("no handler registered for id '{id}'")))
    }

    fn integrity_error(&self, check: FailedCheck, detail: String) -> EngineError {
        match check {
            FailedCheck::Fabrication => EngineError::ForeignCitation(detail),
            other => EngineError::CorruptHandlerResult(format!("{other:?}: {detail}")),
        }
    }
}

/// Checks that abstain before retrieval is ever attempted, since the
/// query signals alone already determine the outcome (spec §4.1/§7).
fn guardrail_abstention(signals: &QuerySignals) -> Option<Abstention> {
    if let Some(TemporalSignal::FutureBounded { year }) = signals.temporal {
        return Some(
            Abstention::new(
                AbstentionReason::TemporalOutOfRange,
                format!(
                    "cannot state {year} admissions or aid outcomes; the corpus only covers the \
                     current and historical catalog years"
                ),
            )
            .with_retrieval_plan("the most recent historical cds_data and aid_policies documents are the available substitute"),
        );
    }

    if let Some(entity) = &signals.unknown_entity {
        return Some(Abstention::new(
            AbstentionReason::UnknownEntity,
            format!("'{entity}' does not match any institution in the curated corpus"),
        ));
    }

    if signals.subjective_framing {
        return Some(Abstention::new(
            AbstentionReason::SubjectiveDecision,
            "this question asks which option is personally better rather than for a citable fact",
        ));
    }

    None
}

fn merge_handler_results(a: HandlerResult, b: HandlerResult) -> HandlerResult {
    let handler_id = format!("{}+{}", a.handler_id, b.handler_id);
    let confidence = a.confidence.min(b.confidence);
    let mut sections = a.sections;
    sections.extend(b.sections);
    let mut calculations = a.calculations;
    calculations.extend(b.calculations);
    HandlerResult::new(handler_id, sections, confidence).with_calculations(calculations)
}
