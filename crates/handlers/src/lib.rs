//! The Handler Set (spec §4.4): ~20 domain-specific synthesizers, each
//! registered with the [`meridian_router::Router`] behind a trigger
//! predicate and a fixed priority.
//!
//! Most handlers share the same shape — filter the retrieved
//! candidates to ones on-topic, weave their text under a fixed set of
//! section headers, attach a citation per claim — so that shape lives
//! once in [`common::TopicHandler`] and is configured per handler
//! rather than re-implemented twenty times. A handful of handlers have
//! genuinely distinct mechanics (a calculator invocation, a collection
//! -hit precondition, a compliance-only abstention) and get their own
//! module.

mod common;
mod registry;

mod bankruptcy_incarceration;
mod bsmd;
mod cc_to_uc_transfer;
mod cs_internal_transfer;
mod daca_or_tps;
mod disability_504;
mod financial_aid_sap;
mod foster_care_homeless;
mod generic_cite_summarize;
mod international_transfer;
mod military_dependent;
mod ncaa_and_nil;
mod ofac_sanctions;
mod parent_plus_denial;
mod religious;
mod religious_mission_deferral;
mod residency_wue;
mod tribal;
mod transfer_credit;
mod veterans_benefits;

pub use common::{CalculatorSuite, DefaultCalculators, Handler, HandlerOutcome};
pub use registry::{build_registry, HandlerDirectory};
