use std::collections::HashMap;

use meridian_router::{HandlerRegistration, Router};

use crate::common::{status_or_token_match, Handler};
use crate::{
    bankruptcy_incarceration, bsmd, cc_to_uc_transfer, cs_internal_transfer, daca_or_tps,
    disability_504, financial_aid_sap, foster_care_homeless, generic_cite_summarize,
    international_transfer, military_dependent, ncaa_and_nil, ofac_sanctions, parent_plus_denial,
    religious, religious_mission_deferral, residency_wue, tribal, transfer_credit,
    veterans_benefits,
};

/// Every handler id, keyed for lookup once the Router has decided
/// which one(s) should run.
pub type HandlerDirectory = HashMap<&'static str, Box<dyn Handler>>;

/// Assemble the full registry: a [`Router`] wired with every
/// handler's trigger predicate and priority, plus a directory the
/// engine uses to look up and invoke the winning handler(s) by id.
pub fn build_registry() -> (Router, HandlerDirectory) {
    let mut router = Router::new(generic_cite_summarize::ID);
    let mut directory: HandlerDirectory = HashMap::new();

    macro_rules! register_topic {
        ($module:ident) => {{
            let h = $module::handler();
            router.register(HandlerRegistration::new(h.id, $module::PRIORITY, move |signals, _candidates| {
                status_or_token_match(signals, $module::VOCABULARY)
            }));
            directory.insert(h.id, Box::new(h));
        }};
    }

    register_topic!(religious_mission_deferral);
    register_topic!(military_dependent);
    register_topic!(tribal);
    register_topic!(international_transfer);
    register_topic!(bankruptcy_incarceration);
    register_topic!(ncaa_and_nil);
    register_topic!(religious);
    register_topic!(transfer_credit);
    register_topic!(bsmd);
    register_topic!(residency_wue);
    register_topic!(veterans_benefits);
    register_topic!(financial_aid_sap);

    router.register(HandlerRegistration::new(
        foster_care_homeless::ID,
        foster_care_homeless::PRIORITY,
        foster_care_homeless::trigger,
    ));
    directory.insert(
        foster_care_homeless::ID,
        Box::new(foster_care_homeless::FosterCareHomelessHandler),
    );

    router.register(HandlerRegistration::new(
        parent_plus_denial::ID,
        parent_plus_denial::PRIORITY,
        parent_plus_denial::trigger,
    ));
    directory.insert(
        parent_plus_denial::ID,
        Box::new(parent_plus_denial::ParentPlusDenialHandler),
    );

    router.register(HandlerRegistration::new(
        disability_504::ID,
        disability_504::PRIORITY,
        disability_504::trigger,
    ));
    directory.insert(disability_504::ID, Box::new(disability_504::Disability504Handler));

    router.register(HandlerRegistration::new(
        cs_internal_transfer::ID,
        cs_internal_transfer::PRIORITY,
        cs_internal_transfer::trigger,
    ));
    directory.insert(
        cs_internal_transfer::ID,
        Box::new(cs_internal_transfer::CsInternalTransferHandler),
    );

    router.register(HandlerRegistration::new(
        daca_or_tps::ID,
        daca_or_tps::PRIORITY,
        daca_or_tps::trigger,
    ));
    directory.insert(daca_or_tps::ID, Box::new(daca_or_tps::DacaOrTpsHandler));

    router.register(HandlerRegistration::new(
        cc_to_uc_transfer::ID,
        cc_to_uc_transfer::PRIORITY,
        cc_to_uc_transfer::trigger,
    ));
    directory.insert(
        cc_to_uc_transfer::ID,
        Box::new(cc_to_uc_transfer::CcToUcTransferHandler),
    );

    router.register(HandlerRegistration::new(
        ofac_sanctions::ID,
        ofac_sanctions::PRIORITY,
        ofac_sanctions::trigger,
    ));
    directory.insert(ofac_sanctions::ID, Box::new(ofac_sanctions::OfacSanctionsHandler));

    // GenericCiteSummarize has no firing predicate — only the
    // directory entry is needed, for when the Router's Fallback
    // decision names it by id.
    directory.insert(
        generic_cite_summarize::ID,
        Box::new(generic_cite_summarize::GenericCiteSummarizeHandler),
    );

    (router, directory)
}
