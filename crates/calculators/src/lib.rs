//! Deterministic financial calculators (spec §4.5). Pure functions, no
//! I/O: the COA calculator is handed already-looked-up published
//! components rather than reaching into storage itself, so this crate
//! has zero dependency on `meridian-storage`.

mod coa;
mod sai;

pub use coa::{CoaError, CoaInputs, CoaResult};
pub use sai::{SaiError, SaiInputs, SaiResult};
