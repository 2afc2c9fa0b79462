//! Draw engine: lifecycle guards, winner selection and round orchestration.

mod clock;
mod outcome;
mod selector;
mod service;
pub mod state;

pub use clock::{Clock, SystemClock};
pub use outcome::{DrawFailure, DrawOutcome};
pub use selector::{
    create_selector, eligible_candidates, FairnessSelector, SelectionError, UniformSelector,
    WinTally, WinnerSelector,
};
pub use service::DrawService;
pub use state::{ensure_editable, recompute_status};
