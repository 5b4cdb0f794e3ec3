pub mod form;
pub mod relay;

pub use form::{ContactForm, Reason, RelayPayload, is_email};
pub use relay::{ContactRelay, SubmitOutcome};
