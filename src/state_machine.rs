//! Per-conversation exchange state machine
//!
//! Pure transitions from (state, event) to (state, effects); the runtime
//! executes the effects.

mod effect;
pub mod event;
pub mod state;
pub(crate) mod transition;

#[cfg(test)]
mod proptests;

pub use effect::Effect;
pub use event::Event;
pub use state::ExchangeState;
pub use transition::{transition, TransitionError, TransitionResult};
