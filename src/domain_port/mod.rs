mod clock;
mod event_sink;
mod scheduler;
mod social_store;
#[cfg(test)]
pub(crate) mod store_scenarios;

pub use clock::*;
pub use event_sink::*;
pub use scheduler::*;
pub use social_store::*;
