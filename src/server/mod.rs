mod clock_impl;
mod event_sink_impl;
mod lifecycle;
mod scheduler_impl;
mod server;

pub use clock_impl::*;
pub use event_sink_impl::*;
pub use lifecycle::*;
pub use scheduler_impl::*;
pub use server::*;
