mod event;
mod player;
mod relation;
mod request;

pub use event::*;
pub use player::*;
pub use relation::*;
pub use request::*;
