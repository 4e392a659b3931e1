mod compound_guard;
mod friend_request_registry;
#[cfg(test)]
mod gated_store;
mod relationship_cache;
mod social_service_impl;

pub use compound_guard::*;
pub use friend_request_registry::*;
pub use relationship_cache::*;
pub use social_service_impl::*;
