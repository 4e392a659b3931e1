mod social_service;

pub use social_service::*;
