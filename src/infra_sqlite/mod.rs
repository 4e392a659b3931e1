mod social_store_sqlite;

pub use social_store_sqlite::*;
