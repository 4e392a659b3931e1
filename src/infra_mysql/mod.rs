mod codes;
mod social_store_mysql;

pub use social_store_mysql::*;
