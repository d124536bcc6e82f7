pub mod binding;
pub mod converter;
pub mod entity;
pub mod error;
pub mod filter;
pub mod sql;
pub mod value;
