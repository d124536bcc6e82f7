pub mod accessor;
pub mod backend;
pub mod bootstrap;
pub mod catalog;
pub mod coercion;
pub mod config;
pub mod conversion;
pub mod criteria;
pub mod error;
pub mod registry;
