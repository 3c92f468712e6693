//! Human-resources record keeping: the organizational catalog (areas, departments, job titles),
//! the worker registry with its dependent records, role-gated listings, and the HTTP surface
//! that exposes them.

pub mod access;
pub mod catalog;
pub mod config;
pub mod error;
pub mod identity;
pub mod listing;
pub mod seed;
pub mod store;
pub mod telemetry;
pub mod validation;
pub mod web;
pub mod workers;
