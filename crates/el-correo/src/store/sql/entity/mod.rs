//! Table models for the relational store. Column names follow the migrations crate.

pub mod area;
pub mod carga;
pub mod cargo;
pub mod contacto;
pub mod departamento;
pub mod group;
pub mod identity;
pub mod identity_group;
pub mod session;
pub mod trabajador;
