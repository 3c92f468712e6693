//! Worker registry: one record per account plus the contacts and dependents it owns.

mod batch;
mod domain;
pub mod service;

pub use batch::{validate_cargas, validate_contactos, CargaRow, ContactoRow};
pub use domain::{
    CargaFamiliar, CargaFields, CargaId, ContactoEmergencia, ContactoFields, ContactoId,
    NewTrabajador, PersonalFields, ProfileUpdate, RowWrite, Sexo, Trabajador, WorkerId,
    WorkerProfile, WorkerRow,
};
pub use service::{
    today, IntakeForm, PersonalForm, Placement, ProfileForm, WorkerDraft, WorkerService,
    SIGNUP_PLACEHOLDER,
};
