//! Variable-length contact and dependent lists submitted with a worker form.
//!
//! A submission is a list of rows, each either pointing at an existing row or describing a new
//! one, with a delete flag. The whole list is validated before anything is written; a single bad
//! row rejects the batch.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::Deserialize;

use super::domain::{CargaFields, CargaId, ContactoFields, ContactoId, RowWrite};
use crate::validation::{self, FieldErrors};

const NOMBRE_MAX_LEN: usize = 120;
const PARENTESCO_MAX_LEN: usize = 80;
const TELEFONO_MAX_LEN: usize = 30;

pub(crate) const INVALID_DATE: &str = "Introduzca una fecha válida.";
const UNKNOWN_ROW: &str = "El registro no pertenece a este trabajador.";

/// Submitted emergency contact row.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ContactoRow {
    #[serde(deserialize_with = "validation::optional_id")]
    pub id: Option<i64>,
    pub nombre: String,
    pub parentesco: String,
    pub telefono: String,
    pub delete: bool,
}

impl ContactoRow {
    fn is_blank(&self) -> bool {
        [&self.nombre, &self.parentesco, &self.telefono]
            .iter()
            .all(|value| value.trim().is_empty())
    }
}

/// Submitted family dependent row. The birth date stays raw text until validation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CargaRow {
    #[serde(deserialize_with = "validation::optional_id")]
    pub id: Option<i64>,
    pub nombre: String,
    pub parentesco: String,
    pub fecha_nacimiento: Option<String>,
    pub delete: bool,
}

impl CargaRow {
    fn is_blank(&self) -> bool {
        self.nombre.trim().is_empty()
            && self.parentesco.trim().is_empty()
            && self
                .fecha_nacimiento
                .as_deref()
                .map_or(true, |value| value.trim().is_empty())
    }
}

/// Parse an optional `YYYY-MM-DD` date; blank means absent.
pub(crate) fn optional_date(
    errors: &mut FieldErrors,
    field: &str,
    raw: Option<&str>,
) -> Option<NaiveDate> {
    let value = raw.map(str::trim).filter(|value| !value.is_empty())?;
    match NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        Ok(date) => Some(date),
        Err(_) => {
            errors.add(field, INVALID_DATE);
            None
        }
    }
}

/// Resolve a row's target: `Ok(None)` for a new row, `Err` when the id is not owned.
fn target<Id: Ord + Copy>(
    errors: &mut FieldErrors,
    raw: Option<i64>,
    owned: &BTreeSet<Id>,
    wrap: impl Fn(i64) -> Id,
) -> Result<Option<Id>, ()> {
    match raw {
        None => Ok(None),
        Some(raw) => {
            let id = wrap(raw);
            if owned.contains(&id) {
                Ok(Some(id))
            } else {
                errors.add("id", UNKNOWN_ROW);
                Err(())
            }
        }
    }
}

/// Validate a contact batch against the ids the worker already owns.
pub fn validate_contactos(
    rows: &[ContactoRow],
    owned: &BTreeSet<ContactoId>,
) -> Result<Vec<RowWrite<ContactoId, ContactoFields>>, FieldErrors> {
    let mut errors = FieldErrors::new();
    let mut writes = Vec::new();

    for (index, row) in rows.iter().enumerate() {
        let mut row_errors = FieldErrors::new();
        let Ok(id) = target(&mut row_errors, row.id, owned, ContactoId) else {
            errors.absorb(&format!("contactos.{index}"), row_errors);
            continue;
        };

        match (id, row.delete) {
            (Some(id), true) => writes.push(RowWrite::Delete(id)),
            (None, true) => {}
            (None, false) if row.is_blank() => {}
            (id, false) => {
                let fields = ContactoFields {
                    nombre: validation::required(
                        &mut row_errors,
                        "nombre",
                        &row.nombre,
                        NOMBRE_MAX_LEN,
                    ),
                    parentesco: validation::required(
                        &mut row_errors,
                        "parentesco",
                        &row.parentesco,
                        PARENTESCO_MAX_LEN,
                    ),
                    telefono: validation::required(
                        &mut row_errors,
                        "telefono",
                        &row.telefono,
                        TELEFONO_MAX_LEN,
                    ),
                };
                writes.push(match id {
                    Some(id) => RowWrite::Update(id, fields),
                    None => RowWrite::Insert(fields),
                });
            }
        }
        errors.absorb(&format!("contactos.{index}"), row_errors);
    }

    errors.into_result().map(|()| writes)
}

/// Validate a dependent batch against the ids the worker already owns.
pub fn validate_cargas(
    rows: &[CargaRow],
    owned: &BTreeSet<CargaId>,
) -> Result<Vec<RowWrite<CargaId, CargaFields>>, FieldErrors> {
    let mut errors = FieldErrors::new();
    let mut writes = Vec::new();

    for (index, row) in rows.iter().enumerate() {
        let mut row_errors = FieldErrors::new();
        let Ok(id) = target(&mut row_errors, row.id, owned, CargaId) else {
            errors.absorb(&format!("cargas.{index}"), row_errors);
            continue;
        };

        match (id, row.delete) {
            (Some(id), true) => writes.push(RowWrite::Delete(id)),
            (None, true) => {}
            (None, false) if row.is_blank() => {}
            (id, false) => {
                let fields = CargaFields {
                    nombre: validation::required(
                        &mut row_errors,
                        "nombre",
                        &row.nombre,
                        NOMBRE_MAX_LEN,
                    ),
                    parentesco: validation::required(
                        &mut row_errors,
                        "parentesco",
                        &row.parentesco,
                        PARENTESCO_MAX_LEN,
                    ),
                    fecha_nacimiento: optional_date(
                        &mut row_errors,
                        "fecha_nacimiento",
                        row.fecha_nacimiento.as_deref(),
                    ),
                };
                writes.push(match id {
                    Some(id) => RowWrite::Update(id, fields),
                    None => RowWrite::Insert(fields),
                });
            }
        }
        errors.absorb(&format!("cargas.{index}"), row_errors);
    }

    errors.into_result().map(|()| writes)
}

/// Only inserts survive when the worker does not exist yet.
pub(crate) fn inserts<Id, Fields>(writes: Vec<RowWrite<Id, Fields>>) -> Vec<Fields> {
    writes
        .into_iter()
        .filter_map(|write| match write {
            RowWrite::Insert(fields) => Some(fields),
            RowWrite::Update(..) | RowWrite::Delete(_) => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contacto(nombre: &str, parentesco: &str, telefono: &str) -> ContactoRow {
        ContactoRow {
            nombre: nombre.to_string(),
            parentesco: parentesco.to_string(),
            telefono: telefono.to_string(),
            ..ContactoRow::default()
        }
    }

    #[test]
    fn blank_extra_rows_are_skipped() {
        let rows = vec![contacto("Rosa Díaz", "Madre", "+56 9 1234 5678"), contacto("", " ", "")];
        let writes = validate_contactos(&rows, &BTreeSet::new()).expect("valid batch");
        assert_eq!(writes.len(), 1);
        assert!(matches!(writes[0], RowWrite::Insert(_)));
    }

    #[test]
    fn one_bad_row_rejects_the_batch() {
        let rows = vec![
            CargaRow {
                nombre: "Tomás".to_string(),
                parentesco: "Hijo".to_string(),
                fecha_nacimiento: Some("2015-03-02".to_string()),
                ..CargaRow::default()
            },
            CargaRow {
                nombre: "Julia".to_string(),
                fecha_nacimiento: Some("02/03/2015".to_string()),
                ..CargaRow::default()
            },
        ];
        let errors = validate_cargas(&rows, &BTreeSet::new()).expect_err("second row invalid");
        assert!(errors.contains("cargas.1.parentesco"));
        assert_eq!(
            errors.get("cargas.1.fecha_nacimiento"),
            Some(&[INVALID_DATE.to_string()][..])
        );
        assert!(!errors.fields().any(|field| field.starts_with("cargas.0")));
    }

    #[test]
    fn rows_must_target_owned_ids() {
        let owned = BTreeSet::from([ContactoId(4)]);
        let rows = vec![
            ContactoRow {
                id: Some(4),
                delete: true,
                ..ContactoRow::default()
            },
            ContactoRow {
                id: Some(9),
                ..contacto("Pedro", "Hermano", "555")
            },
        ];
        let errors = validate_contactos(&rows, &owned).expect_err("foreign id");
        assert!(errors.contains("contactos.1.id"));

        let writes = validate_contactos(&rows[..1], &owned).expect("owned delete");
        assert_eq!(writes, vec![RowWrite::Delete(ContactoId(4))]);
    }

    #[test]
    fn deleting_an_unsaved_row_is_a_no_op() {
        let rows = vec![ContactoRow {
            delete: true,
            ..contacto("Sin guardar", "", "")
        }];
        let writes = validate_contactos(&rows, &BTreeSet::new()).expect("valid batch");
        assert!(writes.is_empty());
    }
}
