use std::collections::BTreeMap;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};

/// Field-level validation messages keyed by form field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    /// Merge another error set under a field prefix (`contactos.0.nombre`).
    pub fn absorb(&mut self, prefix: &str, other: FieldErrors) {
        for (field, messages) in other.0 {
            let key = format!("{prefix}.{field}");
            self.0.entry(key).or_default().extend(messages);
        }
    }

    pub fn extend(&mut self, other: FieldErrors) {
        for (field, messages) in other.0 {
            self.0.entry(field).or_default().extend(messages);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn into_result(self) -> Result<(), FieldErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl std::fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for (field, messages) in &self.0 {
            for message in messages {
                if !first {
                    write!(f, "; ")?;
                }
                write!(f, "{field}: {message}")?;
                first = false;
            }
        }
        Ok(())
    }
}

pub(crate) const REQUIRED: &str = "Este campo es obligatorio.";
pub(crate) const INVALID_CHOICE: &str = "Seleccione una opción válida.";

#[derive(Deserialize)]
#[serde(untagged)]
enum RawField {
    Text(String),
    Number(i64),
}

/// Ids arrive as text from selectors and form posts, as numbers from scripted clients.
pub(crate) fn text_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<RawField>::deserialize(deserializer)?.map(|raw| match raw {
        RawField::Text(text) => text,
        RawField::Number(number) => number.to_string(),
    }))
}

/// Optional row reference: a number, numeric text, or blank/null for none.
pub(crate) fn optional_id<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    match text_or_number(deserializer)? {
        None => Ok(None),
        Some(text) if text.trim().is_empty() => Ok(None),
        Some(text) => text
            .trim()
            .parse::<i64>()
            .map(Some)
            .map_err(|_| de::Error::custom(INVALID_CHOICE)),
    }
}

/// Trim a submitted value and reject it when blank.
pub(crate) fn required(
    errors: &mut FieldErrors,
    field: &str,
    value: &str,
    max_len: usize,
) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        errors.add(field, REQUIRED);
    } else {
        check_length(errors, field, trimmed, max_len);
    }
    trimmed.to_string()
}

/// Trim an optional value; blank collapses to an empty string.
pub(crate) fn optional(errors: &mut FieldErrors, field: &str, value: &str, max_len: usize) -> String {
    let trimmed = value.trim();
    check_length(errors, field, trimmed, max_len);
    trimmed.to_string()
}

fn check_length(errors: &mut FieldErrors, field: &str, value: &str, max_len: usize) {
    let length = value.chars().count();
    if length > max_len {
        errors.add(
            field,
            format!("Asegúrese de que este valor tenga como máximo {max_len} caracteres (tiene {length})."),
        );
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[derive(Debug, Deserialize)]
    struct Picked {
        #[serde(default, deserialize_with = "optional_id")]
        area: Option<i64>,
    }

    #[test]
    fn absorb_prefixes_nested_fields() {
        let mut row = FieldErrors::new();
        row.add("nombre", REQUIRED);
        let mut form = FieldErrors::single("apellidos", REQUIRED);
        form.absorb("cargas.1", row);

        assert!(form.contains("apellidos"));
        assert_eq!(form.get("cargas.1.nombre"), Some(&[REQUIRED.to_string()][..]));
    }

    #[test]
    fn required_trims_and_measures_characters() {
        let mut errors = FieldErrors::new();
        let value = required(&mut errors, "nombre", "  Tesorería  ", 9);
        assert_eq!(value, "Tesorería");
        assert!(errors.is_empty(), "accented characters count once");

        required(&mut errors, "parentesco", "   ", 80);
        assert!(errors.contains("parentesco"));
    }

    #[test]
    fn ids_accept_numbers_and_numeric_text() {
        for (raw, expected) in [
            (json!({ "area": 3 }), Some(3)),
            (json!({ "area": "3" }), Some(3)),
            (json!({ "area": " 12 " }), Some(12)),
            (json!({ "area": "" }), None),
            (json!({ "area": null }), None),
            (json!({}), None),
        ] {
            let picked: Picked = serde_json::from_value(raw.clone()).expect("accepted");
            assert_eq!(picked.area, expected, "{raw}");
        }

        let error = serde_json::from_value::<Picked>(json!({ "area": "finanzas" }))
            .expect_err("text that is not a number");
        assert!(error.to_string().contains(INVALID_CHOICE));
    }
}
