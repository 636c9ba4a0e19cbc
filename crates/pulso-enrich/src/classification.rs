//! The fixed classification schema and parsing of model completions into it.

use serde_json::{Map, Value};

use crate::error::ClassifierError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// One label out of an enumerated set.
    Label,
    /// A real number in `[0.0, 1.0]`.
    Score,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    pub name: &'static str,
    pub kind: FieldKind,
}

/// Every field the classifier is asked for, in output column order.
pub const FIELDS: &[Field] = &[
    Field { name: "valencia", kind: FieldKind::Label },
    Field { name: "emocion", kind: FieldKind::Label },
    Field { name: "postura", kind: FieldKind::Label },
    Field { name: "tono", kind: FieldKind::Label },
    Field { name: "amabilidad", kind: FieldKind::Score },
    Field { name: "legibilidad", kind: FieldKind::Score },
    Field { name: "controversialidad", kind: FieldKind::Score },
    Field { name: "informatividad", kind: FieldKind::Score },
];

/// Prefixed field names, in [`FIELDS`] order.
#[must_use]
pub fn field_keys(prefix: &str) -> Vec<String> {
    FIELDS.iter().map(|f| format!("{prefix}{}", f.name)).collect()
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Label(String),
    Score(f64),
}

impl FieldValue {
    #[must_use]
    pub fn to_cell(&self) -> String {
        match self {
            FieldValue::Label(label) => label.clone(),
            FieldValue::Score(score) => score.to_string(),
        }
    }
}

/// One successful classification: a value for every entry of [`FIELDS`].
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    values: Vec<FieldValue>,
}

impl Classification {
    /// Parse a model completion.
    ///
    /// The completion must be a JSON object (optionally wrapped in a Markdown
    /// code fence) whose keys are exactly [`field_keys`]`(prefix)`. Labels must
    /// be non-empty strings and scores numbers within `[0, 1]`.
    ///
    /// # Errors
    ///
    /// Returns [`ClassifierError::Malformed`] describing the first violation.
    pub fn parse(completion: &str, prefix: &str) -> Result<Self, ClassifierError> {
        let body = strip_code_fence(completion);
        let object: Map<String, Value> = serde_json::from_str(body)
            .map_err(|e| ClassifierError::Malformed(format!("not a JSON object: {e}")))?;

        let keys = field_keys(prefix);
        if let Some(extra) = object.keys().find(|k| !keys.contains(k)) {
            return Err(ClassifierError::Malformed(format!("unexpected key '{extra}'")));
        }

        let mut values = Vec::with_capacity(FIELDS.len());
        for (field, key) in FIELDS.iter().zip(&keys) {
            let raw = object
                .get(key)
                .ok_or_else(|| ClassifierError::Malformed(format!("missing key '{key}'")))?;
            values.push(parse_value(field.kind, key, raw)?);
        }
        Ok(Self { values })
    }

    #[must_use]
    pub fn values(&self) -> &[FieldValue] {
        &self.values
    }

    /// Value for an unprefixed field name such as `"tono"`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        FIELDS
            .iter()
            .position(|f| f.name == name)
            .and_then(|i| self.values.get(i))
    }

    /// Cells in [`FIELDS`] order.
    #[must_use]
    pub fn to_cells(&self) -> Vec<String> {
        self.values.iter().map(FieldValue::to_cell).collect()
    }
}

fn parse_value(kind: FieldKind, key: &str, raw: &Value) -> Result<FieldValue, ClassifierError> {
    match kind {
        FieldKind::Label => match raw.as_str().map(str::trim) {
            Some(label) if !label.is_empty() => Ok(FieldValue::Label(label.to_string())),
            _ => Err(ClassifierError::Malformed(format!(
                "'{key}' must be a non-empty label, got {raw}"
            ))),
        },
        FieldKind::Score => match raw.as_f64() {
            Some(score) if (0.0..=1.0).contains(&score) => Ok(FieldValue::Score(score)),
            _ => Err(ClassifierError::Malformed(format!(
                "'{key}' must be a number in [0, 1], got {raw}"
            ))),
        },
    }
}

fn strip_code_fence(completion: &str) -> &str {
    let trimmed = completion.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string (e.g. "json") on the opening fence line.
    let rest = rest.split_once('\n').map_or("", |(_, body)| body);
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}
