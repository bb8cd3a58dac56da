//! Schema checks for todo payloads.
//!
//! Payloads arrive as raw JSON so that every problem can be reported at once,
//! field by field, instead of failing on the first deserialization error.

use serde::Serialize;
use serde_json::{Map, Value};
use utoipa::ToSchema;

use super::{NewTodo, TodoChanges};

pub const TITLE_MAX_LENGTH: usize = 100;
pub const DESCRIPTION_MAX_LENGTH: usize = 500;

/// Kind of rule a payload broke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ViolationCode {
    InvalidType,
    TooSmall,
    TooBig,
    InvalidJson,
}

/// A single reason a payload was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct Violation {
    pub code: ViolationCode,
    /// Field names leading to the offending value; empty for the whole payload
    pub path: Vec<String>,
    pub message: String,
}

impl Violation {
    fn at(field: &str, code: ViolationCode, message: impl Into<String>) -> Self {
        Self {
            code,
            path: vec![field.to_string()],
            message: message.into(),
        }
    }

    /// The request body could not be read as JSON at all.
    pub fn invalid_json(message: impl Into<String>) -> Self {
        Self {
            code: ViolationCode::InvalidJson,
            path: Vec::new(),
            message: message.into(),
        }
    }
}

/// Validates a create payload: `title` is required, `description` and
/// `completed` are optional.
pub fn validate_create(payload: &Value) -> Result<NewTodo, Vec<Violation>> {
    let object = expect_object(payload)?;
    let mut violations = Vec::new();

    let title = match object.get("title") {
        Some(value) => check_title(value, &mut violations),
        None => {
            violations.push(Violation::at("title", ViolationCode::InvalidType, "Required"));
            None
        }
    };
    let description = object
        .get("description")
        .and_then(|value| check_description(value, &mut violations));
    let completed = object
        .get("completed")
        .and_then(|value| check_completed(value, &mut violations));

    match title {
        Some(title) if violations.is_empty() => Ok(NewTodo {
            title,
            description,
            completed,
        }),
        _ => Err(violations),
    }
}

/// Validates an update payload: every field is optional, bounds match create.
pub fn validate_update(payload: &Value) -> Result<TodoChanges, Vec<Violation>> {
    let object = expect_object(payload)?;
    let mut violations = Vec::new();

    let changes = TodoChanges {
        title: object
            .get("title")
            .and_then(|value| check_title(value, &mut violations)),
        description: object
            .get("description")
            .and_then(|value| check_description(value, &mut violations)),
        completed: object
            .get("completed")
            .and_then(|value| check_completed(value, &mut violations)),
    };

    if violations.is_empty() {
        Ok(changes)
    } else {
        Err(violations)
    }
}

fn expect_object(payload: &Value) -> Result<&Map<String, Value>, Vec<Violation>> {
    payload.as_object().ok_or_else(|| {
        vec![Violation {
            code: ViolationCode::InvalidType,
            path: Vec::new(),
            message: format!("Expected object, received {}", kind_of(payload)),
        }]
    })
}

fn check_title(value: &Value, violations: &mut Vec<Violation>) -> Option<String> {
    let title = check_string("title", value, violations)?;
    let length = text_length(title);
    if length < 1 {
        violations.push(Violation::at(
            "title",
            ViolationCode::TooSmall,
            "Title is required",
        ));
        None
    } else if length > TITLE_MAX_LENGTH {
        violations.push(Violation::at("title", ViolationCode::TooBig, "Title too long"));
        None
    } else {
        Some(title.to_string())
    }
}

fn check_description(value: &Value, violations: &mut Vec<Violation>) -> Option<String> {
    let description = check_string("description", value, violations)?;
    if text_length(description) > DESCRIPTION_MAX_LENGTH {
        violations.push(Violation::at(
            "description",
            ViolationCode::TooBig,
            "Description too long",
        ));
        return None;
    }
    Some(description.to_string())
}

fn check_completed(value: &Value, violations: &mut Vec<Violation>) -> Option<bool> {
    match value {
        Value::Bool(completed) => Some(*completed),
        other => {
            violations.push(type_mismatch("completed", "boolean", other));
            None
        }
    }
}

fn check_string<'a>(
    field: &str,
    value: &'a Value,
    violations: &mut Vec<Violation>,
) -> Option<&'a str> {
    match value {
        Value::String(text) => Some(text.as_str()),
        other => {
            violations.push(type_mismatch(field, "string", other));
            None
        }
    }
}

/// Length in UTF-16 code units, so characters outside the BMP count twice.
fn text_length(text: &str) -> usize {
    text.encode_utf16().count()
}

fn type_mismatch(field: &str, expected: &str, received: &Value) -> Violation {
    Violation::at(
        field,
        ViolationCode::InvalidType,
        format!("Expected {expected}, received {}", kind_of(received)),
    )
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
