use serde::Deserialize;

use crate::error::ValidationErrors;

pub const TITLE_MAX_CHARS: usize = 200;

const REQUIRED: &str = "This field is required.";
const BLANK: &str = "This field may not be blank.";
const NULL_CHAR: &str = "Null characters are not allowed.";

/// Request body for create, replace and partial update. Fields the caller
/// may not set (`id`, `owner`, `created_at`) are dropped during decoding.
#[derive(Debug, Default, Deserialize)]
pub struct TaskPayload {
    pub title: Option<String>,
    pub description: Option<String>,
    pub is_completed: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    pub title: String,
    pub description: String,
    pub is_completed: bool,
}

/// Field updates for an existing task; `None` keeps the stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub is_completed: Option<bool>,
}

impl TaskPayload {
    pub fn validate_create(self) -> Result<NewTask, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let title = required(self.title, "title", &mut errors)
            .and_then(|t| check_title(t, &mut errors));
        let description = required(self.description, "description", &mut errors)
            .and_then(|d| check_description(d, &mut errors));

        match (title, description) {
            (Some(title), Some(description)) => errors.finish(NewTask {
                title,
                description,
                is_completed: self.is_completed.unwrap_or(false),
            }),
            _ => Err(errors),
        }
    }

    /// Full replace: every writable field must be present.
    pub fn validate_replace(self) -> Result<TaskChanges, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let title = required(self.title, "title", &mut errors)
            .and_then(|t| check_title(t, &mut errors));
        let description = required(self.description, "description", &mut errors)
            .and_then(|d| check_description(d, &mut errors));
        if self.is_completed.is_none() {
            errors.add("is_completed", REQUIRED);
        }

        errors.finish(TaskChanges {
            title,
            description,
            is_completed: self.is_completed,
        })
    }

    pub fn validate_patch(self) -> Result<TaskChanges, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let title = self.title.and_then(|t| check_title(t, &mut errors));
        let description = self
            .description
            .and_then(|d| check_description(d, &mut errors));

        errors.finish(TaskChanges {
            title,
            description,
            is_completed: self.is_completed,
        })
    }
}

fn required(
    value: Option<String>,
    field: &'static str,
    errors: &mut ValidationErrors,
) -> Option<String> {
    if value.is_none() {
        errors.add(field, REQUIRED);
    }
    value
}

/// Postgres text columns cannot store NUL.
fn has_null_char(field: &'static str, value: &str, errors: &mut ValidationErrors) -> bool {
    if value.contains('\0') {
        errors.add(field, NULL_CHAR);
        return true;
    }
    false
}

/// Trims the title and rejects blank, overlong or NUL-bearing values.
pub fn check_title(raw: String, errors: &mut ValidationErrors) -> Option<String> {
    if has_null_char("title", &raw, errors) {
        return None;
    }
    let title = raw.trim();

    if title.is_empty() {
        errors.add("title", BLANK);
        return None;
    }
    if title.chars().count() > TITLE_MAX_CHARS {
        errors.add(
            "title",
            format!("Ensure this field has no more than {} characters.", TITLE_MAX_CHARS),
        );
        return None;
    }

    Some(title.to_string())
}

/// Description may be empty, but is trimmed and must not contain NUL.
fn check_description(raw: String, errors: &mut ValidationErrors) -> Option<String> {
    if has_null_char("description", &raw, errors) {
        return None;
    }
    Some(raw.trim().to_string())
}

/// Query string of the list endpoint. Values stay raw so a malformed
/// parameter is handled here rather than rejected by the extractor.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub is_completed: Option<String>,
    pub page: Option<String>,
}

impl ListQuery {
    /// Unrecognized values disable the filter instead of failing the request.
    pub fn completion_filter(&self) -> Option<bool> {
        match self.is_completed.as_deref()? {
            "true" | "True" | "1" => Some(true),
            "false" | "False" | "0" => Some(false),
            _ => None,
        }
    }

    /// `None` when the page parameter is present but not a positive integer.
    pub fn page_number(&self) -> Option<u32> {
        match self.page.as_deref() {
            None => Some(1),
            Some(raw) => raw.parse::<u32>().ok().filter(|n| *n >= 1),
        }
    }
}
