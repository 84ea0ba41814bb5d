use super::error::FieldError;
use super::models::BookForm;

pub const TITLE_MAX_CHARS: usize = 30;
pub const AUTHOR_MAX_CHARS: usize = 20;

const NOT_BLANK: &str = "validation.not-blank";
const MAX_SIZE: &str = "validation.max-size";

/// Check the submitted form; every violated constraint yields one error.
pub fn validate(form: &BookForm) -> Result<(), Vec<FieldError>> {
    let mut errors = Vec::new();
    check_text("title", &form.title, TITLE_MAX_CHARS, &mut errors);
    check_text("author", &form.author, AUTHOR_MAX_CHARS, &mut errors);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_text(field: &'static str, value: &str, max: usize, errors: &mut Vec<FieldError>) {
    if value.trim().is_empty() {
        errors.push(FieldError {
            field,
            code: NOT_BLANK,
            max: None,
        });
    }
    // Length is counted in characters, not bytes
    if value.chars().count() > max {
        errors.push(FieldError {
            field,
            code: MAX_SIZE,
            max: Some(max),
        });
    }
}
