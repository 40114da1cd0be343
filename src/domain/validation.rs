use serde::Serialize;

/// A single field-level validation failure, as rendered in the `400` response body:
/// `{"errors": [{"field": "...", "code": "..."}]}`.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub code: String,
}

impl FieldError {
    pub fn new(
        field: impl Into<String>,
        code: impl Into<String>,
    ) -> Self {
        Self { field: field.into(), code: code.into() }
    }
}

/// An accumulator for field errors, used so the submit pipeline can report every
/// offending field in one `400` instead of rejecting on the first one found.
#[derive(Debug, Default, Clone, Serialize, PartialEq, Eq)]
pub struct ValidationErrors {
    pub errors: Vec<FieldError>,
}

impl ValidationErrors {
    pub fn push(
        &mut self,
        field: impl Into<String>,
        code: impl Into<String>,
    ) {
        self.errors.push(FieldError::new(field, code));
    }

    pub fn is_empty(&self) -> bool { self.errors.is_empty() }

    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}
