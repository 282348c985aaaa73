//! `multipart/form-data` decoding for the file-bearing workflow endpoints.

use axum::extract::Multipart;

use crate::ServiceError;

/// An uploaded file held in memory until the service stores it.
#[derive(Debug, Clone)]
pub struct FilePart {
    pub file_name: String,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

impl FilePart {
    pub fn new(file_name: &str, data: impl Into<Vec<u8>>) -> Self {
        Self {
            file_name: file_name.to_string(),
            content_type: None,
            data: data.into(),
        }
    }
}

/// A decoded form: text fields and file parts, in submission order.
#[derive(Debug, Default)]
pub struct FormData {
    fields: Vec<(String, String)>,
    files: Vec<(String, FilePart)>,
}

impl FormData {
    /// Drain a multipart body. Empty file inputs are dropped.
    pub async fn read(mut multipart: Multipart) -> Result<Self, ServiceError> {
        let mut form = FormData::default();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ServiceError::Validation(format!("malformed form data: {}", e)))?
        {
            let name = field.name().unwrap_or_default().to_string();
            match field.file_name().map(str::to_string) {
                Some(file_name) => {
                    let content_type = field.content_type().map(str::to_string);
                    let data = field
                        .bytes()
                        .await
                        .map_err(|e| ServiceError::Validation(format!("upload failed: {}", e)))?;
                    if file_name.is_empty() && data.is_empty() {
                        continue;
                    }
                    form.files.push((
                        name,
                        FilePart {
                            file_name,
                            content_type,
                            data: data.to_vec(),
                        },
                    ));
                }
                None => {
                    let text = field
                        .text()
                        .await
                        .map_err(|e| ServiceError::Validation(format!("bad field {}: {}", name, e)))?;
                    form.fields.push((name, text));
                }
            }
        }
        Ok(form)
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Every value submitted under `name` (repeated inputs).
    pub fn texts(&self, name: &str) -> Vec<String> {
        self.fields
            .iter()
            .filter(|(n, _)| n == name)
            .map(|(_, v)| v.clone())
            .collect()
    }

    /// Trimmed, non-blank text value.
    pub fn string(&self, name: &str) -> Option<String> {
        self.text(name)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    /// Checkbox semantics: present and truthy.
    pub fn flag(&self, name: &str) -> bool {
        matches!(
            self.text(name).map(|v| v.trim().to_ascii_lowercase()).as_deref(),
            Some("true" | "on" | "1" | "yes")
        )
    }

    pub fn int(&self, name: &str) -> Result<Option<i64>, ServiceError> {
        match self.string(name) {
            None => Ok(None),
            Some(v) => v
                .parse::<i64>()
                .map(Some)
                .map_err(|_| ServiceError::Validation(format!("{} must be a whole number", name))),
        }
    }

    pub fn take_file(&mut self, name: &str) -> Option<FilePart> {
        let pos = self.files.iter().position(|(n, _)| n == name)?;
        Some(self.files.remove(pos).1)
    }

    pub fn take_files(&mut self, name: &str) -> Vec<FilePart> {
        let (taken, rest): (Vec<_>, Vec<_>) =
            std::mem::take(&mut self.files).into_iter().partition(|(n, _)| n == name);
        self.files = rest;
        taken.into_iter().map(|(_, f)| f).collect()
    }
}
