//! The editable resume document: a YAML mapping with an `editing` marker.

use serde_yaml::{Mapping, Value};

use crate::errors::AppError;

const EDITING_KEY: &str = "editing";

/// A parsed resume document. All keys other than `editing` pass through untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    body: Mapping,
}

impl Document {
    pub fn parse(text: &str) -> Result<Self, AppError> {
        match serde_yaml::from_str::<Value>(text)? {
            Value::Mapping(body) => Ok(Self { body }),
            Value::Null => Err(AppError::Validation(
                "resume document is empty".to_string(),
            )),
            _ => Err(AppError::Validation(
                "resume document must be a YAML mapping".to_string(),
            )),
        }
    }

    #[cfg(test)]
    pub fn editing(&self) -> Option<bool> {
        self.body.get(EDITING_KEY).and_then(Value::as_bool)
    }

    pub fn set_editing(&mut self, editing: bool) {
        self.body
            .insert(Value::String(EDITING_KEY.to_string()), Value::Bool(editing));
    }

    #[cfg(test)]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.body.get(key)
    }

    pub fn to_yaml(&self) -> Result<String, AppError> {
        Ok(serde_yaml::to_string(&self.body)?)
    }
}

/// Parses `text`, turns editing off, and serialises the sidecar the renderer reads.
pub fn finalize_sidecar(text: &str) -> Result<String, AppError> {
    let mut document = Document::parse(text)?;
    document.set_editing(false);
    document.to_yaml()
}
