use std::collections::BTreeMap;

use serde_json::Value;

pub const REQUIRED: &str = "This field is required.";
pub const NOT_NULL: &str = "This field may not be null.";
pub const NOT_BLANK: &str = "This field may not be blank.";
pub const NOT_A_STRING: &str = "Not a valid string.";
pub const NOT_A_BOOLEAN: &str = "Must be a valid boolean.";
pub const INVALID_JSON: &str = "Value must be valid JSON.";
pub const NO_FILE: &str = "No file was submitted.";
pub const NOT_A_FILE: &str = "The submitted data was not a file. Check the encoding type on the form.";
pub const EMPTY_FILE: &str = "The submitted file is empty.";
pub const INVALID_IMAGE: &str =
	"Upload a valid image. The file you uploaded was either not an image or a corrupted image.";

/// Field level errors keyed by field name, serialized as
/// `{"field": ["message", ...]}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<String, Vec<String>>);

impl ValidationErrors {
	pub fn add(&mut self, field: &str, message: impl Into<String>) {
		self.0.entry(field.to_owned()).or_default().push(message.into());
	}

	pub fn merge(&mut self, other: ValidationErrors) {
		for (field, messages) in other.0 {
			self.0.entry(field).or_default().extend(messages);
		}
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	pub fn field(&self, field: &str) -> Option<&[String]> {
		self.0.get(field).map(Vec::as_slice)
	}

	pub fn single(field: &str, message: impl Into<String>) -> Self {
		let mut errors = Self::default();
		errors.add(field, message);
		errors
	}

	pub fn into_result(self) -> Result<(), Self> {
		if self.is_empty() { Ok(()) } else { Err(self) }
	}

	/// Records an error when `value` is longer than `max` characters.
	pub fn max_length(&mut self, field: &str, value: &str, max: usize) {
		if value.chars().count() > max {
			self.add(field, format!("Ensure this field has no more than {max} characters."));
		}
	}
}

/// Strips surrounding whitespace from a submitted text field.
pub fn trimmed(value: Option<String>) -> Option<String> {
	value.map(|value| value.trim().to_owned())
}

/// A layout document as it arrived, either already structured (JSON bodies)
/// or still serialized (form fields and JSON strings).
#[derive(Debug, Clone, PartialEq)]
pub enum LayoutJson {
	Raw(String),
	Value(Value),
}

impl LayoutJson {
	pub fn into_value(self) -> Result<Value, &'static str> {
		match self {
			LayoutJson::Raw(raw) => match serde_json::from_str(&raw) {
				Ok(Value::Null) => Err(NOT_NULL),
				Ok(value) => Ok(value),
				Err(_) => Err(INVALID_JSON),
			},
			LayoutJson::Value(Value::Null) => Err(NOT_NULL),
			LayoutJson::Value(Value::String(raw)) => LayoutJson::Raw(raw).into_value(),
			LayoutJson::Value(value) => Ok(value),
		}
	}
}

impl From<Value> for LayoutJson {
	fn from(value: Value) -> Self {
		LayoutJson::Value(value)
	}
}
