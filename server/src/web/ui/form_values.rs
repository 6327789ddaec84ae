//! `FormValue` helper types that keep the submitted string and the validation errors of a form
//! field, for validating user input and re-rendering the form with the errors next to the inputs.

use serde::de::Error;
use serde::{Deserialize, Deserializer};
use std::fmt::{Debug, Formatter};
use std::marker::PhantomData;

const MISSING_VALUE_MESSAGE: &str = "Valoarea lipsește din formular";

#[derive(Debug, Deserialize)]
#[serde(transparent)]
pub struct FormValue<T: FormValueRepresentation> {
    value: Option<String>,
    #[serde(skip)]
    errors: Vec<String>,
    #[serde(skip)]
    _phantom: PhantomData<T>,
}

/// Implemented by types that can be used as an HTML form string value
///
/// Validation of submitted strings is implemented either via [ValidateFromFormInput], when no
/// additional data is required, or via [ValidationDataForFormValue] for some data type that is
/// needed for the check (e.g. the list of allowed ids).
pub trait FormValueRepresentation: Debug {
    fn into_form_value_string(self) -> String;
}

/// Types that can be validated and converted directly from their form string representation
pub trait ValidateFromFormInput: FormValueRepresentation + Sized {
    fn from_form_value(value: &'_ str) -> Result<Self, String>;
}

/// Allow validating the [FormValueRepresentation] type `R` with the help of this type, via
/// [FormValue::validate_with].
pub trait ValidationDataForFormValue<R: FormValueRepresentation> {
    fn validate_form_value(self, value: &'_ str) -> Result<R, String>;
}

impl FormValueRepresentation for String {
    fn into_form_value_string(self) -> String {
        self
    }
}

impl ValidateFromFormInput for String {
    fn from_form_value(value: &'_ str) -> Result<Self, String> {
        Ok(value.to_owned())
    }
}

impl<T: FormValueRepresentation> FormValue<T> {
    pub fn validate(&mut self) -> Option<T>
    where
        T: ValidateFromFormInput,
    {
        let result = match &self.value {
            Some(value) => T::from_form_value(value),
            None => Err(MISSING_VALUE_MESSAGE.to_owned()),
        };
        self.take_result(result)
    }

    pub fn validate_with<D: ValidationDataForFormValue<T>>(&mut self, data: D) -> Option<T> {
        let result = match &self.value {
            Some(value) => data.validate_form_value(value),
            None => Err(MISSING_VALUE_MESSAGE.to_owned()),
        };
        self.take_result(result)
    }

    fn take_result(&mut self, result: Result<T, String>) -> Option<T> {
        match result {
            Ok(v) => Some(v),
            Err(e) => {
                self.errors.push(e);
                None
            }
        }
    }

    /// Manually add a validation error related to this form field.
    ///
    /// Used for higher-level errors found when checking the consistency of the overall form, e.g.
    /// a password confirmation that does not match.
    pub fn add_error(&mut self, error: String) {
        self.errors.push(error)
    }

    /// Check if validation errors have occurred, related to this form value.
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn errors(&self) -> &Vec<String> {
        &self.errors
    }

    /// The current string representation of the form value, to be used as the `value` attribute
    /// of the form input
    pub fn string_value(&self) -> &str {
        self.value.as_deref().unwrap_or("")
    }

    /// Clear the value, e.g. for not sending back submitted passwords
    pub fn clear(&mut self) {
        self.value = None;
    }
}

impl<T: FormValueRepresentation> Default for FormValue<T> {
    fn default() -> Self {
        FormValue {
            value: None,
            errors: vec![],
            _phantom: Default::default(),
        }
    }
}

impl<T: FormValueRepresentation> From<T> for FormValue<T> {
    fn from(value: T) -> Self {
        FormValue {
            value: Some(value.into_form_value_string()),
            errors: vec![],
            _phantom: Default::default(),
        }
    }
}

/// Form value of a checkbox input
///
/// The value is `true` when the field is present in the submitted form (with any value) and
/// `false` otherwise.
#[derive(Debug, Default)]
pub struct BoolFormValue {
    value: bool,
}

impl BoolFormValue {
    pub fn get_value(&self) -> bool {
        self.value
    }
}

impl<'de> serde::Deserialize<'de> for BoolFormValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_option(BoolFormValueVisitor {})
    }
}

/// Only reacts to `visit_some()` and `visit_none()`, to map the presence of the field to the value
struct BoolFormValueVisitor;

impl<'de> serde::de::Visitor<'de> for BoolFormValueVisitor {
    type Value = BoolFormValue;

    fn expecting(&self, formatter: &mut Formatter) -> std::fmt::Result {
        formatter.write_str("any value (true) or no such field at all")
    }

    fn visit_none<E>(self) -> Result<Self::Value, E>
    where
        E: Error,
    {
        Ok(BoolFormValue { value: false })
    }

    fn visit_some<D>(self, _deserializer: D) -> Result<Self::Value, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(BoolFormValue { value: true })
    }
}

impl From<bool> for BoolFormValue {
    fn from(value: bool) -> Self {
        Self { value }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::web::ui::validation::{GuestName, Hour};
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct TestForm {
        #[serde(default)]
        name: FormValue<GuestName>,
        #[serde(default)]
        hour: FormValue<Hour>,
        #[serde(default)]
        special: BoolFormValue,
    }

    #[test]
    fn test_deserialize_and_validate_form() {
        let mut form: TestForm =
            serde_urlencoded::from_str("name=%20Ana%20Pop%20&hour=25&special=on").unwrap();
        assert_eq!(form.name.validate().unwrap().into_inner(), "Ana Pop");
        assert!(!form.name.has_errors());
        assert_eq!(form.name.string_value(), " Ana Pop ");

        assert!(form.hour.validate().is_none());
        assert_eq!(form.hour.errors().len(), 1);
        assert_eq!(form.hour.string_value(), "25");

        assert!(form.special.get_value());
    }

    #[test]
    fn test_missing_fields() {
        let mut form: TestForm = serde_urlencoded::from_str("").unwrap();
        assert!(form.name.validate().is_none());
        assert_eq!(form.name.errors(), &vec![MISSING_VALUE_MESSAGE.to_owned()]);
        assert!(!form.special.get_value());
    }
}
