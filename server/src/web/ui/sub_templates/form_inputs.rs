use crate::web::ui::form_values::{BoolFormValue, FormValue, FormValueRepresentation};
use askama::Template;
use std::borrow::Cow;

#[derive(Debug, PartialEq)]
pub enum InputType {
    Text,
    Email,
    Password,
    Date,
    Integer,
    Textarea,
}

impl InputType {
    fn as_html_type_attr(&self) -> &'static str {
        match self {
            InputType::Text => "text",
            InputType::Email => "email",
            InputType::Password => "password",
            InputType::Date => "date",
            InputType::Integer => "number",
            _ => panic!("Input type {:?} should be handled separately.", self),
        }
    }
}

pub struct InputConfiguration<'a> {
    input_type: InputType,
    info: Option<&'a str>,
    /// Value of the `autocomplete` attribute, e.g. "current-password"
    autocomplete: Option<&'a str>,
    required: bool,
}

impl Default for InputConfiguration<'_> {
    fn default() -> Self {
        Self {
            input_type: InputType::Text,
            info: None,
            autocomplete: None,
            required: true,
        }
    }
}

impl<'a> InputConfiguration<'a> {
    pub fn builder() -> InputConfigurationBuilder<'a> {
        InputConfigurationBuilder::default()
    }
}

#[derive(Default)]
pub struct InputConfigurationBuilder<'a> {
    value: InputConfiguration<'a>,
}

impl<'a> InputConfigurationBuilder<'a> {
    pub fn input_type(mut self, input_type: InputType) -> Self {
        self.value.input_type = input_type;
        self
    }
    pub fn info<'b: 'a>(mut self, info: &'b str) -> Self {
        self.value.info = Some(info);
        self
    }
    pub fn autocomplete(mut self, autocomplete: &'a str) -> Self {
        self.value.autocomplete = Some(autocomplete);
        self
    }
    pub fn optional(mut self) -> Self {
        self.value.required = false;
        self
    }
    pub fn build(self) -> InputConfiguration<'a> {
        self.value
    }
}

#[derive(Template)]
#[template(path = "sub_templates/form_inputs/form_field.html")]
pub struct FormFieldTemplate<'a, T: FormValueRepresentation> {
    name: &'a str,
    label: &'a str,
    config: InputConfiguration<'a>,
    data: &'a FormValue<T>,
}

impl<'a, T: FormValueRepresentation> FormFieldTemplate<'a, T> {
    pub fn new(
        data: &'a FormValue<T>,
        name: &'a str,
        label: &'a str,
        config: InputConfiguration<'a>,
    ) -> Self {
        Self {
            name,
            label,
            config,
            data,
        }
    }

    fn is_textarea(&self) -> bool {
        self.config.input_type == InputType::Textarea
    }

    fn type_attr(&self) -> &'static str {
        self.config.input_type.as_html_type_attr()
    }
}

pub struct SelectEntry<'a> {
    pub value: Cow<'a, str>,
    pub text: Cow<'a, str>,
}

#[derive(Template)]
#[template(path = "sub_templates/form_inputs/select.html")]
pub struct SelectTemplate<'a, T: FormValueRepresentation> {
    name: &'a str,
    entries: Vec<SelectEntry<'a>>,
    label: &'a str,
    config: InputConfiguration<'a>,
    data: &'a FormValue<T>,
}

impl<'a, T: FormValueRepresentation> SelectTemplate<'a, T> {
    pub fn new(
        data: &'a FormValue<T>,
        name: &'a str,
        entries: Vec<SelectEntry<'a>>,
        label: &'a str,
        config: InputConfiguration<'a>,
    ) -> Self {
        Self {
            name,
            entries,
            label,
            config,
            data,
        }
    }

    fn is_selected(&self, entry: &SelectEntry) -> bool {
        self.data.string_value() == entry.value
    }
}

#[derive(Template)]
#[template(path = "sub_templates/form_inputs/checkbox.html")]
pub struct CheckboxTemplate<'a> {
    name: &'a str,
    label: &'a str,
    info: Option<&'a str>,
    data: &'a BoolFormValue,
}

impl<'a> CheckboxTemplate<'a> {
    pub fn new(
        data: &'a BoolFormValue,
        name: &'a str,
        label: &'a str,
        info: Option<&'a str>,
    ) -> Self {
        Self {
            name,
            label,
            info,
            data,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::web::ui::validation::GuestName;

    #[test]
    fn test_form_field_shows_value_and_errors() {
        let mut value: FormValue<GuestName> = GuestName("Io".to_owned()).into();
        assert!(value.validate().is_none());
        let html = FormFieldTemplate::new(
            &value,
            "guest_name",
            "Nume invitat",
            InputConfiguration::default(),
        )
        .render()
        .unwrap();
        assert!(html.contains(r#"name="guest_name""#));
        assert!(html.contains(r#"value="Io""#));
        assert!(html.contains("is-invalid"));
    }

    #[test]
    fn test_select_marks_current_value() {
        let value: FormValue<String> = "2".to_owned().into();
        let html = SelectTemplate::new(
            &value,
            "table_id",
            vec![
                SelectEntry {
                    value: Cow::Borrowed("1"),
                    text: Cow::Borrowed("Masa 1"),
                },
                SelectEntry {
                    value: Cow::Borrowed("2"),
                    text: Cow::Borrowed("Masa 2"),
                },
            ],
            "Masa",
            InputConfiguration::default(),
        )
        .render()
        .unwrap();
        assert!(html.contains(r#"<option value="2" selected>Masa 2</option>"#));
        assert!(html.contains(r#"<option value="1">Masa 1</option>"#));
    }
}
