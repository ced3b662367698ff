//! Generic form plumbing shared by every resource: the submitted data,
//! declarative field specs, and the views the form template renders.

pub mod errors;
pub mod reader;

use serde::Deserialize;

use crate::i18n::Locale;
use self::errors::FieldError;

pub use self::errors::{ErrorCode, SaveError};
pub use self::reader::FormReader;

/// Submitted `application/x-www-form-urlencoded` pairs, in order.
/// Repeated keys are kept (multi-selects).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct FormData(pub Vec<(String, String)>);

impl FormData {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn get_all(&self, name: &str) -> Vec<&str> {
        self.0
            .iter()
            .filter(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    pub fn csrf_token(&self) -> &str {
        self.get("csrf_token").unwrap_or("")
    }

    /// Replace every value of `name` with `value`.
    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        self.0.retain(|(k, _)| k != name);
        self.0.push((name.to_string(), value.into()));
    }

    pub fn push(&mut self, name: &str, value: impl Into<String>) {
        self.0.push((name.to_string(), value.into()));
    }

    pub fn with(mut self, name: &str, value: impl ToString) -> Self {
        self.set(name, value.to_string());
        self
    }

    pub fn with_opt(self, name: &str, value: Option<impl ToString>) -> Self {
        match value {
            Some(v) => self.with(name, v),
            None => self,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Email,
    Password,
    Url,
    Textarea,
    Number,
    Date,
    DateTime,
    Time,
    Select,
    MultiSelect,
    Checkbox,
}

impl FieldKind {
    fn input_type(&self) -> &'static str {
        match self {
            FieldKind::Email => "email",
            FieldKind::Password => "password",
            FieldKind::Url => "url",
            FieldKind::Number => "number",
            FieldKind::Date => "date",
            FieldKind::DateTime => "datetime-local",
            FieldKind::Time => "time",
            _ => "text",
        }
    }

    fn widget(&self) -> &'static str {
        match self {
            FieldKind::Textarea => "textarea",
            FieldKind::Select => "select",
            FieldKind::MultiSelect => "multiselect",
            FieldKind::Checkbox => "checkbox",
            _ => "input",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
}

impl SelectOption {
    pub fn new(value: impl ToString, label: impl Into<String>) -> Self {
        Self { value: value.to_string(), label: label.into() }
    }
}

/// Declarative description of one form input.
#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub required: bool,
    pub options: Vec<SelectOption>,
    /// Option labels are i18n keys (enum-like choices such as days).
    pub localized_options: bool,
    pub hint: Option<&'static str>,
}

impl FieldSpec {
    pub fn new(name: &'static str, kind: FieldKind) -> Self {
        Self { name, kind, required: false, options: vec![], localized_options: false, hint: None }
    }

    pub fn text(name: &'static str) -> Self {
        Self::new(name, FieldKind::Text)
    }

    pub fn select(name: &'static str, options: Vec<SelectOption>) -> Self {
        Self { options, ..Self::new(name, FieldKind::Select) }
    }

    pub fn multi(name: &'static str, options: Vec<SelectOption>) -> Self {
        Self { options, ..Self::new(name, FieldKind::MultiSelect) }
    }

    /// A select over fixed values whose labels come from the catalog.
    pub fn choice(name: &'static str, values: &[&str]) -> Self {
        let options = values.iter().map(|v| SelectOption::new(v, *v)).collect();
        Self { options, localized_options: true, ..Self::new(name, FieldKind::Select) }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn hint(mut self, key: &'static str) -> Self {
        self.hint = Some(key);
        self
    }
}

#[derive(Debug, Clone)]
pub struct OptionView {
    pub value: String,
    pub label: String,
    pub selected: bool,
}

/// Everything the form template needs for one input.
#[derive(Debug, Clone)]
pub struct FieldView {
    pub name: String,
    pub label: String,
    pub input_type: String,
    pub widget: String,
    pub value: String,
    pub checked: bool,
    pub required: bool,
    pub options: Vec<OptionView>,
    pub error: String,
    pub hint: String,
}

/// Combine specs, current values and errors into renderable views.
/// Returns the field views plus form-level messages (errors without a
/// matching field).
pub fn build_views(
    specs: &[FieldSpec],
    data: &FormData,
    errors: &[FieldError],
    locale: Locale,
) -> (Vec<FieldView>, Vec<String>) {
    let fields: Vec<FieldView> = specs
        .iter()
        .map(|spec| {
            let selected = data.get_all(spec.name);
            let value = data.get(spec.name).unwrap_or("").to_string();
            let options = spec
                .options
                .iter()
                .map(|o| OptionView {
                    value: o.value.clone(),
                    label: if spec.localized_options {
                        locale.t(&o.label).to_string()
                    } else {
                        o.label.clone()
                    },
                    selected: selected.contains(&o.value.as_str()),
                })
                .collect();
            let error = errors
                .iter()
                .find(|e| e.field == spec.name)
                .map(|e| locale.error(&e.code))
                .unwrap_or_default();
            FieldView {
                name: spec.name.to_string(),
                label: locale.t(spec.name).to_string(),
                input_type: spec.kind.input_type().to_string(),
                widget: spec.kind.widget().to_string(),
                checked: matches!(value.as_str(), "on" | "true"),
                value: if spec.kind == FieldKind::Password { String::new() } else { value },
                required: spec.required,
                options,
                error,
                hint: spec.hint.map(|h| locale.t(h).to_string()).unwrap_or_default(),
            }
        })
        .collect();

    let form_errors = errors
        .iter()
        .filter(|e| e.is_form_level() || !specs.iter().any(|s| s.name == e.field))
        .map(|e| locale.error(&e.code))
        .collect();

    (fields, form_errors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forms::errors::ErrorCode;

    fn data(pairs: &[(&str, &str)]) -> FormData {
        FormData(pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect())
    }

    #[test]
    fn urlencoded_keeps_repeated_keys() {
        let form: FormData =
            serde_urlencoded::from_str("name=Ana&subject_ids=1&subject_ids=3&csrf_token=t").unwrap();
        assert_eq!(form.get("name"), Some("Ana"));
        assert_eq!(form.get_all("subject_ids"), vec!["1", "3"]);
        assert_eq!(form.csrf_token(), "t");
    }

    #[test]
    fn set_replaces_all_values() {
        let mut form = data(&[("a", "1"), ("a", "2")]);
        form.set("a", "3");
        assert_eq!(form.get_all("a"), vec!["3"]);
    }

    #[test]
    fn views_mark_selection_and_errors() {
        let specs = vec![
            FieldSpec::text("name").required(),
            FieldSpec::choice("sex", &["MALE", "FEMALE"]).required(),
            FieldSpec::new("password", FieldKind::Password),
        ];
        let form = data(&[("name", ""), ("sex", "FEMALE"), ("password", "secret")]);
        let errors = vec![
            FieldError::new("name", ErrorCode::Required),
            FieldError::form(ErrorCode::InUse),
            FieldError::new("not_on_form", ErrorCode::Duplicate),
        ];
        let (fields, form_errors) = build_views(&specs, &form, &errors, Locale::En);

        assert_eq!(fields[0].error, "This field is required");
        assert_eq!(fields[0].label, "First name");
        assert!(fields[0].required);
        assert_eq!(fields[1].widget, "select");
        assert_eq!(fields[1].options[1].label, "Female");
        assert!(fields[1].options[1].selected);
        assert!(!fields[1].options[0].selected);
        assert_eq!(fields[2].value, "", "passwords are never echoed back");
        assert_eq!(form_errors.len(), 2);
    }

    #[test]
    fn checkbox_reads_on_and_true() {
        let specs = vec![FieldSpec::new("present", FieldKind::Checkbox)];
        let (fields, _) = build_views(&specs, &data(&[("present", "on")]), &[], Locale::Es);
        assert!(fields[0].checked);
        let (fields, _) = build_views(&specs, &data(&[]), &[], Locale::Es);
        assert!(!fields[0].checked);
    }
}
