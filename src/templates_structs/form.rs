use askama::Template;

use crate::forms::FieldView;
use super::PageContext;

#[derive(Template)]
#[template(path = "form.html")]
pub struct FormTemplate {
    pub ctx: PageContext,
    pub title: String,
    pub action: String,
    pub cancel_href: String,
    pub fields: Vec<FieldView>,
    pub form_errors: Vec<String>,
}

#[derive(Template)]
#[template(path = "confirm_delete.html")]
pub struct ConfirmDeleteTemplate {
    pub ctx: PageContext,
    pub title: String,
    pub description: String,
    pub action: String,
    pub cancel_href: String,
    pub form_errors: Vec<String>,
}
