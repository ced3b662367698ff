use askama::Template;

use crate::forms::FieldView;
use crate::i18n::Locale;
use super::PageContext;

#[derive(Template)]
#[template(path = "login.html")]
pub struct LoginTemplate {
    pub error: String,
    pub username: String,
    pub app_name: String,
    pub csrf_token: String,
    pub locale: Locale,
    pub lang: String,
}

#[derive(Template)]
#[template(path = "account.html")]
pub struct AccountTemplate {
    pub ctx: PageContext,
    pub display_name: String,
    pub fields: Vec<FieldView>,
    pub form_errors: Vec<String>,
}
