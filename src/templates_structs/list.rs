use askama::Template;

use crate::forms::OptionView;
use super::PageContext;

/// One table cell. `href` and `badge` are empty when unused.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Cell {
    pub text: String,
    pub href: String,
    pub badge: String,
}

impl Cell {
    pub fn text(text: impl Into<String>) -> Self {
        Self { text: text.into(), ..Default::default() }
    }

    pub fn link(text: impl Into<String>, href: impl Into<String>) -> Self {
        Self { text: text.into(), href: href.into(), ..Default::default() }
    }

    pub fn badge(text: impl Into<String>, class: &str) -> Self {
        Self { text: text.into(), badge: class.to_string(), ..Default::default() }
    }

    /// Placeholder for missing optional values.
    pub fn dash() -> Self {
        Self::text("-")
    }

    pub fn opt(value: Option<&str>) -> Self {
        match value {
            Some(v) if !v.is_empty() => Self::text(v),
            _ => Self::dash(),
        }
    }
}

pub struct ColumnView {
    pub label: String,
    /// Empty for unsortable columns.
    pub sort_href: String,
    /// "asc", "desc" or "" when the list is not sorted by this column.
    pub sort_state: String,
}

pub struct RowView {
    pub cells: Vec<Cell>,
    pub detail_href: String,
    pub edit_href: String,
    pub delete_href: String,
}

/// A `<select>` in the filter bar, submitted as a shortcut parameter.
pub struct FilterSelectView {
    pub name: String,
    pub label: String,
    pub options: Vec<OptionView>,
}

#[derive(Template)]
#[template(path = "list.html")]
pub struct ListTemplate {
    pub ctx: PageContext,
    pub title: String,
    pub base_url: String,
    pub q: String,
    /// Query state the search form must carry along (sort, dir, filter).
    pub hidden: Vec<(String, String)>,
    pub columns: Vec<ColumnView>,
    pub rows: Vec<RowView>,
    pub filters: Vec<FilterSelectView>,
    pub has_actions: bool,
    pub page: i64,
    pub total_pages: i64,
    pub total_count: i64,
    pub prev_href: String,
    pub next_href: String,
    pub new_href: String,
    pub clear_href: String,
}
