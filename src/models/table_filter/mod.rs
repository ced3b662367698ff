//! The advanced filter of a list page: a JSON tree in the `filter` query
//! parameter, compiled to SQL by [`builder`].

use serde::{Deserialize, Serialize};

pub mod builder;

/// How sibling conditions combine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Logic {
    #[default]
    And,
    Or,
}

/// `field op value`, e.g. `name contains ana`. Field and operator are
/// checked against the list's whitelist before any SQL is built.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Condition {
    pub field: String,
    pub op: String,
    pub value: String,
}

impl Condition {
    pub fn new(field: &str, op: &str, value: &str) -> Self {
        Self { field: field.to_string(), op: op.to_string(), value: value.to_string() }
    }
}

/// One level of nesting, parenthesised in SQL.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Group {
    #[serde(default)]
    pub logic: Logic,
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct FilterTree {
    #[serde(default)]
    pub logic: Logic,
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(default)]
    pub groups: Vec<Group>,
}

impl FilterTree {
    /// A tree of plain conditions combined with AND.
    pub fn all(conditions: Vec<Condition>) -> Self {
        FilterTree { logic: Logic::And, conditions, groups: vec![] }
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty() && self.groups.iter().all(|g| g.conditions.is_empty())
    }

    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Value type of a filterable column; decides the allowed operators and
/// how the bound text parameter is cast.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Text,
    Id,
    /// `sql` is a subquery returning the ids related to the row.
    IdSet,
    Date,
}

/// A filterable column: query key → SQL expression. The expression is
/// hardcoded SQL, never user input.
#[derive(Debug, Clone, Copy)]
pub struct FilterField {
    pub key: &'static str,
    pub sql: &'static str,
    pub ty: FieldType,
}

impl FilterField {
    pub const fn text(key: &'static str, sql: &'static str) -> Self {
        Self { key, sql, ty: FieldType::Text }
    }
    pub const fn id(key: &'static str, sql: &'static str) -> Self {
        Self { key, sql, ty: FieldType::Id }
    }
    pub const fn id_set(key: &'static str, subquery: &'static str) -> Self {
        Self { key, sql: subquery, ty: FieldType::IdSet }
    }
    pub const fn date(key: &'static str, sql: &'static str) -> Self {
        Self { key, sql, ty: FieldType::Date }
    }

    /// Operator used when the field arrives as a plain `?key=value` parameter.
    pub fn shortcut_op(&self) -> &'static str {
        match self.ty {
            FieldType::Text => "equals",
            FieldType::Id | FieldType::IdSet => "is",
            FieldType::Date => "on",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortDir {
    #[default]
    Asc,
    Desc,
}

impl SortDir {
    /// Anything but an explicit `desc` sorts ascending.
    fn parse(raw: Option<&str>) -> Self {
        match raw {
            Some(d) if d.eq_ignore_ascii_case("desc") => SortDir::Desc,
            _ => SortDir::Asc,
        }
    }

    fn flipped(self) -> Self {
        match self {
            SortDir::Asc => SortDir::Desc,
            SortDir::Desc => SortDir::Asc,
        }
    }

    fn param(self) -> &'static str {
        match self {
            SortDir::Asc => "asc",
            SortDir::Desc => "desc",
        }
    }
}

/// Requested ordering. `column` is a key into the list's sort whitelist and
/// may be empty or unknown; the list falls back to its default then.
#[derive(Debug, Clone, Default)]
pub struct SortSpec {
    pub column: String,
    pub dir: SortDir,
}

impl SortSpec {
    pub fn from_params(sort: Option<&str>, dir: Option<&str>) -> Self {
        SortSpec {
            column: sort.map(str::trim).unwrap_or_default().to_string(),
            dir: SortDir::parse(dir),
        }
    }

    /// Value for the `dir` query parameter.
    pub fn dir_str(&self) -> &'static str {
        self.dir.param()
    }

    /// `dir` parameter for a header link that reverses the current order.
    pub fn toggle_dir(&self) -> &'static str {
        self.dir.flipped().param()
    }

    pub fn is_desc(&self) -> bool {
        self.dir == SortDir::Desc
    }

    pub fn sql_dir(&self) -> &'static str {
        if self.is_desc() { "DESC" } else { "ASC" }
    }
}
