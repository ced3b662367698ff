//! Generic list pages: search, filters, sorting and pagination applied in
//! SQL on top of the caller's role scope.

use std::collections::HashMap;

use sqlx::postgres::PgRow;
use sqlx::{FromRow, PgPool};

use crate::auth::role::Viewer;
use crate::errors::AppError;
use super::ResourceKind;
use super::scope;
use super::table_filter::builder::{build_search_clause, build_where_clause};
use super::table_filter::{Condition, FilterField, FilterTree, SortSpec};

pub const PER_PAGE: i64 = 10;

/// Highest page whose offset still fits in an `i64`.
const MAX_PAGE: i64 = i64::MAX / PER_PAGE;

const RESERVED: &[&str] = &["q", "sort", "dir", "page", "filter"];

/// Static description of one resource's list query.
pub struct ListSpec {
    pub kind: ResourceKind,
    /// `SELECT ... FROM ... JOIN ...` without WHERE / ORDER BY.
    pub select: &'static str,
    pub id_col: &'static str,
    pub fields: &'static [FilterField],
    pub search: &'static [&'static str],
    /// Sort key → SQL expression.
    pub sorts: &'static [(&'static str, &'static str)],
    pub default_sort: &'static str,
    pub default_desc: bool,
}

impl ListSpec {
    pub fn sort_sql(&self, key: &str) -> Option<&'static str> {
        self.sorts.iter().find(|(k, _)| *k == key).map(|(_, sql)| *sql)
    }
}

/// List state carried in the query string.
#[derive(Debug, Clone)]
pub struct ListQuery {
    pub q: String,
    pub sort: SortSpec,
    pub page: i64,
    pub filters: FilterTree,
    /// `?class_id=3` style parameters, sorted by key.
    pub shortcuts: Vec<(String, String)>,
}

impl Default for ListQuery {
    fn default() -> Self {
        ListQuery {
            q: String::new(),
            sort: SortSpec::default(),
            page: 1,
            filters: FilterTree::default(),
            shortcuts: vec![],
        }
    }
}

impl ListQuery {
    pub fn from_params(params: &HashMap<String, String>) -> Self {
        let filters = match params.get("filter").map(|s| s.trim()).filter(|s| !s.is_empty()) {
            Some(json) => FilterTree::from_json(json).unwrap_or_else(|e| {
                log::warn!("Ignoring malformed filter '{json}': {e}");
                FilterTree::default()
            }),
            None => FilterTree::default(),
        };
        let mut shortcuts: Vec<(String, String)> = params
            .iter()
            .filter(|(k, v)| !RESERVED.contains(&k.as_str()) && !v.trim().is_empty())
            .map(|(k, v)| (k.clone(), v.trim().to_string()))
            .collect();
        shortcuts.sort();

        ListQuery {
            q: params.get("q").map(|s| s.trim().to_string()).unwrap_or_default(),
            sort: SortSpec::from_params(
                params.get("sort").map(String::as_str),
                params.get("dir").map(String::as_str),
            ),
            page: params
                .get("page")
                .and_then(|p| p.parse::<i64>().ok())
                .unwrap_or(1)
                .clamp(1, MAX_PAGE),
            filters,
            shortcuts,
        }
    }

    /// Add or replace a `?key=value` filter.
    pub fn with_shortcut(mut self, key: &str, value: impl ToString) -> Self {
        self.shortcuts.retain(|(k, _)| k != key);
        self.shortcuts.push((key.to_string(), value.to_string()));
        self.shortcuts.sort();
        self
    }

    pub fn shortcut(&self, key: &str) -> Option<&str> {
        self.shortcuts.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    /// Shortcut parameters the list declares, as an AND-ed tree.
    fn shortcut_tree(&self, spec: &ListSpec) -> FilterTree {
        let conditions = self
            .shortcuts
            .iter()
            .filter_map(|(k, v)| {
                spec.fields
                    .iter()
                    .find(|f| f.key == k.as_str())
                    .map(|f| Condition::new(f.key, f.shortcut_op(), v))
            })
            .collect();
        FilterTree::all(conditions)
    }

    fn state_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = vec![];
        if !self.q.is_empty() {
            pairs.push(("q".to_string(), self.q.clone()));
        }
        if !self.filters.is_empty() {
            pairs.push(("filter".to_string(), self.filters.to_json()));
        }
        pairs.extend(self.shortcuts.iter().cloned());
        if !self.sort.column.is_empty() {
            pairs.push(("sort".to_string(), self.sort.column.clone()));
            pairs.push(("dir".to_string(), self.sort.dir_str().to_string()));
        }
        pairs
    }

    /// Link to another page of the same list.
    pub fn page_href(&self, base: &str, page: i64) -> String {
        let mut pairs = self.state_pairs();
        if page > 1 {
            pairs.push(("page".to_string(), page.to_string()));
        }
        href(base, &pairs)
    }

    /// Link that sorts by `key`, flipping the direction when already sorted by it.
    pub fn sort_href(&self, base: &str, key: &str) -> String {
        let dir = if self.sort.column == key { self.sort.toggle_dir() } else { "asc" };
        let mut pairs: Vec<(String, String)> = self
            .state_pairs()
            .into_iter()
            .filter(|(k, _)| k != "sort" && k != "dir")
            .collect();
        pairs.push(("sort".to_string(), key.to_string()));
        pairs.push(("dir".to_string(), dir.to_string()));
        href(base, &pairs)
    }
}

fn href(base: &str, pairs: &[(String, String)]) -> String {
    if pairs.is_empty() {
        return base.to_string();
    }
    match serde_urlencoded::to_string(pairs) {
        Ok(qs) => format!("{base}?{qs}"),
        Err(e) => {
            log::warn!("Could not encode list link: {e}");
            base.to_string()
        }
    }
}

#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: i64,
    pub per_page: i64,
    pub total_count: i64,
    pub total_pages: i64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, page: i64, per_page: i64, total_count: i64) -> Self {
        let total_pages = (total_count + per_page - 1) / per_page;
        Self { items, page, per_page, total_count, total_pages }
    }

    pub fn has_prev(&self) -> bool {
        self.page > 1
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }

    /// Last page number for display; an empty list still has page 1.
    pub fn last_page(&self) -> i64 {
        self.total_pages.max(1)
    }
}

/// SQL for one list request, with all text parameters in order.
#[derive(Debug)]
pub struct BuiltQuery {
    pub where_sql: String,
    pub order_sql: String,
    pub params: Vec<String>,
}

impl BuiltQuery {
    pub fn data_sql(&self, spec: &ListSpec) -> String {
        let n = self.params.len();
        format!(
            "{} WHERE {} ORDER BY {} LIMIT ${} OFFSET ${}",
            spec.select,
            self.where_sql,
            self.order_sql,
            n + 1,
            n + 2
        )
    }

    pub fn all_sql(&self, spec: &ListSpec) -> String {
        format!("{} WHERE {} ORDER BY {}", spec.select, self.where_sql, self.order_sql)
    }

    pub fn count_sql(&self, spec: &ListSpec) -> String {
        format!("SELECT COUNT(*) FROM ({} WHERE {}) AS sub", spec.select, self.where_sql)
    }
}

/// Scope, filters and search combined into one WHERE clause. Invalid
/// filters are dropped with a warning instead of failing the page.
pub fn build_query(spec: &ListSpec, viewer: &Viewer, query: &ListQuery) -> BuiltQuery {
    let mut clauses: Vec<String> = vec![];
    let mut params: Vec<String> = vec![];

    if let Some(scope_sql) = scope::clause(spec.kind, viewer.role) {
        if scope::uses_viewer(&scope_sql) {
            params.push(viewer.user_id.to_string());
        }
        clauses.push(scope::render(&scope_sql, params.len()));
    }

    let shortcuts = query.shortcut_tree(spec);
    for tree in [&query.filters, &shortcuts] {
        if tree.is_empty() {
            continue;
        }
        match build_where_clause(tree, spec.fields, params.len()) {
            Ok((sql, p)) => {
                clauses.push(format!("({sql})"));
                params.extend(p);
            }
            Err(e) => log::warn!("Ignoring {} filter: {e}", spec.kind),
        }
    }

    if let Some((sql, p)) = build_search_clause(&query.q, spec.search, params.len()) {
        clauses.push(sql);
        params.push(p);
    }

    let where_sql = if clauses.is_empty() { "TRUE".to_string() } else { clauses.join(" AND ") };

    let (sort_sql, dir) = match spec.sort_sql(&query.sort.column) {
        Some(sql) => (sql, query.sort.sql_dir()),
        None => {
            let dir = if spec.default_desc { "DESC" } else { "ASC" };
            (spec.sort_sql(spec.default_sort).unwrap_or(spec.id_col), dir)
        }
    };
    let order_sql = format!("{sort_sql} {dir}, {} {dir}", spec.id_col);

    BuiltQuery { where_sql, order_sql, params }
}

/// Rows to skip before `page`. Saturates instead of overflowing, since
/// callers may build a `ListQuery` by hand.
fn page_offset(page: i64) -> i64 {
    page.clamp(1, MAX_PAGE).saturating_sub(1).saturating_mul(PER_PAGE)
}

/// One page of `spec` rows visible to `viewer`.
pub async fn fetch_page<T>(
    pool: &PgPool,
    spec: &ListSpec,
    viewer: &Viewer,
    query: &ListQuery,
) -> Result<Page<T>, AppError>
where
    T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
{
    let built = build_query(spec, viewer, query);
    let offset = page_offset(query.page);

    let data_sql = built.data_sql(spec);
    let mut rows = sqlx::query_as::<_, T>(&data_sql);
    for p in &built.params {
        rows = rows.bind(p.as_str());
    }
    let items = rows.bind(PER_PAGE).bind(offset).fetch_all(pool).await?;

    let count_sql = built.count_sql(spec);
    let mut count = sqlx::query_scalar::<_, i64>(&count_sql);
    for p in &built.params {
        count = count.bind(p.as_str());
    }
    let total = count.fetch_one(pool).await?;

    Ok(Page::new(items, query.page, PER_PAGE, total))
}

/// Every `spec` row visible to `viewer` that matches `query`, ignoring
/// `query.page`. For short per-day lists, not table pages.
pub async fn fetch_all<T>(
    pool: &PgPool,
    spec: &ListSpec,
    viewer: &Viewer,
    query: &ListQuery,
) -> Result<Vec<T>, AppError>
where
    T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
{
    let built = build_query(spec, viewer, query);
    let sql = built.all_sql(spec);
    let mut rows = sqlx::query_as::<_, T>(&sql);
    for p in &built.params {
        rows = rows.bind(p.as_str());
    }
    Ok(rows.fetch_all(pool).await?)
}

/// Whether row `id` of `spec` falls inside the viewer's scope.
pub async fn is_visible(
    pool: &PgPool,
    spec: &ListSpec,
    viewer: &Viewer,
    id: i64,
) -> Result<bool, AppError> {
    let mut params = vec![id.to_string()];
    let mut where_sql = format!("{} = ($1)::BIGINT", spec.id_col);
    if let Some(scope_sql) = scope::clause(spec.kind, viewer.role) {
        if scope::uses_viewer(&scope_sql) {
            params.push(viewer.user_id.to_string());
        }
        where_sql = format!("{where_sql} AND {}", scope::render(&scope_sql, params.len()));
    }
    let sql = format!("SELECT COUNT(*) FROM ({} WHERE {where_sql}) AS sub", spec.select);
    let mut q = sqlx::query_scalar::<_, i64>(&sql);
    for p in &params {
        q = q.bind(p.as_str());
    }
    Ok(q.fetch_one(pool).await? > 0)
}

/// Guard for id routes: NotFound when the row is outside the scope.
pub async fn ensure_visible(
    pool: &PgPool,
    spec: &ListSpec,
    viewer: &Viewer,
    id: i64,
) -> Result<(), AppError> {
    if is_visible(pool, spec, viewer, id).await? {
        Ok(())
    } else {
        Err(AppError::NotFound)
    }
}
