use super::{Condition, FieldType, FilterField, FilterTree, Group, Logic};

#[derive(Debug, PartialEq)]
pub enum BuildError {
    UnknownField(String),
    UnknownOp(String),
    InvalidValue(String),
}

impl std::fmt::Display for BuildError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BuildError::UnknownField(s) => write!(f, "unknown filter field '{s}'"),
            BuildError::UnknownOp(s) => write!(f, "unknown filter operator '{s}'"),
            BuildError::InvalidValue(s) => write!(f, "invalid filter value '{s}'"),
        }
    }
}

const TEXT_OPS: &[&str] = &["contains", "not_contains", "equals", "not_equals", "starts_with"];
const ID_OPS: &[&str] = &["is", "is_not"];
const DATE_OPS: &[&str] = &["before", "after", "on"];

fn ops_for(ty: FieldType) -> &'static [&'static str] {
    match ty {
        FieldType::Text => TEXT_OPS,
        FieldType::Id | FieldType::IdSet => ID_OPS,
        FieldType::Date => DATE_OPS,
    }
}

/// Escape LIKE wildcards so user text only matches literally.
pub fn escape_like(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Build a parameterized WHERE fragment from a FilterTree.
/// Returns (sql_fragment, params_vec). Every parameter is bound as text and
/// cast in SQL where the column needs it.
/// param_offset: number of `$N` placeholders already used by the caller.
pub fn build_where_clause(
    tree: &FilterTree,
    fields: &[FilterField],
    param_offset: usize,
) -> Result<(String, Vec<String>), BuildError> {
    if tree.is_empty() {
        return Ok(("1=1".to_string(), vec![]));
    }
    let mut params: Vec<String> = vec![];
    let mut parts: Vec<String> = vec![];

    for cond in &tree.conditions {
        let (sql, value) = build_condition(cond, fields, param_offset + params.len())?;
        params.push(value);
        parts.push(sql);
    }

    // Groups (one level deep)
    for group in &tree.groups {
        let (sql, mut p) = build_group(group, fields, param_offset + params.len())?;
        if !sql.is_empty() {
            params.append(&mut p);
            parts.push(format!("({sql})"));
        }
    }

    if parts.is_empty() {
        return Ok(("1=1".to_string(), vec![]));
    }

    Ok((parts.join(joiner(&tree.logic)), params))
}

/// Free-text search: an OR of case-insensitive substring matches over the
/// given columns, all sharing one parameter.
pub fn build_search_clause(
    term: &str,
    columns: &[&str],
    param_offset: usize,
) -> Option<(String, String)> {
    let term = term.trim();
    if term.is_empty() || columns.is_empty() {
        return None;
    }
    let n = param_offset + 1;
    let parts: Vec<String> = columns
        .iter()
        .map(|col| format!("{col} ILIKE ${n}"))
        .collect();
    Some((format!("({})", parts.join(" OR ")), format!("%{}%", escape_like(term))))
}

fn joiner(logic: &Logic) -> &'static str {
    match logic {
        Logic::And => " AND ",
        Logic::Or => " OR ",
    }
}

fn build_group(
    group: &Group,
    fields: &[FilterField],
    param_offset: usize,
) -> Result<(String, Vec<String>), BuildError> {
    let mut params: Vec<String> = vec![];
    let mut parts: Vec<String> = vec![];
    for cond in &group.conditions {
        let (sql, value) = build_condition(cond, fields, param_offset + params.len())?;
        params.push(value);
        parts.push(sql);
    }
    if parts.is_empty() {
        return Ok((String::new(), vec![]));
    }
    Ok((parts.join(joiner(&group.logic)), params))
}

fn build_condition(
    cond: &Condition,
    fields: &[FilterField],
    param_offset: usize,
) -> Result<(String, String), BuildError> {
    let field = fields
        .iter()
        .find(|f| f.key == cond.field)
        .ok_or_else(|| BuildError::UnknownField(cond.field.clone()))?;
    if !ops_for(field.ty).contains(&cond.op.as_str()) {
        return Err(BuildError::UnknownOp(cond.op.clone()));
    }
    let value = cond.value.trim();
    match field.ty {
        FieldType::Id | FieldType::IdSet if value.parse::<i64>().is_err() => {
            return Err(BuildError::InvalidValue(cond.value.clone()));
        }
        FieldType::Date if chrono::NaiveDate::parse_from_str(value, "%Y-%m-%d").is_err() => {
            return Err(BuildError::InvalidValue(cond.value.clone()));
        }
        _ => {}
    }

    let col = field.sql;
    let n = param_offset + 1; // PostgreSQL uses 1-based $N
    if field.ty == FieldType::IdSet {
        let sql = match cond.op.as_str() {
            "is" => format!("(${n})::BIGINT IN ({col})"),
            _ => format!("(${n})::BIGINT NOT IN ({col})"),
        };
        return Ok((sql, value.to_string()));
    }
    let (sql, bound) = match cond.op.as_str() {
        "contains" => (format!("{col} ILIKE ${n}"), format!("%{}%", escape_like(value))),
        "not_contains" => (format!("{col} NOT ILIKE ${n}"), format!("%{}%", escape_like(value))),
        "starts_with" => (format!("{col} ILIKE ${n}"), format!("{}%", escape_like(value))),
        "equals" => (format!("{col} = ${n}"), value.to_string()),
        "not_equals" => (format!("{col} <> ${n}"), value.to_string()),
        "is" => (format!("{col} = (${n})::BIGINT"), value.to_string()),
        "is_not" => (format!("{col} IS DISTINCT FROM (${n})::BIGINT"), value.to_string()),
        "before" => (format!("{col}::DATE < (${n})::DATE"), value.to_string()),
        "after" => (format!("{col}::DATE > (${n})::DATE"), value.to_string()),
        "on" => (format!("{col}::DATE = (${n})::DATE"), value.to_string()),
        _ => return Err(BuildError::UnknownOp(cond.op.clone())),
    };
    Ok((sql, bound))
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIELDS: &[FilterField] = &[
        FilterField::text("name", "s.name"),
        FilterField::id("class_id", "s.class_id"),
        FilterField::date("date", "att.date"),
        FilterField::id_set("teacher_id", "SELECT l.teacher_id FROM lessons l WHERE l.class_id = s.class_id"),
    ];

    #[test]
    fn empty_tree_returns_passthrough() {
        let (sql, params) = build_where_clause(&FilterTree::default(), FIELDS, 0).unwrap();
        assert_eq!(sql, "1=1");
        assert!(params.is_empty());
    }

    #[test]
    fn contains_is_case_insensitive_and_escaped() {
        let tree = FilterTree {
            conditions: vec![Condition::new("name", "contains", "50%_off")],
            ..Default::default()
        };
        let (sql, params) = build_where_clause(&tree, FIELDS, 0).unwrap();
        assert_eq!(sql, "s.name ILIKE $1");
        assert_eq!(params, vec![r"%50\%\_off%"]);
    }

    #[test]
    fn id_and_date_values_are_cast() {
        let tree = FilterTree {
            conditions: vec![
                Condition::new("class_id", "is", "4"),
                Condition::new("date", "on", "2026-09-14"),
            ],
            ..Default::default()
        };
        let (sql, params) = build_where_clause(&tree, FIELDS, 2).unwrap();
        assert_eq!(sql, "s.class_id = ($3)::BIGINT AND att.date::DATE = ($4)::DATE");
        assert_eq!(params, vec!["4", "2026-09-14"]);
    }

    #[test]
    fn id_set_matches_membership() {
        let tree = FilterTree {
            conditions: vec![Condition::new("teacher_id", "is", "9")],
            ..Default::default()
        };
        let (sql, params) = build_where_clause(&tree, FIELDS, 0).unwrap();
        assert_eq!(
            sql,
            "($1)::BIGINT IN (SELECT l.teacher_id FROM lessons l WHERE l.class_id = s.class_id)"
        );
        assert_eq!(params, vec!["9"]);
    }

    #[test]
    fn groups_are_parenthesised() {
        let tree = FilterTree {
            logic: Logic::And,
            conditions: vec![Condition::new("name", "starts_with", "Ana")],
            groups: vec![Group {
                logic: Logic::Or,
                conditions: vec![
                    Condition::new("class_id", "is", "1"),
                    Condition::new("class_id", "is", "2"),
                ],
            }],
        };
        let (sql, params) = build_where_clause(&tree, FIELDS, 0).unwrap();
        assert_eq!(
            sql,
            "s.name ILIKE $1 AND (s.class_id = ($2)::BIGINT OR s.class_id = ($3)::BIGINT)"
        );
        assert_eq!(params, vec!["Ana%", "1", "2"]);
    }

    #[test]
    fn unknown_field_and_op_are_rejected() {
        let tree = FilterTree {
            conditions: vec![Condition::new("password_hash", "equals", "x")],
            ..Default::default()
        };
        assert_eq!(
            build_where_clause(&tree, FIELDS, 0).unwrap_err(),
            BuildError::UnknownField("password_hash".into())
        );

        let tree = FilterTree {
            conditions: vec![Condition::new("class_id", "contains", "1")],
            ..Default::default()
        };
        assert_eq!(
            build_where_clause(&tree, FIELDS, 0).unwrap_err(),
            BuildError::UnknownOp("contains".into())
        );
    }

    #[test]
    fn malformed_values_are_rejected_before_sql() {
        let tree = FilterTree {
            conditions: vec![Condition::new("class_id", "is", "abc")],
            ..Default::default()
        };
        assert!(matches!(
            build_where_clause(&tree, FIELDS, 0),
            Err(BuildError::InvalidValue(_))
        ));
        let tree = FilterTree {
            conditions: vec![Condition::new("date", "on", "14/09/2026")],
            ..Default::default()
        };
        assert!(matches!(
            build_where_clause(&tree, FIELDS, 0),
            Err(BuildError::InvalidValue(_))
        ));
    }

    #[test]
    fn search_clause_ors_columns() {
        let (sql, param) = build_search_clause("  ana ", &["s.name", "s.surname"], 1).unwrap();
        assert_eq!(sql, "(s.name ILIKE $2 OR s.surname ILIKE $2)");
        assert_eq!(param, "%ana%");
        assert!(build_search_clause("   ", &["s.name"], 0).is_none());
    }
}
