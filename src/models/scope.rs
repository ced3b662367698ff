//! Role-based row scopes.
//!
//! Each clause restricts a list query to the rows the caller may see. The
//! `$viewer` placeholder stands for the caller's account id and is replaced
//! with a numbered parameter by [`render`]. Clauses reference the table
//! aliases used by the resource's `ListSpec` select.

use crate::auth::role::Role;
use super::ResourceKind;

const PLACEHOLDER: &str = "$viewer";

// Class ids reachable by each non-admin role.
const TAUGHT_CLASSES: &str = "SELECT sl.class_id FROM lessons sl WHERE sl.teacher_id = $viewer";
const OWN_CLASS: &str = "SELECT ss.class_id FROM students ss WHERE ss.id = $viewer";
const CHILDREN_CLASSES: &str = "SELECT ss.class_id FROM students ss WHERE ss.parent_id = $viewer";

/// The scope clause for `kind` as seen by `role`; `None` means unrestricted.
pub fn clause(kind: ResourceKind, role: Role) -> Option<String> {
    use ResourceKind as K;
    use Role as R;

    let sql = match (kind, role) {
        (_, R::Admin) => return None,

        (K::Students, R::Teacher) => format!("s.class_id IN ({TAUGHT_CLASSES})"),
        (K::Students, R::Student) => "s.id = $viewer".to_string(),
        (K::Students, R::Parent) => "s.parent_id = $viewer".to_string(),

        (K::Teachers, R::Teacher) => return None,
        (K::Teachers, R::Student) => format!(
            "t.id IN (SELECT tl.teacher_id FROM lessons tl WHERE tl.class_id IN ({OWN_CLASS}))"
        ),
        (K::Teachers, R::Parent) => format!(
            "t.id IN (SELECT tl.teacher_id FROM lessons tl WHERE tl.class_id IN ({CHILDREN_CLASSES}))"
        ),

        (K::Parents, R::Teacher) => format!(
            "p.id IN (SELECT ps.parent_id FROM students ps WHERE ps.class_id IN ({TAUGHT_CLASSES}))"
        ),
        (K::Parents, R::Student) => {
            "p.id IN (SELECT ps.parent_id FROM students ps WHERE ps.id = $viewer)".to_string()
        }
        (K::Parents, R::Parent) => "p.id = $viewer".to_string(),

        (K::Classes, R::Teacher) => {
            format!("(c.supervisor_id = $viewer OR c.id IN ({TAUGHT_CLASSES}))")
        }
        (K::Classes, R::Student) => format!("c.id IN ({OWN_CLASS})"),
        (K::Classes, R::Parent) => format!("c.id IN ({CHILDREN_CLASSES})"),

        (K::Subjects, R::Teacher) => {
            "sub.id IN (SELECT st.subject_id FROM subject_teachers st WHERE st.teacher_id = $viewer)"
                .to_string()
        }
        (K::Subjects, R::Student | R::Parent) => "FALSE".to_string(),

        // Lessons, and everything hanging off a lesson, share the `l` alias.
        (K::Lessons | K::Exams | K::Assignments, R::Teacher) => "l.teacher_id = $viewer".to_string(),
        (K::Lessons | K::Exams | K::Assignments, R::Student) => format!("l.class_id IN ({OWN_CLASS})"),
        (K::Lessons | K::Exams | K::Assignments, R::Parent) => {
            format!("l.class_id IN ({CHILDREN_CLASSES})")
        }

        (K::Results, R::Teacher) => "COALESCE(el.teacher_id, al.teacher_id) = $viewer".to_string(),
        (K::Results, R::Student) => "r.student_id = $viewer".to_string(),
        (K::Results, R::Parent) => "s.parent_id = $viewer".to_string(),

        (K::Attendance, R::Teacher) => "l.teacher_id = $viewer".to_string(),
        (K::Attendance, R::Student) => "att.student_id = $viewer".to_string(),
        (K::Attendance, R::Parent) => "s.parent_id = $viewer".to_string(),

        (K::Events, R::Teacher) => global_or("ev", TAUGHT_CLASSES),
        (K::Events, R::Student) => global_or("ev", OWN_CLASS),
        (K::Events, R::Parent) => global_or("ev", CHILDREN_CLASSES),

        (K::Announcements, R::Teacher) => global_or("an", TAUGHT_CLASSES),
        (K::Announcements, R::Student) => global_or("an", OWN_CLASS),
        (K::Announcements, R::Parent) => global_or("an", CHILDREN_CLASSES),
    };
    Some(sql)
}

fn global_or(alias: &str, classes: &str) -> String {
    format!("({alias}.class_id IS NULL OR {alias}.class_id IN ({classes}))")
}

/// Replace the viewer placeholder with `$n`, bound as text and cast.
pub fn render(clause: &str, n: usize) -> String {
    clause.replace(PLACEHOLDER, &format!("(${n})::BIGINT"))
}

/// Whether `clause` needs the viewer id bound at all.
pub fn uses_viewer(clause: &str) -> bool {
    clause.contains(PLACEHOLDER)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_is_never_scoped() {
        for kind in ResourceKind::ALL {
            assert_eq!(clause(kind, Role::Admin), None);
        }
    }

    #[test]
    fn every_other_role_has_a_decision_for_every_kind() {
        for kind in ResourceKind::ALL {
            for role in [Role::Teacher, Role::Student, Role::Parent] {
                if let Some(sql) = clause(kind, role) {
                    assert!(!sql.is_empty(), "{kind} / {role}");
                }
            }
        }
        assert_eq!(clause(ResourceKind::Teachers, Role::Teacher), None);
    }

    #[test]
    fn render_binds_every_occurrence_to_one_parameter() {
        let sql = clause(ResourceKind::Classes, Role::Teacher).unwrap();
        let rendered = render(&sql, 3);
        assert!(!rendered.contains("$viewer"));
        assert_eq!(rendered.matches("($3)::BIGINT").count(), 2);
    }

    #[test]
    fn family_roles_see_no_subjects() {
        assert_eq!(clause(ResourceKind::Subjects, Role::Student).as_deref(), Some("FALSE"));
        assert!(!uses_viewer("FALSE"));
    }

    #[test]
    fn events_include_global_rows() {
        let sql = clause(ResourceKind::Events, Role::Parent).unwrap();
        assert!(sql.starts_with("(ev.class_id IS NULL OR ev.class_id IN ("));
        assert!(sql.contains("ss.parent_id = $viewer"));
    }

    #[test]
    fn student_sees_only_own_results() {
        assert_eq!(
            render(&clause(ResourceKind::Results, Role::Student).unwrap(), 1),
            "r.student_id = ($1)::BIGINT"
        );
    }
}
