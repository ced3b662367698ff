use std::fmt;

use crate::auth::session::Permissions;
use crate::models::ResourceKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Admin,
    Teacher,
    Student,
    Parent,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::Admin, Role::Teacher, Role::Student, Role::Parent];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Teacher => "teacher",
            Role::Student => "student",
            Role::Parent => "parent",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "admin" => Some(Role::Admin),
            "teacher" => Some(Role::Teacher),
            "student" => Some(Role::Student),
            "parent" => Some(Role::Parent),
            _ => None,
        }
    }

    /// i18n key for the role's display name.
    pub fn label_key(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Teacher => "role_teacher",
            Role::Student => "role_student",
            Role::Parent => "role_parent",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The signed-in caller: who is asking and in which role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewer {
    pub user_id: i64,
    pub role: Role,
}

impl Viewer {
    pub fn new(user_id: i64, role: Role) -> Self {
        Self { user_id, role }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Resources a teacher may write to (their own lessons' records only).
const TEACHER_WRITES: &[ResourceKind] = &[
    ResourceKind::Exams,
    ResourceKind::Assignments,
    ResourceKind::Results,
    ResourceKind::Attendance,
];

const TEACHER_READS: &[ResourceKind] = &[
    ResourceKind::Students,
    ResourceKind::Teachers,
    ResourceKind::Parents,
    ResourceKind::Classes,
    ResourceKind::Lessons,
    ResourceKind::Exams,
    ResourceKind::Assignments,
    ResourceKind::Results,
    ResourceKind::Attendance,
    ResourceKind::Events,
    ResourceKind::Announcements,
];

const FAMILY_READS: &[ResourceKind] = &[
    ResourceKind::Lessons,
    ResourceKind::Exams,
    ResourceKind::Assignments,
    ResourceKind::Results,
    ResourceKind::Attendance,
    ResourceKind::Events,
    ResourceKind::Announcements,
];

pub const ACTIONS: [&str; 4] = ["list", "create", "edit", "delete"];

/// Permission codes granted to a role, `<resource>.<action>` plus `dashboard.view`.
pub fn permissions_for(role: Role) -> Permissions {
    let mut codes = vec!["dashboard.view".to_string()];
    match role {
        Role::Admin => {
            for kind in ResourceKind::ALL {
                for action in ACTIONS {
                    codes.push(format!("{}.{action}", kind.slug()));
                }
            }
        }
        Role::Teacher => {
            for kind in TEACHER_READS {
                codes.push(format!("{}.list", kind.slug()));
            }
            for kind in TEACHER_WRITES {
                for action in &ACTIONS[1..] {
                    codes.push(format!("{}.{action}", kind.slug()));
                }
            }
        }
        Role::Student | Role::Parent => {
            for kind in FAMILY_READS {
                codes.push(format!("{}.list", kind.slug()));
            }
        }
    }
    Permissions(codes)
}
