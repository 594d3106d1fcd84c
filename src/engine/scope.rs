// src/engine/scope.rs

//! Caller roles, ranking scopes, and the resolver between them.

use std::fmt;

use serde::Serialize;

/// Role of an authenticated caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Teacher,
    Student,
}

impl Role {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "admin" => Some(Role::Admin),
            "teacher" => Some(Role::Teacher),
            "student" => Some(Role::Student),
            _ => None,
        }
    }

    pub fn is_staff(&self) -> bool {
        matches!(self, Role::Admin | Role::Teacher)
    }
}

/// Identity resolved by the auth layer. The engine trusts it as-is.
#[derive(Debug, Clone, PartialEq)]
pub struct CallerContext {
    pub role: Role,
    pub teacher_id: Option<i64>,
    pub class_id: Option<i64>,
    pub student_id: Option<i64>,
}

impl CallerContext {
    pub fn admin() -> Self {
        Self {
            role: Role::Admin,
            teacher_id: None,
            class_id: None,
            student_id: None,
        }
    }

    pub fn teacher(teacher_id: i64) -> Self {
        Self {
            role: Role::Teacher,
            teacher_id: Some(teacher_id),
            class_id: None,
            student_id: None,
        }
    }

    pub fn student(student_id: i64) -> Self {
        Self {
            role: Role::Student,
            teacher_id: None,
            class_id: None,
            student_id: Some(student_id),
        }
    }
}

/// Optional narrowing requested by the caller.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RankingFilter {
    pub teacher_id: Option<i64>,
    pub class_id: Option<i64>,
}

/// The set of students a ranking is computed over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Global,
    ByTeacher(i64),
    ByClass(i64),
    /// Classmates of the given student.
    SelfOnly(i64),
}

/// Storage key of a scope. Snapshots and versions are kept per key.
///
/// The derived order (`Global < Teacher < Class`) is the lock acquisition order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ScopeKey {
    Global,
    Teacher(i64),
    Class(i64),
}

impl fmt::Display for ScopeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScopeKey::Global => f.write_str("global"),
            ScopeKey::Teacher(id) => write!(f, "teacher:{}", id),
            ScopeKey::Class(id) => write!(f, "class:{}", id),
        }
    }
}

/// Maps a caller and its filter to a scope. `None` means "render an empty board".
pub fn resolve_scope(caller: &CallerContext, filter: &RankingFilter) -> Option<Scope> {
    match caller.role {
        Role::Admin => Some(match (filter.class_id, filter.teacher_id) {
            (Some(class_id), _) => Scope::ByClass(class_id),
            (None, Some(teacher_id)) => Scope::ByTeacher(teacher_id),
            (None, None) => Scope::Global,
        }),
        Role::Teacher => {
            let teacher_id = caller.teacher_id?;
            Some(match filter.class_id {
                Some(class_id) => Scope::ByClass(class_id),
                None => Scope::ByTeacher(teacher_id),
            })
        }
        Role::Student => caller.student_id.map(Scope::SelfOnly),
    }
}
