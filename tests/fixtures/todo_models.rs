use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// A named list of tasks.
#[derive(Debug, Serialize, Deserialize)]
pub struct TodoList {
    pub id: i32,
    pub name: String,
    pub tasks: Vec<TodoTask>,
}

/// A single task.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TodoTask {
    #[serde(skip_deserializing)]
    pub id: i32,
    pub title: String,
    pub is_complete: bool,
    pub due_date: Option<chrono::NaiveDate>,
    pub priority: Priority,
    /// The list this task belongs to
    pub list: Option<Box<TodoList>>,
    #[serde(skip)]
    pub dirty: bool,
}

#[derive(Debug, Serialize, Deserialize)]
#[repr(u8)]
pub enum Priority {
    Low = 1,
    Normal,
    High,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    Private,
    SharedWithTeam,
}

/// URL-safe list identifier.
#[derive(Debug)]
pub struct Slug(String);

impl FromStr for Slug {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Slug(s.to_string()))
    }
}

pub struct TodoDb;

pub struct CurrentUser {
    pub id: i64,
}

impl<S: Send + Sync> FromRequestParts<S> for CurrentUser {
    type Rejection = ();
}
