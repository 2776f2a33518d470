use std::fmt;

use crate::error::{AppError, Result};

pub const API_KEY_VAR: &str = "API_KEY";
pub const WORKSPACE_VAR: &str = "WORKSPACE_ID";
pub const PROJECT_VAR: &str = "PROJECT_ID";

/// Dataset host identity, read once at start-up and passed to the client.
#[derive(Clone, PartialEq, Eq)]
pub struct RoboflowCredentials {
    pub api_key: String,
    pub workspace: String,
    pub project: String,
}

impl RoboflowCredentials {
    /// Build from explicit values. Empty values are rejected.
    pub fn new(
        api_key: impl Into<String>,
        workspace: impl Into<String>,
        project: impl Into<String>,
    ) -> Result<Self> {
        Ok(Self {
            api_key: non_empty(API_KEY_VAR, Some(api_key.into()))?,
            workspace: non_empty(WORKSPACE_VAR, Some(workspace.into()))?,
            project: non_empty(PROJECT_VAR, Some(project.into()))?,
        })
    }

    /// Read `API_KEY`, `WORKSPACE_ID` and `PROJECT_ID` from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read the three values through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        Ok(Self {
            api_key: non_empty(API_KEY_VAR, lookup(API_KEY_VAR))?,
            workspace: non_empty(WORKSPACE_VAR, lookup(WORKSPACE_VAR))?,
            project: non_empty(PROJECT_VAR, lookup(PROJECT_VAR))?,
        })
    }
}

fn non_empty(name: &'static str, value: Option<String>) -> Result<String> {
    match value.map(|v| v.trim().to_string()) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(AppError::MissingEnv(name)),
    }
}

impl fmt::Debug for RoboflowCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoboflowCredentials")
            .field("api_key", &"<redacted>")
            .field("workspace", &self.workspace)
            .field("project", &self.project)
            .finish()
    }
}
