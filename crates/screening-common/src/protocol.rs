use crate::error::AgentError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Identifier the agent hands out for a resolved node.
///
/// Ids are allocated in increasing order and never reused within one page session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementId(pub u32);

impl ElementId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for ElementId {
    fn from(id: u32) -> Self {
        ElementId(id)
    }
}

/// A command sent by the controller. `args` are positional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub id: u64,
    pub command: String,
    #[serde(default)]
    pub args: Vec<Value>,
}

impl Request {
    pub fn new(id: u64, command: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            id,
            command: command.into(),
            args,
        }
    }
}

/// The single answer to a [`Request`], matched by `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Response {
    Ok {
        id: u64,
        #[serde(default)]
        result: Vec<Value>,
    },
    Error {
        id: u64,
        code: String,
        message: String,
    },
}

impl Response {
    pub fn from_result(id: u64, result: Result<Vec<Value>, AgentError>) -> Self {
        match result {
            Ok(result) => Response::Ok { id, result },
            Err(err) => Response::Error {
                id,
                code: err.code().to_string(),
                message: err.to_string(),
            },
        }
    }

    pub fn id(&self) -> u64 {
        match self {
            Response::Ok { id, .. } | Response::Error { id, .. } => *id,
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Response::Ok { .. })
    }

    /// First result value, if the command succeeded and produced one.
    pub fn value(&self) -> Option<&Value> {
        match self {
            Response::Ok { result, .. } => result.first(),
            Response::Error { .. } => None,
        }
    }

    pub fn error_code(&self) -> Option<&str> {
        match self {
            Response::Error { code, .. } => Some(code),
            Response::Ok { .. } => None,
        }
    }
}
