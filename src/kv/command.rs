//! Command descriptors.

use std::fmt;

use crate::kv::error::{KvError, KvResult};

/// A decoded reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Nil,
    Int(i64),
    Str(String),
    Status(String),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "(nil)"),
            Value::Int(n) => write!(f, "(integer) {}", n),
            Value::Str(s) => write!(f, "\"{}\"", s),
            Value::Status(s) => write!(f, "{}", s),
        }
    }
}

/// One command: its arguments plus the slot for its outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cmd {
    args: Vec<String>,
    reply: Option<Value>,
    err: Option<KvError>,
}

impl Cmd {
    pub fn new<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            args: args.into_iter().map(Into::into).collect(),
            reply: None,
            err: None,
        }
    }

    /// Lower-cased command name, or an empty string for an empty command.
    pub fn name(&self) -> String {
        self.args
            .first()
            .map(|name| name.to_ascii_lowercase())
            .unwrap_or_default()
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn reply(&self) -> Option<&Value> {
        self.reply.as_ref()
    }

    pub fn err(&self) -> Option<&KvError> {
        self.err.as_ref()
    }

    pub fn set_reply(&mut self, reply: Value) {
        self.reply = Some(reply);
    }

    pub fn set_err(&mut self, err: KvError) {
        self.err = Some(err);
    }

    /// The command's error, or `Ok(())` if it has none.
    pub fn result(&self) -> KvResult<()> {
        match &self.err {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    /// Reply as an optional string (`Nil` → `None`).
    pub fn string_reply(&self) -> KvResult<Option<String>> {
        self.result()?;
        match &self.reply {
            Some(Value::Str(s)) | Some(Value::Status(s)) => Ok(Some(s.clone())),
            Some(Value::Nil) | None => Ok(None),
            Some(other) => Err(KvError::UnexpectedReply(other.to_string())),
        }
    }

    pub fn int_reply(&self) -> KvResult<i64> {
        self.result()?;
        match &self.reply {
            Some(Value::Int(n)) => Ok(*n),
            Some(other) => Err(KvError::UnexpectedReply(other.to_string())),
            None => Err(KvError::UnexpectedReply(Value::Nil.to_string())),
        }
    }
}
