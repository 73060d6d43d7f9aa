//! Purpose: Structured schema for non-fatal stderr notices.
//! Exports: `Notice`, `notice_json`.
//! Role: Diagnostics channel for conditions worth reporting but not failing on.
//! Invariants: Notices never alter stdout payloads.
//! Invariants: JSON schema is stable once published; fields are additive-only.
use serde_json::{Map, Value, json};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: String,
    pub time: String,
    pub cmd: String,
    pub screen: String,
    pub message: String,
    pub details: Map<String, Value>,
}

impl Notice {
    pub fn new(kind: impl Into<String>, cmd: impl Into<String>, screen: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            time: String::new(),
            cmd: cmd.into(),
            screen: screen.into(),
            message: String::new(),
            details: Map::new(),
        }
    }

    pub fn with_time(mut self, time: impl Into<String>) -> Self {
        self.time = time.into();
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn with_detail(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.details.insert(name.to_string(), value.into());
        self
    }
}

pub fn notice_json(notice: &Notice) -> Value {
    json!({
        "notice": {
            "kind": notice.kind,
            "time": notice.time,
            "cmd": notice.cmd,
            "screen": notice.screen,
            "message": notice.message,
            "details": Value::Object(notice.details.clone()),
        }
    })
}
