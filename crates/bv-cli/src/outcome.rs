use bv_store::StoreError;
use serde_json::{json, Value};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommandStatus {
    Ok,
    UserError,
    Failure,
}

impl CommandStatus {
    pub fn exit_code(self) -> i32 {
        match self {
            Self::Ok => 0,
            Self::UserError => 1,
            Self::Failure => 2,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::UserError => "user-error",
            Self::Failure => "error",
        }
    }
}

/// How a successful outcome appears in human mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HumanOutput {
    /// `bv <command>: <message>`
    Status,
    /// The message verbatim.
    Raw,
    /// Nothing; the command already wrote its output.
    Silent,
}

#[derive(Clone, Debug)]
pub struct Outcome {
    pub command: &'static str,
    pub status: CommandStatus,
    pub message: String,
    pub details: Value,
    pub human: HumanOutput,
}

impl Outcome {
    pub fn success(command: &'static str, message: impl Into<String>, details: Value) -> Self {
        Self {
            command,
            status: CommandStatus::Ok,
            message: message.into(),
            details,
            human: HumanOutput::Status,
        }
    }

    pub fn user_error(command: &'static str, message: impl Into<String>, details: Value) -> Self {
        Self {
            status: CommandStatus::UserError,
            ..Self::success(command, message, details)
        }
    }

    pub fn failure(command: &'static str, message: impl Into<String>, details: Value) -> Self {
        Self {
            status: CommandStatus::Failure,
            ..Self::success(command, message, details)
        }
    }

    pub fn from_store_error(command: &'static str, err: &StoreError) -> Self {
        let mut details = json!({ "code": err.code() });
        if err.is_not_found() {
            details["hint"] = json!("run `bv list` to see stored versions");
        }
        let message = err.to_string();
        if err.is_user_error() {
            Self::user_error(command, message, details)
        } else {
            Self::failure(command, message, details)
        }
    }

    #[must_use]
    pub fn with_human(mut self, human: HumanOutput) -> Self {
        self.human = human;
        self
    }

    pub fn status_line(&self) -> String {
        let prefix = format!("bv {}", self.command);
        if self.message.is_empty() {
            prefix
        } else {
            format!("{prefix}: {}", self.message)
        }
    }

    pub fn hint(&self) -> Option<&str> {
        self.details.get("hint").and_then(Value::as_str)
    }

    pub fn to_json(&self) -> Value {
        let details = match &self.details {
            Value::Object(_) => self.details.clone(),
            Value::Null => json!({}),
            other => json!({ "value": other }),
        };
        json!({
            "status": self.status.as_str(),
            "message": self.status_line(),
            "details": details,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_map_to_exit_codes() {
        let missing = Outcome::from_store_error(
            "show",
            &StoreError::NotFound {
                version: "v9".into(),
            },
        );
        assert_eq!(missing.status.exit_code(), 1);
        assert_eq!(missing.details["code"], "BV200");
        assert!(missing.hint().is_some());

        let corrupt = Outcome::from_store_error(
            "list",
            &StoreError::Encode("boom".into()),
        );
        assert_eq!(corrupt.status.exit_code(), 2);
        assert!(corrupt.hint().is_none());
    }

    #[test]
    fn envelope_wraps_scalar_details() {
        let outcome = Outcome::success("latest", "v2.0", json!("v2.0"));
        let payload = outcome.to_json();
        assert_eq!(payload["status"], "ok");
        assert_eq!(payload["message"], "bv latest: v2.0");
        assert_eq!(payload["details"]["value"], "v2.0");
    }
}
