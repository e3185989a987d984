//! Uniform `{code, error, content}` wrapper for results and faults.
//!
//! Everything leaving a channel is an [`Envelope`]. Faults are classified by
//! [`Fault::code`] unless a [`FaultResolver`] in the [`ResolverChain`] claims
//! them first. On the receiving side [`Envelope::unwrap`] turns a failed
//! envelope back into a [`Fault`] of the same category.

pub mod code;
pub mod fault;
pub mod resolver;

pub use code::Code;
pub use fault::Fault;
pub use resolver::{DowncastResolver, FaultResolver, Resolution, ResolverChain};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Wire shape of every response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Outcome category.
    pub code: Code,
    /// Fault message, `None` on success.
    pub error: Option<String>,
    /// Result value on success; the parameter name for invalid-parameter faults.
    #[serde(default)]
    pub content: Value,
}

impl Envelope {
    /// Wraps a successful result.
    #[must_use]
    pub fn success(content: Value) -> Self {
        Self {
            code: Code::Success,
            error: None,
            content,
        }
    }

    /// Wraps a fault using its own category.
    #[must_use]
    pub fn from_fault(fault: &Fault) -> Self {
        Self {
            code: fault.code(),
            error: Some(fault.to_string()),
            content: fault.parameter().map_or(Value::Null, Value::from),
        }
    }

    /// Returns `true` when the code is [`Code::Success`].
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.code.is_success()
    }

    /// Recovers the result, or rebuilds the fault this envelope describes.
    ///
    /// # Errors
    ///
    /// Returns a [`Fault`] of the envelope's category carrying its message.
    pub fn unwrap(self) -> Result<Value, Fault> {
        if self.code.is_success() {
            return Ok(self.content);
        }
        let message = self.error.unwrap_or_else(|| self.code.to_string());
        let parameter = match self.content {
            Value::String(name) => Some(name),
            _ => None,
        };
        Err(Fault::from_code(self.code, message, parameter))
    }

    /// Serializes the envelope as JSON.
    ///
    /// # Errors
    ///
    /// Returns a fault if the content cannot be serialized.
    pub fn to_json(&self) -> Result<String, Fault> {
        serde_json::to_string(self).map_err(|e| Fault::Generic(format!("envelope encoding: {e}")))
    }

    /// Parses an envelope from JSON text.
    ///
    /// # Errors
    ///
    /// Returns a [`Fault::Invocation`] when the text is not an envelope.
    pub fn from_json(text: &str) -> Result<Self, Fault> {
        serde_json::from_str(text).map_err(|e| Fault::invocation(format!("malformed envelope: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fault_of_kind(code: Code, message: &str) -> Fault {
        Fault::from_code(code, message.to_string(), Some("field".into()))
    }

    #[test]
    fn every_fault_kind_survives_a_round_trip() {
        for code in Code::ALL.into_iter().filter(|c| !c.is_success()) {
            let original = fault_of_kind(code, "went wrong");
            let json = Envelope::from_fault(&original).to_json().unwrap();
            let restored = Envelope::from_json(&json).unwrap().unwrap().unwrap_err();
            assert_eq!(restored.code(), code);
            assert_eq!(restored.to_string(), "went wrong");
        }
    }

    #[test]
    fn invalid_parameter_carries_name_in_content() {
        let env = Envelope::from_fault(&Fault::invalid_parameter("msg", "required"));
        assert_eq!(env.content, json!("msg"));
        let fault = env.unwrap().unwrap_err();
        assert_eq!(fault.parameter(), Some("msg"));
    }

    #[test]
    fn success_serializes_with_null_error() {
        let env = Envelope::success(json!("hi"));
        let value: Value = serde_json::to_value(&env).unwrap();
        assert_eq!(value, json!({"code": "success", "error": null, "content": "hi"}));
    }
}
