//! Script bridge
//!
//! Evaluates expressions and positional function calls in the page's main
//! world via `Runtime.evaluate`, returning values by value and awaiting
//! promises. Remote exceptions become [`Error::Script`].

use serde_json::Value;
use tracing::{debug, instrument};

use super::command::{Command, EvaluateParams};
use super::dispatcher::Dispatcher;
use super::types::{EvaluateResponse, RemoteObject};
use crate::scripts::ScriptCall;
use crate::{Error, Result};

/// Evaluation channel into the remote page
#[derive(Debug)]
pub struct ScriptBridge {
    dispatcher: Dispatcher,
}

impl ScriptBridge {
    /// Wrap a dispatcher
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self { dispatcher }
    }

    /// Raw command access for non-script operations (input, capture)
    pub fn dispatcher(&mut self) -> &mut Dispatcher {
        &mut self.dispatcher
    }

    /// Evaluate `expression` and return its value
    pub async fn evaluate(&mut self, expression: &str) -> Result<Value> {
        let raw = self
            .dispatcher
            .send(Command::Evaluate(EvaluateParams::by_value(expression)))
            .await?;

        let response: EvaluateResponse = serde_json::from_value(raw)
            .map_err(|e| Error::script(format!("Malformed evaluation response: {}", e)))?;

        if let Some(details) = response.exception_details {
            return Err(Error::script(details.describe()));
        }

        let value = Self::remote_value(response.result);
        debug!("evaluate returned {}", value);
        Ok(value)
    }

    /// Invoke `declaration` (a function expression) with positional `args`
    pub async fn call_function(&mut self, declaration: &str, args: &[Value]) -> Result<Value> {
        let expression = Self::invocation(declaration, args);
        self.evaluate(&expression).await
    }

    /// Invoke a checked-in script and decode its documented return shape
    #[instrument(skip(self, call), fields(script = call.script().name))]
    pub async fn call<S: ScriptCall>(&mut self, call: &S) -> Result<S::Output> {
        let script = call.script();
        let value = self.call_function(script.source, &call.args()).await?;
        serde_json::from_value(value).map_err(|e| {
            Error::script(format!(
                "{} v{} returned an unexpected shape: {}",
                script.name, script.version, e
            ))
        })
    }

    /// `(<declaration>)(arg0, arg1, ...)` with JSON-encoded arguments
    pub fn invocation(declaration: &str, args: &[Value]) -> String {
        let args = args
            .iter()
            .map(Value::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        format!("({})({})", declaration.trim(), args)
    }

    /// Collapse a by-value remote object into JSON
    fn remote_value(obj: RemoteObject) -> Value {
        match obj.value {
            Some(value) => value,
            None => match obj.unserializable_value {
                Some(repr) => Value::String(repr),
                None => Value::Null,
            },
        }
    }
}
