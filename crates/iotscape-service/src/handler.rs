//! Method handlers.

use std::collections::HashMap;
use std::fmt;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::HandlerError;

/// What a handler returns: the reply's `response` value, or an error to
/// report back to the server.
pub type HandlerResult = Result<Value, HandlerError>;

/// A method implementation. Receives the call's positional parameters.
///
/// Handlers run inline with the dispatch loop, so a slow handler delays
/// every other service's replies and announces.
pub type Handler = Box<dyn FnMut(&[Value]) -> HandlerResult + Send>;

/// Method name → handler.
///
/// A new table already contains `heartbeat`, which answers `[true]`.
pub struct HandlerTable {
    handlers: HashMap<String, Handler>,
}

impl HandlerTable {
    /// Name of the built-in liveness method.
    pub const HEARTBEAT: &'static str = "heartbeat";

    /// Creates a table holding only the built-in `heartbeat` handler.
    pub fn new() -> Self {
        let mut table = Self {
            handlers: HashMap::new(),
        };
        table.insert(Self::HEARTBEAT, |_: &[Value]| Ok(Value::Array(vec![Value::Bool(true)])));
        table
    }

    /// Registers `handler` for `name`, replacing any previous one.
    ///
    /// Returns `true` if a handler was replaced.
    pub fn insert<F>(&mut self, name: impl Into<String>, handler: F) -> bool
    where
        F: FnMut(&[Value]) -> HandlerResult + Send + 'static,
    {
        self.handlers
            .insert(name.into(), Box::new(handler))
            .is_some()
    }

    /// Invokes the handler for `name`. `None` if there isn't one.
    pub fn call(&mut self, name: &str, params: &[Value]) -> Option<HandlerResult> {
        self.handlers.get_mut(name).map(|h| h(params))
    }

    /// Whether a handler is registered for `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Registered method names, in no particular order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }

    /// Number of registered handlers, `heartbeat` included.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Always `false`: `heartbeat` can be replaced but never removed.
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl Default for HandlerTable {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for HandlerTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.handlers.keys()).finish()
    }
}

/// Deserializes the positional parameter at `index`.
///
/// ```rust
/// use iotscape_service::param;
/// use serde_json::json;
///
/// let params = [json!(3), json!("red")];
/// let brightness: u8 = param(&params, 0).unwrap();
/// let color: String = param(&params, 1).unwrap();
/// assert_eq!((brightness, color.as_str()), (3, "red"));
/// assert!(param::<u8>(&params, 2).is_err());
/// ```
pub fn param<T: DeserializeOwned>(params: &[Value], index: usize) -> Result<T, HandlerError> {
    let value = params
        .get(index)
        .ok_or_else(|| HandlerError::new(format!("missing parameter {index}")))?;
    serde_json::from_value(value.clone())
        .map_err(|e| HandlerError::new(format!("parameter {index}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_new_table_answers_heartbeat() {
        let mut table = HandlerTable::new();
        assert!(table.contains("heartbeat"));
        assert_eq!(table.len(), 1);
        let result = table.call("heartbeat", &[]).unwrap();
        assert_eq!(result, Ok(json!([true])));
    }

    #[test]
    fn test_unknown_method_returns_none() {
        let mut table = HandlerTable::new();
        assert!(table.call("doesNotExist", &[]).is_none());
    }

    #[test]
    fn test_latest_registration_wins() {
        let mut table = HandlerTable::new();
        assert!(!table.insert("getLevel", |_: &[Value]| Ok(json!([1]))));
        assert!(table.insert("getLevel", |_: &[Value]| Ok(json!([2]))));
        assert_eq!(table.call("getLevel", &[]), Some(Ok(json!([2]))));
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_handler_receives_params_and_keeps_state() {
        let mut table = HandlerTable::new();
        let mut total = 0i64;
        table.insert("add", move |params: &[Value]| {
            total += param::<i64>(params, 0)?;
            Ok(json!([total]))
        });
        assert_eq!(table.call("add", &[json!(2)]), Some(Ok(json!([2]))));
        assert_eq!(table.call("add", &[json!(5)]), Some(Ok(json!([7]))));
    }

    #[test]
    fn test_handler_error_is_returned() {
        let mut table = HandlerTable::new();
        table.insert("fail", |_: &[Value]| Err("sensor offline".into()));
        let err = table.call("fail", &[]).unwrap().unwrap_err();
        assert_eq!(err.message(), "sensor offline");
    }

    #[test]
    fn test_param_type_mismatch_names_index() {
        let err = param::<u8>(&[json!("loud")], 0).unwrap_err();
        assert!(err.message().starts_with("parameter 0"));
    }

    #[test]
    fn test_debug_lists_method_names() {
        let table = HandlerTable::new();
        assert_eq!(format!("{table:?}"), "{\"heartbeat\"}");
    }
}
