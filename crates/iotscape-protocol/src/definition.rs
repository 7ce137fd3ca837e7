//! The announced service definition document.
//!
//! A definition is a JSON object with exactly one key, the service name,
//! whose value describes the service:
//!
//! ```json
//! {"Light": {"version": "1", "id": "",
//!            "methods": {"turnOn": {"returns": {"type": ["void"]}}},
//!            "events": {"changed": {"params": ["on"]}}}}
//! ```
//!
//! The device ID is written into the service body's `id` field before the
//! definition is announced. [`ServiceDefinition`] keeps the parsed
//! document and its text together so the two cannot drift apart.

use serde_json::{Map, Value};

use crate::ProtocolError;

/// A parsed service definition plus the exact text that gets announced.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceDefinition {
    name: String,
    document: Map<String, Value>,
    text: String,
}

impl ServiceDefinition {
    /// Parses a definition document.
    ///
    /// The text is kept verbatim until [`embed_id`](Self::embed_id) is
    /// called.
    ///
    /// # Errors
    /// - [`ProtocolError::Decode`] if `text` is not JSON.
    /// - [`ProtocolError::InvalidDefinition`] if it is not an object with
    ///   exactly one non-empty key whose value is an object.
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        let value: Value = serde_json::from_str(text).map_err(ProtocolError::Decode)?;
        let Value::Object(document) = value else {
            return Err(ProtocolError::InvalidDefinition(
                "definition must be a JSON object".into(),
            ));
        };

        if document.len() != 1 {
            return Err(ProtocolError::InvalidDefinition(format!(
                "expected exactly one service, found {}",
                document.len()
            )));
        }

        let (name, body) = document
            .iter()
            .next()
            .map(|(k, v)| (k.clone(), v))
            .ok_or_else(|| ProtocolError::InvalidDefinition("no service".into()))?;

        if name.is_empty() {
            return Err(ProtocolError::InvalidDefinition(
                "service name is empty".into(),
            ));
        }
        if !body.is_object() {
            return Err(ProtocolError::InvalidDefinition(format!(
                "service `{name}` must be described by an object"
            )));
        }

        Ok(Self {
            name,
            document,
            text: text.to_string(),
        })
    }

    /// The service name (the document's single top-level key).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The text to announce.
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// The device ID currently embedded, if any.
    pub fn embedded_id(&self) -> Option<&str> {
        self.body()
            .and_then(|b| b.get("id"))
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
    }

    /// Method names declared under `methods`.
    pub fn methods(&self) -> impl Iterator<Item = &str> {
        self.section("methods")
    }

    /// Event names declared under `events`.
    pub fn events(&self) -> impl Iterator<Item = &str> {
        self.section("events")
    }

    /// Returns `true` if `name` is declared under `methods`.
    pub fn declares_method(&self, name: &str) -> bool {
        self.methods().any(|m| m == name)
    }

    /// Returns `true` if `name` is declared under `events`.
    pub fn declares_event(&self, name: &str) -> bool {
        self.events().any(|e| e == name)
    }

    /// Writes `id` into the service body and re-encodes the text.
    ///
    /// Key order is kept as the author wrote it (an existing `id` stays in
    /// place, a new one is appended), so the server lists methods and
    /// events in definition order. Nothing changes if encoding fails.
    pub fn embed_id(&mut self, id: &str) -> Result<(), ProtocolError> {
        let mut document = self.document.clone();
        if let Some(Value::Object(body)) = document.get_mut(&self.name) {
            body.insert("id".into(), Value::String(id.to_string()));
        }
        let text = serde_json::to_string(&document).map_err(ProtocolError::Encode)?;

        self.document = document;
        self.text = text;
        Ok(())
    }

    fn body(&self) -> Option<&Map<String, Value>> {
        self.document.get(&self.name).and_then(Value::as_object)
    }

    fn section<'a>(&'a self, key: &str) -> impl Iterator<Item = &'a str> {
        self.body()
            .and_then(|b| b.get(key))
            .and_then(Value::as_object)
            .into_iter()
            .flat_map(|m| m.keys().map(String::as_str))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIGHT: &str = r#"{"Light": {"version": "1", "id": "",
        "methods": {"turnOn": {}, "turnOff": {}},
        "events": {"changed": {"params": ["on"]}}}}"#;

    #[test]
    fn test_parse_extracts_service_name() {
        let def = ServiceDefinition::parse(LIGHT).unwrap();
        assert_eq!(def.name(), "Light");
        assert_eq!(def.as_str(), LIGHT);
        assert_eq!(def.embedded_id(), None);
    }

    #[test]
    fn test_parse_lists_methods_and_events() {
        let def = ServiceDefinition::parse(LIGHT).unwrap();
        let mut methods: Vec<_> = def.methods().collect();
        methods.sort();
        assert_eq!(methods, vec!["turnOff", "turnOn"]);
        assert!(def.declares_event("changed"));
        assert!(!def.declares_method("heartbeat"));
    }

    #[test]
    fn test_parse_without_sections_is_fine() {
        let def = ServiceDefinition::parse(r#"{"Bare": {}}"#).unwrap();
        assert_eq!(def.methods().count(), 0);
        assert_eq!(def.events().count(), 0);
    }

    #[test]
    fn test_parse_rejects_non_json() {
        let err = ServiceDefinition::parse("Light {").unwrap_err();
        assert!(matches!(err, ProtocolError::Decode(_)));
    }

    #[test]
    fn test_parse_rejects_non_object() {
        let err = ServiceDefinition::parse("[1, 2]").unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidDefinition(_)));
    }

    #[test]
    fn test_parse_rejects_multiple_services() {
        let err = ServiceDefinition::parse(r#"{"A": {}, "B": {}}"#).unwrap_err();
        assert!(err.to_string().contains("found 2"));
    }

    #[test]
    fn test_parse_rejects_empty_document() {
        let err = ServiceDefinition::parse("{}").unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidDefinition(_)));
    }

    #[test]
    fn test_parse_rejects_scalar_body() {
        let err = ServiceDefinition::parse(r#"{"Light": 3}"#).unwrap_err();
        assert!(err.to_string().contains("Light"));
    }

    #[test]
    fn test_embed_id_rewrites_text_under_service_key() {
        let mut def = ServiceDefinition::parse(LIGHT).unwrap();
        def.embed_id("AABBCC01").unwrap();

        assert_eq!(def.embedded_id(), Some("AABBCC01"));
        let reparsed: Value = serde_json::from_str(def.as_str()).unwrap();
        assert_eq!(reparsed["Light"]["id"], "AABBCC01");
        // The rest of the body survives the rewrite.
        assert_eq!(reparsed["Light"]["version"], "1");
        assert!(reparsed["Light"]["methods"]["turnOn"].is_object());
    }

    #[test]
    fn test_embed_id_adds_missing_id_field() {
        let mut def = ServiceDefinition::parse(r#"{"Bare": {}}"#).unwrap();
        def.embed_id("0011").unwrap();
        assert_eq!(def.as_str(), r#"{"Bare":{"id":"0011"}}"#);
    }

    #[test]
    fn test_embed_id_keeps_author_key_order() {
        let mut def = ServiceDefinition::parse(
            r#"{"Light":{"version":"1","methods":{"turnOn":{},"getState":{},"blink":{}},"id":""}}"#,
        )
        .unwrap();
        def.embed_id("AABBCC").unwrap();

        assert_eq!(
            def.as_str(),
            r#"{"Light":{"version":"1","methods":{"turnOn":{},"getState":{},"blink":{}},"id":"AABBCC"}}"#
        );
        assert_eq!(def.methods().collect::<Vec<_>>(), vec!["turnOn", "getState", "blink"]);
    }
}
