//! Create-request payloads.

use serde_json::{Map, Value};

use super::kind::Family;

/// Builder for a `<Kind>CreateRequest` input object.
///
/// Absent optional fields are omitted rather than sent as null. Metadata is
/// sent as a compact JSON string, which is how the schema stores it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CreateRequest {
    fields: Map<String, Value>,
}

impl CreateRequest {
    #[must_use]
    pub fn new(token: &str) -> Self {
        let mut fields = Map::new();
        fields.insert("token".into(), Value::String(token.to_string()));
        Self { fields }
    }

    /// An entity of a family, bound to its type (`deviceTypeToken`, ...).
    #[must_use]
    pub fn entity(family: Family, token: &str, type_token: &str) -> Self {
        Self::new(token).with(&format!("{}TypeToken", family.field()), type_token)
    }

    /// A directed relationship between two entities of one family.
    #[must_use]
    pub fn relationship(
        family: Family,
        token: &str,
        source: &str,
        target: &str,
        relationship_type: &str,
    ) -> Self {
        Self::new(token)
            .with(&format!("source{}", family.name()), source)
            .with(&format!("target{}", family.name()), target)
            .with("relationshipType", relationship_type)
    }

    /// Membership of an entity in a group of the same family.
    #[must_use]
    pub fn group_relationship(
        family: Family,
        token: &str,
        group: &str,
        member: &str,
        relationship_type: &str,
    ) -> Self {
        Self::new(token)
            .with(&format!("{}Group", family.field()), group)
            .with(family.field(), member)
            .with("relationshipType", relationship_type)
    }

    #[must_use]
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(key.to_string(), value.into());
        self
    }

    #[must_use]
    pub fn name(self, name: &str) -> Self {
        self.with("name", name)
    }

    #[must_use]
    pub fn description(self, description: &str) -> Self {
        self.with("description", description)
    }

    #[must_use]
    pub fn image_url(self, url: &str) -> Self {
        self.with("imageUrl", url)
    }

    #[must_use]
    pub fn metadata(self, metadata: &Value) -> Self {
        self.with("metadata", metadata.to_string())
    }

    #[must_use]
    pub fn token(&self) -> &str {
        self.fields.get("token").and_then(Value::as_str).unwrap_or_default()
    }

    #[must_use]
    pub fn into_value(self) -> Value {
        Value::Object(self.fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_entity_request() {
        let request = CreateRequest::entity(Family::Device, "SDK7", "catd1")
            .name("Cat D1")
            .metadata(&json!({"vin": "SDK7"}));
        assert_eq!(
            request.into_value(),
            json!({
                "token": "SDK7",
                "deviceTypeToken": "catd1",
                "name": "Cat D1",
                "metadata": "{\"vin\":\"SDK7\"}"
            })
        );
    }

    #[test]
    fn test_relationship_requests() {
        let rel = CreateRequest::relationship(Family::Device, "a-tracks-b", "a", "b", "tracks");
        assert_eq!(rel.token(), "a-tracks-b");
        let value = rel.into_value();
        assert_eq!(value["sourceDevice"], "a");
        assert_eq!(value["targetDevice"], "b");
        assert_eq!(value["relationshipType"], "tracks");

        let member = CreateRequest::group_relationship(Family::Asset, "g-contains-x", "g", "x", "contains")
            .into_value();
        assert_eq!(member["assetGroup"], "g");
        assert_eq!(member["asset"], "x");
        assert!(member.get("metadata").is_none());
    }
}
