//! GraphQL access to a tenant's data-plane microservices.
//!
//! Unlike the hierarchy's strict creates, `assure` is find-or-create: an
//! entity that already exists under the requested token is a normal outcome.

mod kind;
mod request;

use std::time::Duration;

use dc_k8s::{Assured, Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, instrument};

pub use kind::{EntityKind, Family, Role};
pub use request::CreateRequest;

/// Microservice hosting the device, asset, area and customer schemas.
pub const DEVICE_MANAGEMENT: &str = "device-management";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(1);

/// Where a tenant's microservices are reachable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub server: String,
    pub instance: String,
    pub tenant: String,
}

impl Endpoint {
    #[must_use]
    pub fn url(&self, microservice: &str) -> String {
        format!(
            "http://{}/{}/{}/{microservice}/graphql",
            self.server, self.instance, self.tenant
        )
    }
}

#[derive(Debug, Serialize)]
struct GraphQlRequest<'a> {
    query: &'a str,
    variables: Value,
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    data: Option<Value>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

impl GraphQlResponse {
    fn error_messages(&self) -> String {
        self.errors
            .iter()
            .map(|e| e.message.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn only_not_found(&self) -> bool {
        !self.errors.is_empty()
            && self
                .errors
                .iter()
                .all(|e| e.message.to_lowercase().contains("not found"))
    }

    /// Take a top-level field out of `data`; null counts as absent.
    fn take(self, field: &str) -> Option<Value> {
        self.data
            .and_then(|mut data| data.get_mut(field).map(Value::take))
            .filter(|value| !value.is_null())
    }
}

/// Client for one microservice's GraphQL endpoint.
#[derive(Debug, Clone)]
pub struct GraphQlClient {
    http: reqwest::Client,
    url: String,
}

impl GraphQlClient {
    /// Client for `microservice` of the given tenant.
    pub fn new(endpoint: &Endpoint, microservice: &str) -> Result<Self> {
        Self::with_url(&endpoint.url(microservice))
    }

    pub fn with_url(url: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| Error::transport(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            url: url.to_string(),
        })
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    async fn execute(&self, query: &str, variables: Value) -> Result<GraphQlResponse> {
        let response = self
            .http
            .post(&self.url)
            .json(&GraphQlRequest { query, variables })
            .send()
            .await
            .map_err(|e| Error::transport(format!("request to {} failed: {e}", self.url)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::transport(format!(
                "{} returned error status {status}: {body}",
                self.url
            )));
        }

        response
            .json()
            .await
            .map_err(|e| Error::Serialization(format!("invalid GraphQL response: {e}")))
    }

    /// Look up an entity by token. `None` when it does not exist.
    #[instrument(skip(self, kind), fields(kind = %kind))]
    pub async fn get(&self, kind: EntityKind, token: &str) -> Result<Option<Value>> {
        let response = self
            .execute(&kind.by_token_query(), json!({ "token": token }))
            .await?;
        if response.only_not_found() {
            return Ok(None);
        }
        if !response.errors.is_empty() {
            return Err(Error::transport(format!(
                "GraphQL errors: {}",
                response.error_messages()
            )));
        }
        Ok(response.take(&kind.by_token_field()))
    }

    #[instrument(skip(self, kind, request), fields(kind = %kind, token = request.token()))]
    pub async fn create(&self, kind: EntityKind, request: CreateRequest) -> Result<Value> {
        let response = self
            .execute(&kind.create_mutation(), json!({ "request": request.into_value() }))
            .await?;
        if !response.errors.is_empty() {
            return Err(Error::transport(format!(
                "GraphQL errors: {}",
                response.error_messages()
            )));
        }
        let field = kind.create_field();
        response
            .take(&field)
            .ok_or_else(|| Error::transport(format!("no data returned for {field}")))
    }

    /// Find the entity named by the request's token, creating it if absent.
    pub async fn assure(&self, kind: EntityKind, request: CreateRequest) -> Result<Assured<Value>> {
        let token = request.token().to_string();
        if token.is_empty() {
            return Err(Error::validation(format!("{kind} token must be provided")));
        }
        if let Some(existing) = self.get(kind, &token).await? {
            debug!(%kind, %token, "Entity found");
            return Ok(Assured::Existing(existing));
        }
        let created = self.create(kind, request).await?;
        debug!(%kind, %token, "Entity created");
        Ok(Assured::Created(created))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn device_type() -> EntityKind {
        EntityKind::new(Family::Device, Role::Type)
    }

    async fn client(server: &MockServer) -> GraphQlClient {
        GraphQlClient::with_url(&format!("{}/dc1/tenant1/device-management/graphql", server.uri()))
            .unwrap()
    }

    #[test]
    fn test_endpoint_url() {
        let endpoint = Endpoint {
            server: "localhost".into(),
            instance: "dc1".into(),
            tenant: "tenant1".into(),
        };
        assert_eq!(
            endpoint.url(DEVICE_MANAGEMENT),
            "http://localhost/dc1/tenant1/device-management/graphql"
        );
    }

    #[tokio::test]
    async fn test_assure_finds_existing() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/dc1/tenant1/device-management/graphql"))
            .and(body_partial_json(json!({ "variables": { "token": "catd1" } })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "deviceTypeByToken": { "id": "1", "token": "catd1", "name": "Cat D1" } }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let outcome = client(&server)
            .await
            .assure(device_type(), CreateRequest::new("catd1").name("Cat D1"))
            .await
            .unwrap();
        assert!(!outcome.was_created());
        assert_eq!(outcome.into_inner()["name"], "Cat D1");
    }

    #[tokio::test]
    async fn test_assure_creates_when_missing() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({ "variables": { "token": "catd1" } })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": null,
                "errors": [{ "message": "record not found" }]
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({ "variables": { "request": { "token": "catd1" } } })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "createDeviceType": { "id": "7", "token": "catd1" } }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let outcome = client(&server)
            .await
            .assure(device_type(), CreateRequest::new("catd1"))
            .await
            .unwrap();
        assert!(outcome.was_created());
        assert_eq!(outcome.into_inner()["id"], "7");
    }

    #[tokio::test]
    async fn test_null_lookup_triggers_create() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({ "variables": { "token": "smalldoz" } })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "deviceGroupByToken": null }
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({ "variables": { "request": { "token": "smalldoz" } } })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "createDeviceGroup": { "id": "3", "token": "smalldoz" } }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let outcome = client(&server)
            .await
            .assure(
                EntityKind::new(Family::Device, Role::Group),
                CreateRequest::new("smalldoz"),
            )
            .await
            .unwrap();
        assert!(outcome.was_created());
    }

    #[tokio::test]
    async fn test_other_errors_are_transport() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": null,
                "errors": [{ "message": "database unavailable" }]
            })))
            .mount(&server)
            .await;

        let err = client(&server)
            .await
            .assure(device_type(), CreateRequest::new("catd1"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Transport(ref m) if m.contains("database unavailable")));
    }

    #[tokio::test]
    async fn test_http_failure_is_transport() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = client(&server).await.get(device_type(), "catd1").await.unwrap_err();
        assert!(matches!(err, Error::Transport(_)));
    }

    #[tokio::test]
    async fn test_empty_token_rejected() {
        let client = GraphQlClient::with_url("http://127.0.0.1:9/graphql").unwrap();
        let err = client
            .assure(device_type(), CreateRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }
}
