//! Sample dataset seeding.
//!
//! Datasets are written entirely through [`GraphQlClient::assure`], so running
//! one twice reports existing entities as found instead of failing.

mod construction;

use colored::Colorize;
use dc_k8s::{Error, Result};
use serde_json::{Map, Value};
use tracing::info;

use crate::graphql::{CreateRequest, EntityKind, GraphQlClient};
use crate::ui;

/// Datasets that can be seeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dataset {
    Construction,
}

impl Dataset {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Construction => "Construction",
        }
    }
}

/// Counts of assured entities.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub found: usize,
    pub created: usize,
}

/// Assures entities one at a time and reports each outcome.
pub struct Seeder {
    client: GraphQlClient,
    dataset: Dataset,
    summary: SeedSummary,
}

impl Seeder {
    #[must_use]
    pub fn new(client: GraphQlClient, dataset: Dataset) -> Self {
        Self {
            client,
            dataset,
            summary: SeedSummary::default(),
        }
    }

    fn header(&self, model: &str) {
        println!();
        println!(
            "{}",
            format!("Create {model} for {} Dataset", self.dataset.name())
                .white()
                .underline()
        );
    }

    async fn assure(&mut self, kind: EntityKind, request: CreateRequest) -> Result<Value> {
        let label = format!("Assure {kind} '{}' exists:", request.token());
        let outcome = self.client.assure(kind, request).await?;
        if outcome.was_created() {
            self.summary.created += 1;
            ui::print_status(&label, "created", true);
        } else {
            self.summary.found += 1;
            ui::print_status(&label, "found", false);
        }
        Ok(outcome.into_inner())
    }

    /// Fetch an entity the dataset depends on.
    async fn require(&self, kind: EntityKind, token: &str) -> Result<Value> {
        self.client
            .get(kind, token)
            .await?
            .ok_or_else(|| Error::not_found(&kind.type_name(), None, token))
    }
}

/// Seed `dataset` through `client`.
pub async fn run(dataset: Dataset, client: GraphQlClient) -> Result<SeedSummary> {
    ui::print_section(&format!("Bootstrap Data for {} Dataset", dataset.name()));
    info!(dataset = dataset.name(), url = client.url(), "Bootstrapping dataset");

    let mut seeder = Seeder::new(client, dataset);
    match dataset {
        Dataset::Construction => construction::seed(&mut seeder).await?,
    }

    let summary = seeder.summary;
    println!();
    ui::print_success(&format!(
        "Bootstrap Completed for {} Dataset ({} created, {} found).",
        dataset.name(),
        summary.created,
        summary.found
    ));
    Ok(summary)
}

/// Build a metadata object from literal pairs.
fn metadata(pairs: &[(&str, &str)]) -> Value {
    let map: Map<String, Value> = pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), Value::String((*v).to_string())))
        .collect();
    Value::Object(map)
}

/// Text field of a fetched entity, empty when absent.
fn text<'a>(entity: &'a Value, field: &str) -> &'a str {
    entity.get(field).and_then(Value::as_str).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

    /// Answers every lookup as existing and every mutation as created.
    struct SchemaResponder {
        existing: bool,
    }

    impl Respond for SchemaResponder {
        fn respond(&self, request: &Request) -> ResponseTemplate {
            let body: Value = serde_json::from_slice(&request.body).unwrap();
            let query = body["query"].as_str().unwrap();
            let field = query
                .split("{ ")
                .nth(1)
                .and_then(|rest| rest.split('(').next())
                .unwrap()
                .to_string();
            let variables = &body["variables"];

            if query.starts_with("mutation") {
                let token = variables["request"]["token"].clone();
                return ResponseTemplate::new(200)
                    .set_body_json(json!({ "data": { field: { "id": "1", "token": token } } }));
            }
            if self.existing {
                let token = variables["token"].clone();
                ResponseTemplate::new(200).set_body_json(json!({
                    "data": { field: { "id": "1", "token": token, "name": "Existing", "description": "Existing entity" } }
                }))
            } else {
                ResponseTemplate::new(200).set_body_json(json!({ "data": { field: null } }))
            }
        }
    }

    async fn client_for(existing: bool) -> (MockServer, GraphQlClient) {
        let server = MockServer::start().await;
        Mock::given(wiremock::matchers::method("POST"))
            .respond_with(SchemaResponder { existing })
            .mount(&server)
            .await;
        let client = GraphQlClient::with_url(&format!("{}/graphql", server.uri())).unwrap();
        (server, client)
    }

    #[test]
    fn test_metadata_pairs() {
        assert_eq!(
            metadata(&[("vin", "X1"), ("owner", "CatCorp")]),
            json!({"vin": "X1", "owner": "CatCorp"})
        );
    }

    #[tokio::test]
    async fn test_rerun_finds_everything() {
        let (_server, client) = client_for(true).await;
        let summary = run(Dataset::Construction, client).await.unwrap();
        assert_eq!(summary.created, 0);
        assert_eq!(summary.found, construction::ENTITY_COUNT);
    }

    #[tokio::test]
    async fn test_missing_asset_type_stops_seeding() {
        // Nothing exists and asset types are looked up before assets are created.
        let (_server, client) = client_for(false).await;
        let err = run(Dataset::Construction, client).await.unwrap_err();
        assert!(matches!(err, Error::NotFound { ref kind, .. } if kind == "AssetType"));
    }
}
