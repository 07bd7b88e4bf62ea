//! Pinecone-style search index client.
//!
//! The control plane (`/indexes`) creates and deletes indexes; each index has
//! its own data-plane host, discovered once through `describe` and cached.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{Map as JsonMap, Value as JsonValue};
use tracing::{debug, info, instrument};

use taskforge_core::{
    defaults, Error, IndexSpec, Result, SearchIndexProvisioner, ShadowRecord, VectorStore,
};

use crate::config::{env_or, parse_env_or, required_env};

const SERVICE: &str = "Pinecone";

/// Configuration for [`PineconeClient`].
#[derive(Debug, Clone)]
pub struct PineconeConfig {
    pub api_key: String,
    pub base_url: String,
    pub cloud: String,
    pub region: String,
    pub timeout_secs: u64,
}

impl PineconeConfig {
    /// Load from `PINECONE_API_KEY` (required), `PINECONE_API_BASE`,
    /// `PINECONE_CLOUD` and `PINECONE_REGION`.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            api_key: required_env("PINECONE_API_KEY")?,
            base_url: env_or("PINECONE_API_BASE", defaults::PINECONE_API_BASE),
            cloud: env_or("PINECONE_CLOUD", defaults::INDEX_CLOUD),
            region: env_or("PINECONE_REGION", defaults::INDEX_REGION),
            timeout_secs: parse_env_or("PROVISION_TIMEOUT_SECS", defaults::PROVISION_TIMEOUT_SECS)?,
        })
    }
}

#[derive(Serialize)]
struct CreateIndexRequest<'a> {
    name: &'a str,
    dimension: usize,
    metric: &'a str,
    spec: IndexDeployment<'a>,
}

#[derive(Serialize)]
struct IndexDeployment<'a> {
    serverless: Serverless<'a>,
}

#[derive(Serialize)]
struct Serverless<'a> {
    cloud: &'a str,
    region: &'a str,
}

#[derive(Deserialize)]
struct DescribeIndexResponse {
    host: String,
}

#[derive(Serialize)]
struct UpsertRequest<'a> {
    vectors: Vec<VectorBody<'a>>,
    namespace: &'a str,
}

#[derive(Serialize)]
struct VectorBody<'a> {
    id: &'a str,
    values: &'a [f32],
    metadata: &'a JsonMap<String, JsonValue>,
}

#[derive(Serialize)]
struct DeleteRequest<'a> {
    ids: &'a [String],
    namespace: &'a str,
}

/// HTTP client for both planes of the index service.
pub struct PineconeClient {
    client: Client,
    config: PineconeConfig,
    /// Index name to data-plane base URL.
    hosts: DashMap<String, String>,
}

impl PineconeClient {
    pub fn new(mut config: PineconeConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        config.base_url = config.base_url.trim_end_matches('/').to_string();
        info!(
            subsystem = "provision",
            component = "pinecone",
            base_url = %config.base_url,
            cloud = %config.cloud,
            region = %config.region,
            "Initializing search index client"
        );

        Ok(Self {
            client,
            config,
            hosts: DashMap::new(),
        })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(PineconeConfig::from_env()?)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("Api-Key", &self.config.api_key)
            .header("X-Pinecone-API-Version", defaults::PINECONE_API_VERSION)
    }

    async fn execute(&self, request: RequestBuilder) -> Result<Response> {
        let response = self
            .authorized(request)
            .send()
            .await
            .map_err(|e| Error::external(SERVICE, format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::external(SERVICE, format!("{} - {}", status, body)));
        }
        Ok(response)
    }

    /// Data-plane base URL for `index`, described on first use.
    async fn host_for(&self, index: &str) -> Result<String> {
        if let Some(host) = self.hosts.get(index) {
            return Ok(host.clone());
        }

        let response = self
            .execute(
                self.client
                    .get(format!("{}/indexes/{}", self.config.base_url, index)),
            )
            .await?;
        let described: DescribeIndexResponse = response
            .json()
            .await
            .map_err(|e| Error::external(SERVICE, format!("Failed to parse response: {}", e)))?;

        let has_scheme =
            described.host.starts_with("http://") || described.host.starts_with("https://");
        let host = if has_scheme {
            described.host
        } else {
            format!("https://{}", described.host)
        };
        let host = host.trim_end_matches('/').to_string();

        debug!(
            subsystem = "provision",
            component = "pinecone",
            index_name = %index,
            host = %host,
            "Resolved index host"
        );
        self.hosts.insert(index.to_string(), host.clone());
        Ok(host)
    }
}

#[async_trait]
impl SearchIndexProvisioner for PineconeClient {
    #[instrument(
        skip(self, spec),
        fields(subsystem = "provision", component = "pinecone", op = "create_index")
    )]
    async fn create_index(&self, name: &str, spec: IndexSpec) -> Result<()> {
        let start = Instant::now();
        let body = CreateIndexRequest {
            name,
            dimension: spec.dimension,
            metric: spec.metric.as_str(),
            spec: IndexDeployment {
                serverless: Serverless {
                    cloud: &self.config.cloud,
                    region: &self.config.region,
                },
            },
        };

        self.execute(
            self.client
                .post(format!("{}/indexes", self.config.base_url))
                .json(&body),
        )
        .await?;

        info!(
            dimension = spec.dimension,
            metric = spec.metric.as_str(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Search index created"
        );
        Ok(())
    }

    #[instrument(
        skip(self),
        fields(subsystem = "provision", component = "pinecone", op = "delete_index")
    )]
    async fn delete_index(&self, name: &str) -> Result<()> {
        self.execute(
            self.client
                .delete(format!("{}/indexes/{}", self.config.base_url, name)),
        )
        .await?;
        self.hosts.remove(name);
        info!("Search index deleted");
        Ok(())
    }
}

#[async_trait]
impl VectorStore for PineconeClient {
    #[instrument(
        skip(self, records),
        fields(
            subsystem = "provision",
            component = "pinecone",
            op = "upsert",
            record_count = records.len()
        )
    )]
    async fn upsert(&self, index: &str, namespace: &str, records: Vec<ShadowRecord>) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }
        let host = self.host_for(index).await?;
        let body = UpsertRequest {
            vectors: records
                .iter()
                .map(|r| VectorBody {
                    id: &r.id,
                    values: &r.values,
                    metadata: &r.metadata,
                })
                .collect(),
            namespace,
        };

        self.execute(
            self.client
                .post(format!("{}/vectors/upsert", host))
                .json(&body),
        )
        .await?;
        Ok(())
    }

    #[instrument(
        skip(self, ids),
        fields(
            subsystem = "provision",
            component = "pinecone",
            op = "delete_many",
            id_count = ids.len()
        )
    )]
    async fn delete_many(&self, index: &str, namespace: &str, ids: &[String]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let host = self.host_for(index).await?;
        let body = DeleteRequest { ids, namespace };

        match self
            .execute(
                self.client
                    .post(format!("{}/vectors/delete", host))
                    .json(&body),
            )
            .await
        {
            Ok(_) => Ok(()),
            // Deleting from a namespace that was never written is not a failure.
            Err(Error::ExternalService { ref message, .. })
                if message.starts_with(StatusCode::NOT_FOUND.as_str()) =>
            {
                debug!("Namespace absent, nothing to delete");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}
