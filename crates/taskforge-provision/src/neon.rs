//! Neon-style database provisioner.
//!
//! Each tenant gets its own serverless PostgreSQL project. The management API
//! is addressed with a bearer token; only project create, rename and delete
//! are used.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::{Client, Method, Response};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use taskforge_core::{
    defaults, redact_connection_string, AllocatedDatabase, DatabaseProvisioner, Error, Result,
};

use crate::config::{env_or, parse_env_or, required_env};

const SERVICE: &str = "Neon";

/// Host pattern of a Neon compute endpoint inside a connection string.
static ENDPOINT_HOST: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"ep-[a-z0-9-]+\.([a-z0-9-]+\.){2}neon\.tech").expect("valid endpoint pattern")
});

/// Derive the external project id from a Neon connection string.
///
/// Used for directory records written before the id was stored. Returns the
/// first DNS label of the endpoint host. A URL that does not match is an
/// external service error, never a silent default.
pub fn extract_project_id(connection_string: &str) -> Result<String> {
    let host = ENDPOINT_HOST
        .find(connection_string)
        .ok_or_else(|| {
            Error::external(SERVICE, "could not extract project id from database URL")
        })?
        .as_str();

    host.split('.')
        .next()
        .map(str::to_string)
        .ok_or_else(|| Error::external(SERVICE, "database URL has an empty endpoint host"))
}

/// Configuration for [`NeonProvisioner`].
#[derive(Debug, Clone)]
pub struct NeonConfig {
    pub api_key: String,
    pub base_url: String,
    pub timeout_secs: u64,
}

impl NeonConfig {
    /// Load from `NEON_API_KEY` (required) and `NEON_API_BASE`.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            api_key: required_env("NEON_API_KEY")?,
            base_url: env_or("NEON_API_BASE", defaults::NEON_API_BASE),
            timeout_secs: parse_env_or("PROVISION_TIMEOUT_SECS", defaults::PROVISION_TIMEOUT_SECS)?,
        })
    }
}

#[derive(Serialize)]
struct ProjectBody<'a> {
    project: ProjectFields<'a>,
}

#[derive(Serialize)]
struct ProjectFields<'a> {
    name: &'a str,
}

#[derive(Deserialize)]
struct CreateProjectResponse {
    project: NeonProject,
    #[serde(default)]
    connection_uris: Vec<ConnectionUri>,
}

#[derive(Deserialize)]
struct NeonProject {
    id: String,
}

#[derive(Deserialize)]
struct ConnectionUri {
    connection_uri: String,
}

/// HTTP client for the Neon management API.
pub struct NeonProvisioner {
    client: Client,
    base_url: String,
    api_key: String,
}

impl NeonProvisioner {
    pub fn new(config: NeonConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        info!(
            subsystem = "provision",
            component = "neon",
            base_url = %config.base_url,
            "Initializing database provisioner"
        );

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key,
        })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(NeonConfig::from_env()?)
    }

    async fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<&B>,
    ) -> Result<Response> {
        let mut request = self
            .client
            .request(method, format!("{}{}", self.base_url, endpoint))
            .bearer_auth(&self.api_key);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
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
}

#[async_trait]
impl DatabaseProvisioner for NeonProvisioner {
    #[instrument(skip(self), fields(subsystem = "provision", component = "neon", op = "allocate"))]
    async fn allocate(&self, name: &str) -> Result<AllocatedDatabase> {
        let start = Instant::now();
        let body = ProjectBody {
            project: ProjectFields { name },
        };
        let response = self.send(Method::POST, "/projects", Some(&body)).await?;

        let created: CreateProjectResponse = response
            .json()
            .await
            .map_err(|e| Error::external(SERVICE, format!("Failed to parse response: {}", e)))?;

        let connection_string = created
            .connection_uris
            .into_iter()
            .next()
            .map(|uri| uri.connection_uri)
            .ok_or_else(|| Error::external(SERVICE, "response carried no connection URI"))?;

        info!(
            external_database_id = %created.project.id,
            url = %redact_connection_string(&connection_string),
            duration_ms = start.elapsed().as_millis() as u64,
            "Database allocated"
        );

        Ok(AllocatedDatabase {
            external_id: created.project.id,
            connection_string,
        })
    }

    #[instrument(skip(self), fields(subsystem = "provision", component = "neon", op = "rename"))]
    async fn rename(&self, external_id: &str, name: &str) -> Result<()> {
        let body = ProjectBody {
            project: ProjectFields { name },
        };
        self.send(
            Method::PATCH,
            &format!("/projects/{}", external_id),
            Some(&body),
        )
        .await?;
        debug!("Database renamed");
        Ok(())
    }

    #[instrument(
        skip(self),
        fields(subsystem = "provision", component = "neon", op = "deallocate")
    )]
    async fn deallocate(&self, external_id: &str) -> Result<()> {
        self.send::<()>(Method::DELETE, &format!("/projects/{}", external_id), None)
            .await?;
        info!("Database deallocated");
        Ok(())
    }

    fn derive_id_from_connection_string(&self, connection_string: &str) -> Result<String> {
        extract_project_id(connection_string)
    }
}
