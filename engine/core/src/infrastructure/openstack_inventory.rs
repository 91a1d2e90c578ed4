// Copyright (c) 2026 Cloud SLA Contributors
// SPDX-License-Identifier: AGPL-3.0

// OpenStack Inventory Adapter
//
// Anti-Corruption Layer for Keystone projects and Nova servers/flavors.
// Every call carries the configured `X-Auth-Token`; any transport failure,
// non-2xx status or unexpected body becomes an InventoryError for that one
// sub-fetch.

use crate::domain::engine_config::InventoryConfig;
use crate::domain::inventory::{
    Flavor, InstanceDetail, InstanceSummary, InventoryError, InventoryService, OperationalStatus,
};
use crate::domain::tenant::{Tenant, TenantId};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

const AUTH_HEADER: &str = "X-Auth-Token";

pub struct OpenStackInventoryClient {
    client: reqwest::Client,
    projects_url: String,
    servers_url: String,
    flavors_url: String,
    auth_token: Option<String>,
}

#[derive(Deserialize)]
struct ProjectsResponse {
    #[serde(default)]
    projects: Vec<ProjectEntry>,
}

#[derive(Deserialize)]
struct ProjectEntry {
    id: String,
    name: String,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Deserialize)]
struct ServersResponse {
    #[serde(default)]
    servers: Option<Vec<InstanceSummary>>,
}

#[derive(Deserialize)]
struct ServerResponse {
    server: ServerEntry,
}

#[derive(Deserialize)]
struct ServerEntry {
    id: String,
    status: String,
    flavor: FlavorRef,
}

#[derive(Deserialize)]
struct FlavorRef {
    id: String,
}

#[derive(Deserialize)]
struct FlavorResponse {
    flavor: FlavorEntry,
}

#[derive(Deserialize)]
struct FlavorEntry {
    vcpus: u32,
}

impl OpenStackInventoryClient {
    pub fn new(config: &InventoryConfig, auth_token: Option<String>) -> Result<Self, InventoryError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| InventoryError::network("http client", e))?;

        Ok(Self {
            client,
            projects_url: config.projects_url.trim_end_matches('/').to_string(),
            servers_url: config.servers_url.trim_end_matches('/').to_string(),
            flavors_url: config.flavors_url.trim_end_matches('/').to_string(),
            auth_token,
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        resource: &str,
        request: reqwest::RequestBuilder,
    ) -> Result<T, InventoryError> {
        let request = match &self.auth_token {
            Some(token) => request.header(AUTH_HEADER, token),
            None => request,
        };

        let response = request
            .send()
            .await
            .map_err(|e| InventoryError::network(resource, e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(InventoryError::network(
                resource,
                format!("HTTP {}: {}", status, body),
            ));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| InventoryError::decode(resource, e))
    }
}

#[async_trait]
impl InventoryService for OpenStackInventoryClient {
    async fn list_tenants(&self) -> Result<Vec<Tenant>, InventoryError> {
        let body: ProjectsResponse = self
            .get_json("projects", self.client.get(&self.projects_url))
            .await?;

        Ok(body
            .projects
            .into_iter()
            .map(|p| Tenant {
                id: TenantId(p.id),
                name: p.name,
                description: p.description.unwrap_or_default(),
            })
            .collect())
    }

    async fn list_instances(&self, tenant_id: &TenantId) -> Result<Vec<InstanceSummary>, InventoryError> {
        let request = self
            .client
            .get(&self.servers_url)
            .query(&[("all_tenants", "T"), ("project_id", tenant_id.as_str())]);

        let body: ServersResponse = self
            .get_json(&format!("servers of tenant {}", tenant_id), request)
            .await?;

        // A response without a `servers` key means "no instances"
        Ok(body.servers.unwrap_or_default())
    }

    async fn get_instance(&self, instance_id: &str) -> Result<InstanceDetail, InventoryError> {
        let url = format!("{}/{}", self.servers_url, instance_id);
        let body: ServerResponse = self
            .get_json(&format!("server {}", instance_id), self.client.get(&url))
            .await?;

        Ok(InstanceDetail {
            id: body.server.id,
            flavor_id: body.server.flavor.id,
            status: OperationalStatus::from_inventory(&body.server.status),
        })
    }

    async fn get_flavor(&self, flavor_id: &str) -> Result<Flavor, InventoryError> {
        let url = format!("{}/{}", self.flavors_url, flavor_id);
        let body: FlavorResponse = self
            .get_json(&format!("flavor {}", flavor_id), self.client.get(&url))
            .await?;

        Ok(Flavor {
            vcpus: body.flavor.vcpus,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn client_for(server: &mockito::ServerGuard) -> OpenStackInventoryClient {
        let config = InventoryConfig {
            projects_url: format!("{}/v3/projects", server.url()),
            servers_url: format!("{}/v2.1/servers/", server.url()),
            flavors_url: format!("{}/v2.1/flavors", server.url()),
            auth_token: None,
            resolution_concurrency: 1,
            request_timeout_secs: 5,
        };
        OpenStackInventoryClient::new(&config, Some("secret".to_string())).unwrap()
    }

    #[tokio::test]
    async fn test_list_tenants_sends_token() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/v3/projects")
            .match_header("X-Auth-Token", "secret")
            .with_status(200)
            .with_body(r#"{"projects":[{"id":"p1","name":"acme","description":"Acme Corp"},{"id":"p2","name":"globex"}]}"#)
            .create_async()
            .await;

        let tenants = client_for(&server).list_tenants().await.unwrap();
        mock.assert_async().await;
        assert_eq!(tenants.len(), 2);
        assert_eq!(tenants[0].id, TenantId::new("p1"));
        assert_eq!(tenants[0].description, "Acme Corp");
        assert_eq!(tenants[1].description, "");
    }

    #[tokio::test]
    async fn test_list_instances_uses_cross_tenant_query() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/v2.1/servers")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("all_tenants".into(), "T".into()),
                Matcher::UrlEncoded("project_id".into(), "p1".into()),
            ]))
            .with_status(200)
            .with_body(r#"{"servers":[{"id":"vm-1","name":"web"},{"id":"vm-2"}]}"#)
            .create_async()
            .await;

        let instances = client_for(&server)
            .list_instances(&TenantId::new("p1"))
            .await
            .unwrap();
        mock.assert_async().await;
        assert_eq!(instances.iter().map(|i| i.id.as_str()).collect::<Vec<_>>(), ["vm-1", "vm-2"]);
        assert_eq!(instances[0].name.as_deref(), Some("web"));
    }

    #[tokio::test]
    async fn test_missing_servers_key_is_empty() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", Matcher::Regex("^/v2.1/servers".into()))
            .with_status(200)
            .with_body("{}")
            .create_async()
            .await;

        let instances = client_for(&server)
            .list_instances(&TenantId::new("p1"))
            .await
            .unwrap();
        assert!(instances.is_empty());
    }

    #[tokio::test]
    async fn test_instance_and_flavor_lookup() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/v2.1/servers/vm-1")
            .with_status(200)
            .with_body(r#"{"server":{"id":"vm-1","status":"ACTIVE","flavor":{"id":"m1.large"}}}"#)
            .create_async()
            .await;
        server
            .mock("GET", "/v2.1/flavors/m1.large")
            .with_status(200)
            .with_body(r#"{"flavor":{"id":"m1.large","vcpus":4,"ram":8192}}"#)
            .create_async()
            .await;

        let client = client_for(&server);
        let detail = client.get_instance("vm-1").await.unwrap();
        assert_eq!(detail.status, OperationalStatus::Active);
        assert_eq!(detail.flavor_id, "m1.large");
        assert_eq!(client.get_flavor(&detail.flavor_id).await.unwrap().vcpus, 4);
    }

    #[tokio::test]
    async fn test_http_error_is_network_fetch_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/v2.1/flavors/gone")
            .with_status(404)
            .with_body("Flavor not found")
            .create_async()
            .await;

        let err = client_for(&server).get_flavor("gone").await.unwrap_err();
        assert!(matches!(err, InventoryError::NetworkFetch { .. }));
        assert!(err.to_string().contains("404"));
    }

    #[tokio::test]
    async fn test_malformed_body_is_decode_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/v2.1/servers/vm-9")
            .with_status(200)
            .with_body(r#"{"server":{"id":"vm-9"}}"#)
            .create_async()
            .await;

        let err = client_for(&server).get_instance("vm-9").await.unwrap_err();
        assert!(matches!(err, InventoryError::Decode { .. }));
    }
}
