use super::wire::{
    domain_search_query, move_request, resolve_domains, DataCenterList, DiskAttachmentList,
    DiskList, StorageDomainList, TemplateList, VmList, WireDisk,
};
use super::{Disk, DiskStatus, DomainFilter, Platform, PlatformError, StorageDomain, Vm};
use crate::config::AppConfig;
use async_trait::async_trait;
use reqwest::{Certificate, Client, Method};
use serde::de::DeserializeOwned;
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, info, warn};

const CONNECT_TIMEOUT_SECS: u64 = 15;

/// JSON client for the oVirt engine REST API (v4), authenticated with HTTP basic auth.
pub(crate) struct OvirtClient {
    base_url: String,
    username: String,
    password: String,
    http: Client,
}

impl std::fmt::Debug for OvirtClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OvirtClient")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

impl OvirtClient {
    /// Build a client trusting only the configured CA bundle.
    pub(crate) fn new(config: &AppConfig) -> Result<Self, PlatformError> {
        let pem = std::fs::read(&config.ca_path)
            .map_err(|e| PlatformError::Certificate(format!("{}: {e}", config.ca_path)))?;
        let ca = Certificate::from_pem(&pem)
            .map_err(|e| PlatformError::Certificate(format!("{}: {e}", config.ca_path)))?;

        let http = Client::builder()
            .add_root_certificate(ca)
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| PlatformError::Http(e.to_string()))?;

        Ok(Self {
            base_url: config.uri.trim_end_matches('/').to_string(),
            username: config.username.clone(),
            password: config.password.clone(),
            http,
        })
    }

    async fn get<R: DeserializeOwned>(
        &self,
        path: &str,
        search: Option<&str>,
    ) -> Result<R, PlatformError> {
        self.send(Method::GET, path, search, None).await
    }

    async fn send<R: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        search: Option<&str>,
        body: Option<serde_json::Value>,
    ) -> Result<R, PlatformError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("oVirt API request: {} {} search={:?}", method, url, search);

        let mut request = self
            .http
            .request(method, &url)
            .basic_auth(&self.username, Some(&self.password))
            .header("Accept", "application/json")
            .header("Version", "4");

        if let Some(search) = search {
            request = request.query(&[("search", search)]);
        }
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await.map_err(|e| PlatformError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable response body>".to_string());
            warn!("oVirt API request failed: {} - {}", status, body);
            return Err(PlatformError::from_status(status.as_u16(), path, body));
        }

        response.json::<R>().await.map_err(|e| PlatformError::Parse(e.to_string()))
    }

    async fn attached_disk_ids(&self, path: &str) -> Result<Vec<String>, PlatformError> {
        let attachments: DiskAttachmentList = self.get(path, None).await?;
        Ok(attachments.disk_attachment.into_iter().map(|a| a.disk_id()).collect())
    }
}

#[async_trait]
impl Platform for OvirtClient {
    async fn test_connection(&self) -> Result<(), PlatformError> {
        let _: serde_json::Value = self.get("/", None).await?;
        info!("Connected to {} as {}", self.base_url, self.username);
        Ok(())
    }

    async fn list_storage_domains(
        &self,
        filter: &DomainFilter,
    ) -> Result<Vec<StorageDomain>, PlatformError> {
        let query = domain_search_query(filter);
        let domains: StorageDomainList = self.get("/storagedomains", Some(&query)).await?;
        // The datacenter collection cannot be searched by id, so resolve names from the full list.
        let datacenters: DataCenterList = self.get("/datacenters", None).await?;
        Ok(resolve_domains(domains.storage_domain, &datacenters.data_center))
    }

    async fn list_disks(&self, domain_name: &str) -> Result<Vec<Disk>, PlatformError> {
        let query = format!("Storage = {domain_name}");
        let disks: DiskList = self.get("/disks", Some(&query)).await?;
        Ok(disks.disk.into_iter().map(Disk::from).collect())
    }

    async fn list_vms(&self) -> Result<Vec<Vm>, PlatformError> {
        let vms: VmList = self.get("/vms", None).await?;
        let mut result = Vec::with_capacity(vms.vm.len());
        for vm in vms.vm {
            let path = format!("/vms/{}/diskattachments", vm.id);
            let disk_ids = self.attached_disk_ids(&path).await?;
            result.push(vm.into_vm(disk_ids));
        }
        Ok(result)
    }

    async fn list_template_disk_ids(&self) -> Result<HashSet<String>, PlatformError> {
        let templates: TemplateList = self.get("/templates", None).await?;
        let mut ids = HashSet::new();
        for template in templates.template {
            let path = format!("/templates/{}/diskattachments", template.id);
            ids.extend(self.attached_disk_ids(&path).await?);
        }
        Ok(ids)
    }

    async fn move_disk(
        &self,
        disk_id: &str,
        destination: &StorageDomain,
    ) -> Result<(), PlatformError> {
        let body = move_request(destination);
        let _: serde_json::Value =
            self.send(Method::POST, &format!("/disks/{disk_id}/move"), None, Some(body)).await?;
        Ok(())
    }

    async fn disk_status(&self, disk_id: &str) -> Result<DiskStatus, PlatformError> {
        let disk: WireDisk = self.get(&format!("/disks/{disk_id}"), None).await?;
        Ok(Disk::from(disk).status)
    }
}
