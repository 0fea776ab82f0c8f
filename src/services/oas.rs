//! HTTP client for the OAS cold archive service.
//!
//! Requests are signed with HMAC-SHA1 over the method, date, canonical
//! `x-oas-*` headers and resource path, and sent as
//! `Authorization: OAS {key}:{signature}`.

use std::{collections::BTreeMap, sync::Arc};

use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::STANDARD};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use reqwest::{Client, Method, Response, StatusCode};
use serde::{Deserialize, Serialize};
use sha1::Sha1;
use tracing::{debug, instrument};

use super::cold_archive::{
    ColdArchive, ColdArchiveConnector, ColdArchiveError, ColdArchiveResult, JobHandle, JobInfo,
};
use crate::config::ColdArchiveConfig;

type HmacSha1 = Hmac<Sha1>;

const OAS_VERSION: &str = "0.2.5";
const OAS_HEADER_PREFIX: &str = "x-oas-";
const REQUEST_ID_HEADER: &str = "x-oas-request-id";
const JOB_ID_HEADER: &str = "x-oas-job-id";

/// Request body for job submissions.
#[derive(Debug, Serialize)]
struct JobRequest<'a> {
    #[serde(rename = "Type")]
    kind: &'a str,
    #[serde(rename = "Description")]
    description: &'a str,
    #[serde(rename = "OSSHost")]
    oss_host: &'a str,
    #[serde(rename = "Bucket")]
    bucket: &'a str,
    #[serde(rename = "ArchiveId", skip_serializing_if = "Option::is_none")]
    archive_id: Option<&'a str>,
    #[serde(rename = "Object")]
    object: &'a str,
}

#[derive(Debug, Deserialize)]
struct ServiceError {
    code: String,
    message: String,
    #[serde(rename = "type", default)]
    kind: String,
}

#[derive(Debug, Deserialize)]
struct VaultList {
    #[serde(rename = "Marker", default)]
    marker: String,
    #[serde(rename = "VaultList", default)]
    vaults: Vec<VaultInfo>,
}

#[derive(Debug, Deserialize)]
struct VaultInfo {
    #[serde(rename = "VaultID")]
    vault_id: String,
    #[serde(rename = "VaultName")]
    vault_name: String,
}

/// Builds [`OasClient`]s for vault endpoints, sharing one HTTP connection pool.
pub struct OasConnector {
    http: Client,
    config: ColdArchiveConfig,
}

impl OasConnector {
    pub fn new(config: &ColdArchiveConfig) -> ColdArchiveResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self {
            http,
            config: config.clone(),
        })
    }

    /// `{scheme}://{endpoint}:{port}`, https when SSL is enabled or the port is 443.
    pub fn base_url(&self, endpoint: &str) -> String {
        let scheme = if self.config.https() { "https" } else { "http" };
        format!("{}://{}:{}", scheme, endpoint, self.config.port)
    }
}

impl ColdArchiveConnector for OasConnector {
    fn connect(&self, endpoint: &str) -> ColdArchiveResult<Arc<dyn ColdArchive>> {
        Ok(Arc::new(OasClient::new(
            self.http.clone(),
            self.base_url(endpoint),
            &self.config.api_key,
            &self.config.api_secret,
        )))
    }
}

/// Client for a single OAS endpoint.
pub struct OasClient {
    http: Client,
    base_url: String,
    api_key: String,
    api_secret: String,
}

impl OasClient {
    pub fn new(http: Client, base_url: impl Into<String>, api_key: &str, api_secret: &str) -> Self {
        let mut base_url = base_url.into();
        if base_url.ends_with('/') {
            base_url.pop();
        }

        Self {
            http,
            base_url,
            api_key: api_key.to_string(),
            api_secret: api_secret.to_string(),
        }
    }

    /// Compute the request signature.
    fn sign(
        &self,
        method: &Method,
        date: &str,
        headers: &BTreeMap<String, String>,
        resource: &str,
    ) -> String {
        let canonical_headers: String = headers
            .iter()
            .filter(|(k, _)| k.starts_with(OAS_HEADER_PREFIX))
            .map(|(k, v)| format!("{}:{}\n", k, v))
            .collect();
        let string_to_sign = format!(
            "{}\n{}\n{}{}",
            method.as_str(),
            date,
            canonical_headers,
            resource
        );

        // HMAC accepts keys of any length
        let mut mac = match HmacSha1::new_from_slice(self.api_secret.as_bytes()) {
            Ok(mac) => mac,
            Err(_) => return String::new(),
        };
        mac.update(string_to_sign.as_bytes());
        STANDARD.encode(mac.finalize().into_bytes())
    }

    fn http_date(now: DateTime<Utc>) -> String {
        now.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
    }

    async fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        marker: Option<&str>,
        body: Option<&B>,
    ) -> ColdArchiveResult<Response> {
        let date = Self::http_date(Utc::now());
        let mut oas_headers = BTreeMap::new();
        oas_headers.insert("x-oas-version".to_string(), OAS_VERSION.to_string());

        let resource = match marker {
            Some(m) => format!("{}?marker={}", path, m),
            None => path.to_string(),
        };
        let signature = self.sign(&method, &date, &oas_headers, &resource);

        let mut request = self
            .http
            .request(method, format!("{}{}", self.base_url, path))
            .header("Date", &date)
            .header(
                "Authorization",
                format!("OAS {}:{}", self.api_key, signature),
            );
        for (k, v) in &oas_headers {
            request = request.header(k.as_str(), v.as_str());
        }
        if let Some(m) = marker {
            request = request.query(&[("marker", m)]);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        Ok(request.send().await?)
    }

    /// Turn an unexpected status into an error carrying the service's reason.
    async fn check(response: Response, expected: StatusCode) -> ColdArchiveResult<Response> {
        if response.status() == expected {
            return Ok(response);
        }

        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        match serde_json::from_str::<ServiceError>(&body) {
            Ok(reason) => Err(ColdArchiveError::Service {
                code: reason.code,
                message: reason.message,
                kind: reason.kind,
            }),
            Err(_) => Err(ColdArchiveError::Status { status, body }),
        }
    }

    fn header(response: &Response, name: &'static str) -> Option<String> {
        response
            .headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    }

    fn job_handle(response: &Response) -> ColdArchiveResult<JobHandle> {
        let request_id = Self::header(response, REQUEST_ID_HEADER).unwrap_or_default();
        let job_id = Self::header(response, JOB_ID_HEADER)
            .ok_or(ColdArchiveError::MissingHeader(JOB_ID_HEADER))?;
        debug!(request_id = %request_id, job_id = %job_id, "Cold archive job accepted");
        Ok(JobHandle { request_id, job_id })
    }

    async fn submit_job(&self, vault_id: &str, job: &JobRequest<'_>) -> ColdArchiveResult<JobHandle> {
        let path = format!("/vaults/{}/jobs", vault_id);
        let response = self.send(Method::POST, &path, None, Some(job)).await?;
        let response = Self::check(response, StatusCode::ACCEPTED).await?;
        Self::job_handle(&response)
    }
}

#[async_trait]
impl ColdArchive for OasClient {
    #[instrument(skip(self, description), fields(base_url = %self.base_url))]
    async fn archive_to_oas(
        &self,
        vault_id: &str,
        source_endpoint: &str,
        bucket: &str,
        object: &str,
        description: &str,
    ) -> ColdArchiveResult<JobHandle> {
        self.submit_job(
            vault_id,
            &JobRequest {
                kind: "pull-from-oss",
                description,
                oss_host: source_endpoint,
                bucket,
                archive_id: None,
                object,
            },
        )
        .await
    }

    #[instrument(skip(self, description), fields(base_url = %self.base_url))]
    async fn recover_to_oss(
        &self,
        vault_id: &str,
        archive_id: &str,
        dest_endpoint: &str,
        bucket: &str,
        object: &str,
        description: &str,
    ) -> ColdArchiveResult<JobHandle> {
        self.submit_job(
            vault_id,
            &JobRequest {
                kind: "push-to-oss",
                description,
                oss_host: dest_endpoint,
                bucket,
                archive_id: Some(archive_id),
                object,
            },
        )
        .await
    }

    #[instrument(skip(self), fields(base_url = %self.base_url))]
    async fn delete_archive(
        &self,
        vault_id: &str,
        archive_id: &str,
    ) -> ColdArchiveResult<JobHandle> {
        let path = format!("/vaults/{}/archives/{}", vault_id, archive_id);
        let response = self.send::<()>(Method::DELETE, &path, None, None).await?;
        let response = Self::check(response, StatusCode::NO_CONTENT).await?;
        Self::job_handle(&response)
    }

    async fn get_job_info(&self, vault_id: &str, job_id: &str) -> ColdArchiveResult<JobInfo> {
        let path = format!("/vaults/{}/jobs/{}", vault_id, job_id);
        let response = self.send::<()>(Method::GET, &path, None, None).await?;
        let response = Self::check(response, StatusCode::OK).await?;

        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(|e| ColdArchiveError::Decode(e.to_string()))
    }

    async fn find_vault_id(&self, name: &str) -> ColdArchiveResult<String> {
        let mut marker: Option<String> = None;

        loop {
            let response = self
                .send::<()>(Method::GET, "/vaults", marker.as_deref(), None)
                .await?;
            let response = Self::check(response, StatusCode::OK).await?;
            let body = response.bytes().await?;
            let page: VaultList =
                serde_json::from_slice(&body).map_err(|e| ColdArchiveError::Decode(e.to_string()))?;

            if let Some(vault) = page.vaults.into_iter().find(|v| v.vault_name == name) {
                return Ok(vault.vault_id);
            }
            if page.marker.is_empty() {
                return Err(ColdArchiveError::VaultNotFound(name.to_string()));
            }
            marker = Some(page.marker);
        }
    }
}
