// ABOUTME: HTTP implementation of the registry lookup capability
// ABOUTME: Speaks the Docker Hub, GitLab CERN and Docker Registry v2 APIs

use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use super::error::{RegistryLookupError, Result};
use super::RegistryLookup;
use crate::validation::ImageReference;

pub const DOCKER_HUB_REGISTRY: &str = "docker.io";
pub const GITLAB_CERN_REGISTRY: &str = "gitlab-registry.cern.ch";

const DOCKER_HUB_API: &str = "https://hub.docker.com/v2/repositories";
const GITLAB_CERN_API: &str = "https://gitlab.cern.ch/api/v4/projects";
const MANIFEST_MEDIA_TYPES: &str = "application/vnd.docker.distribution.manifest.v2+json, \
     application/vnd.docker.distribution.manifest.list.v2+json, \
     application/vnd.oci.image.manifest.v1+json, \
     application/vnd.oci.image.index.v1+json";

/// Parameters of a `WWW-Authenticate: Bearer ...` challenge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BearerChallenge {
    pub realm: String,
    pub service: Option<String>,
    pub scope: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    token: Option<String>,
    access_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GitlabRepository {
    #[serde(default)]
    tags: Vec<GitlabTag>,
}

#[derive(Debug, Deserialize)]
struct GitlabTag {
    name: String,
}

pub struct HttpRegistryLookup {
    client: Client,
}

impl HttpRegistryLookup {
    pub fn new(request_timeout: Duration) -> reqwest::Result<Self> {
        let client = Client::builder()
            .timeout(request_timeout)
            .user_agent(concat!("wfcheck/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    async fn docker_hub(&self, image: &ImageReference) -> Result<bool> {
        let url = docker_hub_url(image);
        let status = self.send(Method::GET, &url, image).await?.status();
        classify(status, image)
    }

    async fn gitlab_cern(&self, image: &ImageReference) -> Result<bool> {
        let url = gitlab_cern_url(image);
        let response = self.send(Method::GET, &url, image).await?;
        let status = response.status();
        if !status.is_success() {
            return classify(status, image);
        }

        let repositories: Vec<GitlabRepository> = response
            .json()
            .await
            .map_err(|e| unexpected(&url, image, e))?;

        Ok(repositories
            .iter()
            .flat_map(|repository| &repository.tags)
            .any(|tag| tag.name == image.tag))
    }

    /// Manifest `HEAD`, retried once with an anonymous token when the registry sends a bearer challenge
    async fn distribution(&self, image: &ImageReference) -> Result<bool> {
        let url = manifest_url(image);
        let response = self.head_manifest(&url, None, image).await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return classify(response.status(), image);
        }

        let challenge = response
            .headers()
            .get(reqwest::header::WWW_AUTHENTICATE)
            .and_then(|value| value.to_str().ok())
            .and_then(parse_bearer_challenge);
        let Some(challenge) = challenge else {
            return classify(response.status(), image);
        };

        let token = self.anonymous_token(&challenge, image).await?;
        let retried = self.head_manifest(&url, Some(&token), image).await?;
        classify(retried.status(), image)
    }

    async fn head_manifest(
        &self,
        url: &str,
        token: Option<&str>,
        image: &ImageReference,
    ) -> Result<reqwest::Response> {
        debug!("Querying {} for {}", url, image);
        let mut request = self
            .client
            .head(url)
            .header(reqwest::header::ACCEPT, MANIFEST_MEDIA_TYPES);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        request
            .send()
            .await
            .map_err(|e| transport_error(e, url, image))
    }

    async fn anonymous_token(
        &self,
        challenge: &BearerChallenge,
        image: &ImageReference,
    ) -> Result<String> {
        let scope = challenge
            .scope
            .clone()
            .unwrap_or_else(|| format!("repository:{}:pull", image.repository));
        let mut query = vec![("scope", scope)];
        if let Some(service) = &challenge.service {
            query.push(("service", service.clone()));
        }

        debug!("Requesting anonymous token from {} for {}", challenge.realm, image);
        let response = self
            .client
            .get(&challenge.realm)
            .query(&query)
            .send()
            .await
            .map_err(|e| transport_error(e, &challenge.realm, image))?;
        let status = response.status();
        if !status.is_success() {
            classify(status, image)?;
            return Err(unexpected(&challenge.realm, image, format!("status {}", status)));
        }

        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| unexpected(&challenge.realm, image, e))?;
        body.token
            .or(body.access_token)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| unexpected(&challenge.realm, image, "no token in response"))
    }

    async fn send(
        &self,
        method: Method,
        url: &str,
        image: &ImageReference,
    ) -> Result<reqwest::Response> {
        debug!("Querying {} for {}", url, image);
        self.client
            .request(method, url)
            .send()
            .await
            .map_err(|e| transport_error(e, url, image))
    }
}

#[async_trait]
impl RegistryLookup for HttpRegistryLookup {
    async fn lookup(&self, image: &ImageReference) -> Result<bool> {
        match image.registry.as_str() {
            DOCKER_HUB_REGISTRY => self.docker_hub(image).await,
            GITLAB_CERN_REGISTRY => self.gitlab_cern(image).await,
            _ => self.distribution(image).await,
        }
    }
}

pub fn docker_hub_url(image: &ImageReference) -> String {
    format!(
        "{}/{}/tags/{}",
        DOCKER_HUB_API, image.repository, image.tag
    )
}

/// The project path is url-encoded, slashes included
pub fn gitlab_cern_url(image: &ImageReference) -> String {
    let project: String = url::form_urlencoded::byte_serialize(image.repository.as_bytes()).collect();
    format!("{}/{}/registry/repositories?tags=1", GITLAB_CERN_API, project)
}

pub fn manifest_url(image: &ImageReference) -> String {
    format!(
        "https://{}/v2/{}/manifests/{}",
        image.registry, image.repository, image.tag
    )
}

/// Parse `Bearer realm="...",service="...",scope="..."`; other schemes yield `None`
pub fn parse_bearer_challenge(header: &str) -> Option<BearerChallenge> {
    let header = header.trim_start();
    let (scheme, params) = header.split_once(char::is_whitespace)?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }

    let mut realm = None;
    let mut service = None;
    let mut scope = None;
    for (key, value) in challenge_params(params) {
        match key.to_ascii_lowercase().as_str() {
            "realm" => realm = Some(value),
            "service" => service = Some(value),
            "scope" => scope = Some(value),
            _ => {}
        }
    }

    Some(BearerChallenge {
        realm: realm.filter(|realm| !realm.is_empty())?,
        service,
        scope,
    })
}

/// Comma-separated `key=value` pairs; quoted values may contain commas
fn challenge_params(params: &str) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    let mut chars = params.chars().peekable();

    loop {
        while chars.peek().map_or(false, |c| *c == ',' || c.is_whitespace()) {
            chars.next();
        }
        let key: String = chars
            .by_ref()
            .take_while(|c| *c != '=')
            .collect::<String>()
            .trim()
            .to_string();
        if key.is_empty() {
            break;
        }

        let mut value = String::new();
        if chars.peek() == Some(&'"') {
            chars.next();
            while let Some(c) = chars.next() {
                match c {
                    '\\' => value.extend(chars.next()),
                    '"' => break,
                    _ => value.push(c),
                }
            }
        } else {
            while let Some(c) = chars.next_if(|c| *c != ',') {
                value.push(c);
            }
            value = value.trim().to_string();
        }
        pairs.push((key, value));
    }

    pairs
}

fn classify(status: StatusCode, image: &ImageReference) -> Result<bool> {
    if status.is_success() {
        return Ok(true);
    }
    if status == StatusCode::NOT_FOUND {
        return Ok(false);
    }
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(RegistryLookupError::Unauthorized {
            image: image.to_string(),
            registry: image.registry.clone(),
            status: status.as_u16(),
        });
    }
    Err(RegistryLookupError::Unavailable {
        image: image.to_string(),
        registry: image.registry.clone(),
        reason: format!("registry answered with status {}", status),
    })
}

fn unexpected(url: &str, image: &ImageReference, detail: impl std::fmt::Display) -> RegistryLookupError {
    RegistryLookupError::Unavailable {
        image: image.to_string(),
        registry: image.registry.clone(),
        reason: format!("unexpected response from {}: {}", url, detail),
    }
}

fn transport_error(error: reqwest::Error, url: &str, image: &ImageReference) -> RegistryLookupError {
    RegistryLookupError::Unavailable {
        image: image.to_string(),
        registry: image.registry.clone(),
        reason: format!("request to {} failed: {}", url, error),
    }
}
