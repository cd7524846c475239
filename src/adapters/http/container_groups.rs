//! Compute slots as Azure container groups, driven through the management REST API.

use crate::domain::slots::{SlotSpec, SlotStatus};
use crate::ports::compute::ComputePort;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::error::Error;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{info, warn};

const MANAGEMENT_URL: &str = "https://management.azure.com";
const LOGIN_URL: &str = "https://login.microsoftonline.com";
const API_VERSION: &str = "2023-05-01";
/// Refresh tokens this long before they expire.
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);
const PROVISIONING_POLL: Duration = Duration::from_secs(5);
const DEFAULT_PROVISIONING_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Clone, Debug)]
pub struct ServicePrincipal {
    pub tenant_id: String,
    pub client_id: String,
    pub client_secret: String,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

struct CachedToken {
    value: String,
    expires_at: Instant,
}

/// Deployment state of a container group, as opposed to its container state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Provisioning {
    Succeeded,
    Failed(String),
    InProgress,
}

pub struct ContainerGroupsAdapter {
    http: reqwest::Client,
    principal: ServicePrincipal,
    subscription_id: String,
    resource_group: String,
    management_url: String,
    login_url: String,
    provisioning_timeout: Duration,
    provisioning_poll: Duration,
    token: Mutex<Option<CachedToken>>,
}

impl ContainerGroupsAdapter {
    pub fn new(
        principal: ServicePrincipal,
        subscription_id: String,
        resource_group: String,
    ) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            http,
            principal,
            subscription_id,
            resource_group,
            management_url: MANAGEMENT_URL.to_string(),
            login_url: LOGIN_URL.to_string(),
            provisioning_timeout: DEFAULT_PROVISIONING_TIMEOUT,
            provisioning_poll: PROVISIONING_POLL,
            token: Mutex::new(None),
        })
    }

    /// Upper bound on how long `dispatch` waits for a new group to finish
    /// provisioning. Keep it below the queue visibility timeout.
    pub fn with_provisioning_timeout(mut self, timeout: Duration) -> Self {
        self.provisioning_timeout = timeout;
        self
    }

    fn group_url(&self, slot_name: &str) -> String {
        format!(
            "{}/subscriptions/{}/resourceGroups/{}/providers/Microsoft.ContainerInstance/containerGroups/{}?api-version={}",
            self.management_url, self.subscription_id, self.resource_group, slot_name, API_VERSION
        )
    }

    async fn fetch_group(&self, slot_name: &str) -> Result<Value, Box<dyn Error + Send + Sync>> {
        let token = self.bearer_token().await?;
        let group = self
            .http
            .get(self.group_url(slot_name))
            .bearer_auth(token)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(group)
    }

    /// Polls the group until provisioning settles or the timeout passes.
    async fn wait_for_provisioning(
        &self,
        slot_name: &str,
        mut state: Provisioning,
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        let deadline = Instant::now() + self.provisioning_timeout;
        loop {
            match state {
                Provisioning::Succeeded => {
                    info!(slot = %slot_name, "container group provisioned");
                    return Ok(());
                }
                Provisioning::Failed(reason) => {
                    return Err(format!(
                        "container group {} failed to provision: {}",
                        slot_name, reason
                    )
                    .into());
                }
                Provisioning::InProgress if Instant::now() >= deadline => {
                    warn!(slot = %slot_name, "container group still provisioning, treating as dispatched");
                    return Ok(());
                }
                Provisioning::InProgress => {}
            }

            tokio::time::sleep(self.provisioning_poll).await;
            state = match self.fetch_group(slot_name).await {
                Ok(group) => provisioning_from_group(&group),
                Err(e) => {
                    warn!(slot = %slot_name, error = %e, "failed to read provisioning state");
                    Provisioning::InProgress
                }
            };
        }
    }

    async fn bearer_token(&self) -> Result<String, Box<dyn Error + Send + Sync>> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            if Instant::now() < token.expires_at {
                return Ok(token.value.clone());
            }
        }

        let url = format!("{}/{}/oauth2/v2.0/token", self.login_url, self.principal.tenant_id);
        let scope = format!("{}/.default", MANAGEMENT_URL);
        let resp: TokenResponse = self
            .http
            .post(url)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.principal.client_id.as_str()),
                ("client_secret", self.principal.client_secret.as_str()),
                ("scope", scope.as_str()),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let lifetime = Duration::from_secs(resp.expires_in).saturating_sub(TOKEN_EXPIRY_MARGIN);
        *cached = Some(CachedToken {
            value: resp.access_token.clone(),
            expires_at: Instant::now() + lifetime,
        });
        Ok(resp.access_token)
    }
}

/// Reads the first container's state from a container group resource.
pub fn status_from_group(group: &Value) -> SlotStatus {
    let state = group
        .pointer("/properties/containers/0/properties/instanceView/currentState/state")
        .and_then(Value::as_str);
    SlotStatus::from_container_state(state)
}

/// Reads `properties.provisioningState`. A failure carries the last container
/// event message when there is one, for example an image pull error.
pub fn provisioning_from_group(group: &Value) -> Provisioning {
    let state = group
        .pointer("/properties/provisioningState")
        .and_then(Value::as_str)
        .unwrap_or_default();

    if state.eq_ignore_ascii_case("Succeeded") {
        return Provisioning::Succeeded;
    }
    if state.eq_ignore_ascii_case("Failed") || state.eq_ignore_ascii_case("Canceled") {
        let reason = group
            .pointer("/properties/containers/0/properties/instanceView/events")
            .and_then(Value::as_array)
            .and_then(|events| events.last())
            .and_then(|event| event.get("message"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| format!("provisioning state {}", state));
        return Provisioning::Failed(reason);
    }
    Provisioning::InProgress
}

/// Container group resource for one slot. Containers restart on failure so a
/// crashed worker retries its job.
pub fn group_body(spec: &SlotSpec) -> Value {
    let env: Vec<Value> = spec
        .env
        .iter()
        .map(|v| {
            if v.secure {
                json!({ "name": v.name, "secureValue": v.value })
            } else {
                json!({ "name": v.name, "value": v.value })
            }
        })
        .collect();

    let mut properties = json!({
        "osType": "Linux",
        "restartPolicy": "OnFailure",
        "containers": [{
            "name": spec.container_name,
            "properties": {
                "image": spec.image,
                "resources": {
                    "requests": { "cpu": spec.cpu, "memoryInGB": spec.memory_gb }
                },
                "environmentVariables": env
            }
        }]
    });

    if let Some(registry) = &spec.registry {
        properties["imageRegistryCredentials"] = json!([{
            "server": registry.server,
            "username": registry.username,
            "password": registry.password
        }]);
    }

    json!({ "location": spec.location, "properties": properties })
}

#[async_trait]
impl ComputePort for ContainerGroupsAdapter {
    async fn slot_status(
        &self,
        slot_name: &str,
    ) -> Result<SlotStatus, Box<dyn Error + Send + Sync>> {
        let token = self.bearer_token().await?;
        let resp = self
            .http
            .get(self.group_url(slot_name))
            .bearer_auth(token)
            .send()
            .await?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(SlotStatus::Absent);
        }
        let group: Value = resp.error_for_status()?.json().await?;
        Ok(status_from_group(&group))
    }

    async fn dispatch(&self, spec: &SlotSpec) -> Result<(), Box<dyn Error + Send + Sync>> {
        let token = self.bearer_token().await?;
        let resp = self
            .http
            .put(self.group_url(&spec.slot_name))
            .bearer_auth(token)
            .json(&group_body(spec))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(format!("container group {} rejected ({}): {}", spec.slot_name, status, body).into());
        }

        // ARM accepts the PUT before the group is deployed.
        let accepted = resp
            .json::<Value>()
            .await
            .map(|group| provisioning_from_group(&group))
            .unwrap_or(Provisioning::InProgress);
        self.wait_for_provisioning(&spec.slot_name, accepted).await
    }
}
