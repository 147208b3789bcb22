use std::collections::BTreeMap;
use std::fmt::Debug;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use http::header::{AUTHORIZATION, CONTENT_TYPE};
use http::{Method, Request, Response, StatusCode};
use serde::{Serialize, Deserialize};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, trace};
use ureq::{Agent, AgentBuilder, OrAnyStatus};
use url::Url;

use fluvio_future::task::spawn_blocking;

use kns_metadata::command::ConnectorAction;
use kns_metadata::connector::{ConnectorState, ConnectorStatus, TaskStatus};
use kns_metadata::validator::invalid_value;

use crate::RemoteError;
use crate::config::ConnectConfig;

/// connector as reported by the connect runtime
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectorInfo {
    pub name: String,
    pub config: BTreeMap<String, String>,
    pub status: ConnectorStatus,
}

/// REST api of a connect runtime
#[async_trait]
pub trait ConnectClient: Debug + Send + Sync + 'static {
    async fn list_connectors(&self) -> Result<Vec<String>, RemoteError>;

    /// config and status, none if the runtime does not know the connector
    async fn connector(&self, name: &str) -> Result<Option<ConnectorInfo>, RemoteError>;

    /// create or update with the desired config
    async fn put_connector(
        &self,
        name: &str,
        config: &BTreeMap<String, String>,
    ) -> Result<(), RemoteError>;

    async fn delete_connector(&self, name: &str) -> Result<(), RemoteError>;

    /// returns the http code reported by the runtime
    async fn change_state(&self, name: &str, action: ConnectorAction) -> Result<u16, RemoteError>;

    /// errors reported by the runtime for a candidate config
    async fn validate(
        &self,
        class: &str,
        config: &BTreeMap<String, String>,
    ) -> Result<Vec<String>, RemoteError>;
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct StateBody {
    state: ConnectorState,
    #[serde(default)]
    worker_id: String,
}

#[derive(Debug, Deserialize)]
struct TaskBody {
    id: i32,
    state: ConnectorState,
    #[serde(default)]
    worker_id: String,
    #[serde(default)]
    trace: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StatusBody {
    connector: StateBody,
    #[serde(default)]
    tasks: Vec<TaskBody>,
}

impl From<StatusBody> for ConnectorStatus {
    fn from(body: StatusBody) -> Self {
        ConnectorStatus {
            state: body.connector.state,
            worker_id: body.connector.worker_id,
            tasks: body
                .tasks
                .into_iter()
                .map(|task| TaskStatus {
                    id: task.id,
                    state: task.state,
                    worker_id: task.worker_id,
                    trace: task.trace,
                })
                .collect(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Deserialize)]
struct ConfigValue {
    name: String,
    #[serde(default)]
    value: Option<String>,
    #[serde(default)]
    errors: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ConfigInfo {
    value: ConfigValue,
}

#[derive(Debug, Deserialize)]
struct ValidationBody {
    #[serde(default)]
    error_count: u32,
    #[serde(default)]
    configs: Vec<ConfigInfo>,
}

impl ValidationBody {
    fn into_errors(self) -> Vec<String> {
        if self.error_count == 0 {
            return vec![];
        }
        self.configs
            .into_iter()
            .flat_map(|info| {
                let ConfigValue {
                    name,
                    value,
                    errors,
                } = info.value;
                let value = value.unwrap_or_else(|| "null".to_owned());
                errors
                    .into_iter()
                    .map(move |error| invalid_value(&value, &name, error))
            })
            .collect()
    }
}

#[derive(Debug, Serialize)]
struct Empty {}

/// Connect runtime reached over http
#[derive(Debug)]
pub struct HttpConnectClient {
    base: Url,
    authorization: Option<String>,
    agent: Agent,
}

impl HttpConnectClient {
    pub fn new(config: &ConnectConfig, timeout: Duration) -> Result<Self, RemoteError> {
        let base = Url::parse(&config.url)
            .map_err(|err| RemoteError::Transport(format!("invalid url {}: {err}", config.url)))?;
        let authorization = config.basic_auth_username.as_ref().map(|user| {
            let password = config.basic_auth_password.as_deref().unwrap_or_default();
            format!("Basic {}", STANDARD.encode(format!("{user}:{password}")))
        });
        let agent = AgentBuilder::new().timeout(timeout).build();
        Ok(Self {
            base,
            authorization,
            agent,
        })
    }

    fn url(&self, segments: &[&str]) -> Result<Url, RemoteError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| RemoteError::Transport(format!("{} cannot be a base", self.base)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn send(
        &self,
        method: Method,
        url: Url,
        body: Option<Vec<u8>>,
    ) -> Result<Response<Vec<u8>>, RemoteError> {
        let mut builder = Request::builder()
            .method(method)
            .uri(url.as_str())
            .header(CONTENT_TYPE, "application/json");
        if let Some(authorization) = &self.authorization {
            builder = builder.header(AUTHORIZATION, authorization);
        }
        let request = builder
            .body(body.unwrap_or_default())
            .map_err(|err| RemoteError::Transport(format!("request format error {err}")))?;

        trace!(uri = %request.uri(), method = %request.method(), "connect request");
        let agent = self.agent.clone();
        spawn_blocking(move || send_blocking(agent, request)).await
    }

    async fn send_json<T, B>(&self, method: Method, url: Url, body: Option<&B>) -> Result<T, RemoteError>
    where
        T: DeserializeOwned,
        B: Serialize,
    {
        let body = body
            .map(serde_json::to_vec)
            .transpose()
            .map_err(|err| RemoteError::Transport(format!("json encode error {err}")))?;
        let response = checked(self.send(method, url, body).await?)?;
        serde_json::from_slice(response.body())
            .map_err(|err| RemoteError::Transport(format!("json parse error {err}")))
    }
}

fn send_blocking(agent: Agent, request: Request<Vec<u8>>) -> Result<Response<Vec<u8>>, RemoteError> {
    let (parts, body) = request.into_parts();
    let mut ureq_request = agent.request(parts.method.as_ref(), &parts.uri.to_string());
    for (name, value) in parts.headers.iter() {
        let value = value
            .to_str()
            .map_err(|err| RemoteError::Transport(format!("invalid header {name}: {err}")))?;
        ureq_request = ureq_request.set(name.as_ref(), value);
    }

    let response = ureq_request
        .send_bytes(&body)
        .or_any_status()
        .map_err(|err| RemoteError::Transport(err.to_string()))?;
    Ok(response.into())
}

/// turn an error status into a remote error carrying the runtime message
fn checked(response: Response<Vec<u8>>) -> Result<Response<Vec<u8>>, RemoteError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = serde_json::from_slice::<ErrorBody>(response.body())
        .map(|body| body.message)
        .unwrap_or_else(|_| String::from_utf8_lossy(response.body()).to_string());
    Err(RemoteError::Http {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl ConnectClient for HttpConnectClient {
    #[instrument(skip(self), fields(url = %self.base))]
    async fn list_connectors(&self) -> Result<Vec<String>, RemoteError> {
        let url = self.url(&["connectors"])?;
        self.send_json::<_, Empty>(Method::GET, url, None).await
    }

    #[instrument(skip(self), fields(url = %self.base))]
    async fn connector(&self, name: &str) -> Result<Option<ConnectorInfo>, RemoteError> {
        let url = self.url(&["connectors", name, "config"])?;
        let response = self.send(Method::GET, url, None).await?;
        if response.status() == StatusCode::NOT_FOUND {
            debug!("connector not found");
            return Ok(None);
        }
        let config: BTreeMap<String, String> = serde_json::from_slice(checked(response)?.body())
            .map_err(|err| RemoteError::Transport(format!("json parse error {err}")))?;

        let url = self.url(&["connectors", name, "status"])?;
        let status: StatusBody = self.send_json::<_, Empty>(Method::GET, url, None).await?;

        Ok(Some(ConnectorInfo {
            name: name.to_owned(),
            config,
            status: status.into(),
        }))
    }

    #[instrument(skip(self, config), fields(url = %self.base))]
    async fn put_connector(
        &self,
        name: &str,
        config: &BTreeMap<String, String>,
    ) -> Result<(), RemoteError> {
        let url = self.url(&["connectors", name, "config"])?;
        let body = serde_json::to_vec(config)
            .map_err(|err| RemoteError::Transport(format!("json encode error {err}")))?;
        checked(self.send(Method::PUT, url, Some(body)).await?)?;
        Ok(())
    }

    #[instrument(skip(self), fields(url = %self.base))]
    async fn delete_connector(&self, name: &str) -> Result<(), RemoteError> {
        let url = self.url(&["connectors", name])?;
        checked(self.send(Method::DELETE, url, None).await?)?;
        Ok(())
    }

    #[instrument(skip(self), fields(url = %self.base))]
    async fn change_state(&self, name: &str, action: ConnectorAction) -> Result<u16, RemoteError> {
        let (method, url) = match action {
            ConnectorAction::Restart => {
                let mut url = self.url(&["connectors", name, "restart"])?;
                url.query_pairs_mut()
                    .append_pair("includeTasks", "true")
                    .append_pair("onlyFailed", "false");
                (Method::POST, url)
            }
            ConnectorAction::Pause => (Method::PUT, self.url(&["connectors", name, "pause"])?),
            ConnectorAction::Resume => (Method::PUT, self.url(&["connectors", name, "resume"])?),
        };
        let response = checked(self.send(method, url, None).await?)?;
        Ok(response.status().as_u16())
    }

    #[instrument(skip(self, config), fields(url = %self.base))]
    async fn validate(
        &self,
        class: &str,
        config: &BTreeMap<String, String>,
    ) -> Result<Vec<String>, RemoteError> {
        let url = self.url(&["connector-plugins", class, "config", "validate"])?;
        let body: ValidationBody = self.send_json(Method::PUT, url, Some(config)).await?;
        Ok(body.into_errors())
    }
}
