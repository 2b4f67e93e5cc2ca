// ReportPortal HTTP client

use futures::future::{BoxFuture, FutureExt, Shared, join_all};
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use reqwest::{Method, multipart};
use serde::Serialize;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

use super::{
    Attachment, ClientError, FinishLaunchRq, FinishTestItemRq, ItemId, LaunchFinished, PendingOp,
    ReportingClient, SaveLogRq, StartLaunchRq, StartTestItemRq, Started,
};

type SharedOp = Shared<BoxFuture<'static, Result<(), ClientError>>>;

/// Connection settings for [`HttpClient`]
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// API root, e.g. `https://rp.example.com/api/v1`
    pub endpoint: String,
    pub project: String,
    pub api_key: String,
    pub timeout: Duration,
}

/// Bookkeeping for an item the client has started
struct ItemState {
    launch: ItemId,
    parent: Option<ItemId>,
    started: SharedOp,
    children_finished: Vec<SharedOp>,
}

/// Client for the ReportPortal REST API.
///
/// Ids are generated locally (the service accepts client supplied uuids), so
/// start calls return without a round trip. Requests are spawned on the tokio
/// runtime and chained on the requests they depend on: a child start waits
/// for its parent start, a finish waits for the item start and every child
/// finish and log, a log waits for its item start.
pub struct HttpClient {
    http: reqwest::Client,
    base_url: String,
    items: Arc<Mutex<HashMap<ItemId, ItemState>>>,
}

impl HttpClient {
    pub fn new(config: HttpClientConfig) -> Result<Self, ClientError> {
        let endpoint = url::Url::parse(&config.endpoint)
            .map_err(|e| ClientError::Config(format!("invalid endpoint {}: {}", config.endpoint, e)))?;
        if config.project.trim().is_empty() {
            return Err(ClientError::Config("project name is empty".to_string()));
        }

        let mut headers = HeaderMap::new();
        let bearer = HeaderValue::from_str(&format!("Bearer {}", config.api_key))
            .map_err(|e| ClientError::Config(format!("invalid api key: {}", e)))?;
        headers.insert(AUTHORIZATION, bearer);

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .connect_timeout(Duration::from_secs(10))
            .user_agent(format!("portal-reporter/{}", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .build()
            .map_err(|e| ClientError::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: format!(
                "{}/{}",
                endpoint.as_str().trim_end_matches('/'),
                config.project.trim()
            ),
            items: Arc::new(Mutex::new(HashMap::new())),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<ItemId, ItemState>> {
        self.items.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn started_op(&self, id: &ItemId) -> SharedOp {
        match self.lock().get(id) {
            Some(state) => state.started.clone(),
            None => ready_shared(Err(ClientError::UnknownItem(id.clone()))),
        }
    }

    fn register(&self, id: ItemId, launch: ItemId, parent: Option<ItemId>, started: SharedOp) {
        self.lock().insert(
            id,
            ItemState {
                launch,
                parent,
                started,
                children_finished: Vec::new(),
            },
        );
    }
}

impl ReportingClient for HttpClient {
    fn start_launch(&self, rq: StartLaunchRq) -> Started {
        if let Some(existing) = rq.id.as_deref() {
            debug!("Reporting into existing launch {}", existing);
            let id = ItemId::new(existing);
            let started = ready_shared(Ok(()));
            self.register(id.clone(), id.clone(), None, started.clone());
            return Started {
                id,
                pending: PendingOp::new(started),
            };
        }

        let id = ItemId::new(Uuid::new_v4().to_string());
        let url = self.url("launch");
        let body = encode(&url, &rq).map(|mut body| {
            body["uuid"] = json!(id.as_str());
            body
        });

        let http = self.http.clone();
        let started = spawn_shared(async move {
            send(&http, Method::POST, &url, Payload::Json(body?)).await?;
            Ok(())
        });
        self.register(id.clone(), id.clone(), None, started.clone());

        Started {
            id,
            pending: PendingOp::new(started),
        }
    }

    fn start_test_item(
        &self,
        rq: StartTestItemRq,
        launch_id: &ItemId,
        parent_id: Option<&ItemId>,
    ) -> Started {
        let id = ItemId::new(Uuid::new_v4().to_string());
        let depends_on = parent_id.unwrap_or(launch_id).clone();
        let parent_started = self.started_op(&depends_on);

        let url = match parent_id {
            Some(parent) => self.url(&format!("item/{}", parent)),
            None => self.url("item"),
        };
        let body = encode(&url, &rq).map(|mut body| {
            body["uuid"] = json!(id.as_str());
            body["launchUuid"] = json!(launch_id.as_str());
            body
        });

        let http = self.http.clone();
        let started = spawn_shared(async move {
            parent_started
                .await
                .map_err(|_| ClientError::Dependency(depends_on))?;
            send(&http, Method::POST, &url, Payload::Json(body?)).await?;
            Ok(())
        });
        self.register(
            id.clone(),
            launch_id.clone(),
            parent_id.cloned(),
            started.clone(),
        );

        Started {
            id,
            pending: PendingOp::new(started),
        }
    }

    fn finish_test_item(&self, item_id: &ItemId, rq: FinishTestItemRq) -> PendingOp {
        let Some(state) = self.lock().remove(item_id) else {
            return PendingOp::ready(Err(ClientError::UnknownItem(item_id.clone())));
        };

        let url = self.url(&format!("item/{}", item_id));
        let body = encode(&url, &rq).map(|mut body| {
            body["launchUuid"] = json!(state.launch.as_str());
            body
        });

        let http = self.http.clone();
        let id = item_id.clone();
        let started = state.started;
        let children = state.children_finished;
        let finished = spawn_shared(async move {
            started.await.map_err(|_| ClientError::Dependency(id))?;
            // Children failures were reported on their own handles
            join_all(children).await;
            send(&http, Method::PUT, &url, Payload::Json(body?)).await?;
            Ok(())
        });

        let owner = state.parent.unwrap_or(state.launch);
        if let Some(owner_state) = self.lock().get_mut(&owner) {
            owner_state.children_finished.push(finished.clone());
        }

        PendingOp::new(finished)
    }

    fn send_log(&self, item_id: &ItemId, rq: SaveLogRq, file: Option<Attachment>) -> PendingOp {
        let (launch, started) = match self.lock().get(item_id) {
            Some(state) => (state.launch.clone(), state.started.clone()),
            None => return PendingOp::ready(Err(ClientError::UnknownItem(item_id.clone()))),
        };

        let url = self.url("log");
        let body = encode(&url, &rq).map(|mut body| {
            body["launchUuid"] = json!(launch.as_str());
            body["itemUuid"] = json!(item_id.as_str());
            body
        });

        let http = self.http.clone();
        let id = item_id.clone();
        let sent = spawn_shared(async move {
            started.await.map_err(|_| ClientError::Dependency(id))?;
            let payload = match file {
                None => Payload::Json(body?),
                Some(file) => {
                    let mut body = body?;
                    body["file"] = json!({ "name": file.name });
                    Payload::Multipart(Value::Array(vec![body]), file)
                }
            };
            send(&http, Method::POST, &url, payload).await?;
            Ok(())
        });

        // The item finish waits for its logs
        if let Some(state) = self.lock().get_mut(item_id) {
            state.children_finished.push(sent.clone());
        }

        PendingOp::new(sent)
    }

    fn finish_launch(&self, launch_id: &ItemId, rq: FinishLaunchRq) -> PendingOp<LaunchFinished> {
        let Some(state) = self.lock().remove(launch_id) else {
            return PendingOp::ready(Err(ClientError::UnknownItem(launch_id.clone())));
        };

        let url = self.url(&format!("launch/{}/finish", launch_id));
        let body = encode(&url, &rq);
        let http = self.http.clone();
        let id = launch_id.clone();

        let handle = tokio::spawn(async move {
            state.started.await.map_err(|_| ClientError::Dependency(id))?;
            join_all(state.children_finished).await;
            let response = send(&http, Method::PUT, &url, Payload::Json(body?)).await?;
            if response.is_null() {
                return Ok(LaunchFinished::default());
            }
            serde_json::from_value::<LaunchFinished>(response).map_err(|e| ClientError::Decode {
                url: url.clone(),
                message: e.to_string(),
            })
        });

        PendingOp::new(async move {
            handle
                .await
                .unwrap_or_else(|e| Err(ClientError::Aborted(e.to_string())))
        })
    }
}

enum Payload {
    Json(Value),
    /// `json_request_part` array plus one file part
    Multipart(Value, Attachment),
}

fn encode<T: Serialize>(url: &str, rq: &T) -> Result<Value, ClientError> {
    serde_json::to_value(rq).map_err(|e| ClientError::Encode {
        url: url.to_string(),
        message: e.to_string(),
    })
}

async fn send(
    http: &reqwest::Client,
    method: Method,
    url: &str,
    payload: Payload,
) -> Result<Value, ClientError> {
    debug!("{} {}", method, url);
    let request = http.request(method.clone(), url);
    let request = match payload {
        Payload::Json(body) => request.json(&body),
        Payload::Multipart(parts, file) => {
            let json_part = multipart::Part::text(parts.to_string())
                .mime_str("application/json")
                .map_err(|e| ClientError::transport(url, e))?;
            let file_part = multipart::Part::bytes(file.content)
                .file_name(file.name)
                .mime_str(&file.mime_type)
                .map_err(|e| ClientError::transport(url, e))?;
            let form = multipart::Form::new()
                .part("json_request_part", json_part)
                .part("file", file_part);
            request.multipart(form)
        }
    };

    let response = request
        .send()
        .await
        .map_err(|e| ClientError::transport(url, e))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ClientError::Http {
            method: method.to_string(),
            url: url.to_string(),
            status: status.as_u16(),
            body,
        });
    }

    let text = response
        .text()
        .await
        .map_err(|e| ClientError::transport(url, e))?;
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(&text).map_err(|e| ClientError::Decode {
        url: url.to_string(),
        message: e.to_string(),
    })
}

/// Run `fut` on the runtime now and share its outcome with every dependent
fn spawn_shared(
    fut: impl std::future::Future<Output = Result<(), ClientError>> + Send + 'static,
) -> SharedOp {
    let handle = tokio::spawn(fut);
    async move {
        handle
            .await
            .unwrap_or_else(|e| Err(ClientError::Aborted(e.to_string())))
    }
    .boxed()
    .shared()
}

fn ready_shared(result: Result<(), ClientError>) -> SharedOp {
    futures::future::ready(result).boxed().shared()
}
