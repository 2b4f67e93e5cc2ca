// In-memory reporting client used for dry runs and tests

use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use super::{
    Attachment, ClientError, FinishLaunchRq, FinishTestItemRq, ItemId, LaunchFinished, PendingOp,
    ReportingClient, SaveLogRq, StartLaunchRq, StartTestItemRq, Started,
};

/// A call received by [`RecordingClient`]
#[derive(Debug, Clone, PartialEq)]
pub enum ClientCall {
    StartLaunch {
        id: ItemId,
        rq: StartLaunchRq,
    },
    StartTestItem {
        id: ItemId,
        launch_id: ItemId,
        parent_id: Option<ItemId>,
        rq: StartTestItemRq,
    },
    FinishTestItem {
        id: ItemId,
        rq: FinishTestItemRq,
    },
    SendLog {
        id: ItemId,
        rq: SaveLogRq,
        file: Option<Attachment>,
    },
    FinishLaunch {
        id: ItemId,
        rq: FinishLaunchRq,
    },
}

#[derive(Default)]
struct Shared {
    calls: Mutex<Vec<ClientCall>>,
    next_id: AtomicUsize,
    settled: AtomicUsize,
}

/// Records every call and settles it locally.
///
/// Clones share the same record, so a test can keep one handle while the
/// reporter owns another.
#[derive(Clone, Default)]
pub struct RecordingClient {
    shared: Arc<Shared>,
    latency: Option<Duration>,
    fail: bool,
    link: Option<String>,
}

impl RecordingClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call fails with a transport error
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Calls settle only after `latency` has passed
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Link returned when the launch is finished
    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.link = Some(link.into());
        self
    }

    pub fn calls(&self) -> Vec<ClientCall> {
        self.lock().clone()
    }

    /// Number of operations that have run to completion
    pub fn settled(&self) -> usize {
        self.shared.settled.load(Ordering::SeqCst)
    }

    /// Number of operations handed out, one per call
    pub fn issued(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<ClientCall>> {
        self.shared
            .calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn next_id(&self, kind: &str) -> ItemId {
        let n = self.shared.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        ItemId::new(format!("{}-{}", kind, n))
    }

    fn record(&self, call: ClientCall) {
        self.lock().push(call);
    }

    fn settle<T: Send + 'static>(&self, value: T) -> PendingOp<T> {
        let shared = self.shared.clone();
        let latency = self.latency;
        let fail = self.fail;
        PendingOp::new(async move {
            if let Some(latency) = latency {
                tokio::time::sleep(latency).await;
            }
            shared.settled.fetch_add(1, Ordering::SeqCst);
            if fail {
                Err(ClientError::Transport {
                    url: "memory://".to_string(),
                    message: "connection refused".to_string(),
                })
            } else {
                Ok(value)
            }
        })
    }

    /// Indented outline of the recorded launch tree
    pub fn render_tree(&self) -> String {
        let calls = self.calls();
        let mut children: HashMap<Option<ItemId>, Vec<(ItemId, String)>> = HashMap::new();
        let mut statuses: HashMap<ItemId, String> = HashMap::new();
        let mut launches = Vec::new();

        for call in &calls {
            match call {
                ClientCall::StartLaunch { rq, .. } => launches.push(rq.name.clone()),
                ClientCall::StartTestItem {
                    id, parent_id, rq, ..
                } => {
                    let label = format!("{} {}", rq.item_type.as_str(), rq.name);
                    children
                        .entry(parent_id.clone())
                        .or_default()
                        .push((id.clone(), label));
                }
                ClientCall::FinishTestItem { id, rq } => {
                    if let Some(status) = rq.status {
                        let mut text = format!("{:?}", status).to_uppercase();
                        if rq.retry == Some(true) {
                            text.push_str(", retry");
                        }
                        statuses.insert(id.clone(), text);
                    }
                }
                _ => {}
            }
        }

        let mut out = String::new();
        for name in &launches {
            let _ = writeln!(out, "launch {}", name);
        }
        // Root items are recorded without a parent
        let depth = usize::from(!launches.is_empty());
        render_children(&mut out, &children, &statuses, &None, depth);
        out
    }
}

fn render_children(
    out: &mut String,
    children: &HashMap<Option<ItemId>, Vec<(ItemId, String)>>,
    statuses: &HashMap<ItemId, String>,
    parent: &Option<ItemId>,
    depth: usize,
) {
    let Some(items) = children.get(parent) else {
        return;
    };
    for (id, label) in items {
        let indent = "  ".repeat(depth);
        match statuses.get(id) {
            Some(status) => {
                let _ = writeln!(out, "{}{} [{}]", indent, label, status);
            }
            None => {
                let _ = writeln!(out, "{}{}", indent, label);
            }
        }
        render_children(out, children, statuses, &Some(id.clone()), depth + 1);
    }
}

impl ReportingClient for RecordingClient {
    fn start_launch(&self, rq: StartLaunchRq) -> Started {
        let id = match &rq.id {
            Some(existing) => ItemId::new(existing.clone()),
            None => self.next_id("launch"),
        };
        self.record(ClientCall::StartLaunch { id: id.clone(), rq });
        Started {
            pending: self.settle(()),
            id,
        }
    }

    fn start_test_item(
        &self,
        rq: StartTestItemRq,
        launch_id: &ItemId,
        parent_id: Option<&ItemId>,
    ) -> Started {
        let id = self.next_id(rq.item_type.as_str());
        self.record(ClientCall::StartTestItem {
            id: id.clone(),
            launch_id: launch_id.clone(),
            parent_id: parent_id.cloned(),
            rq,
        });
        Started {
            pending: self.settle(()),
            id,
        }
    }

    fn finish_test_item(&self, item_id: &ItemId, rq: FinishTestItemRq) -> PendingOp {
        self.record(ClientCall::FinishTestItem {
            id: item_id.clone(),
            rq,
        });
        self.settle(())
    }

    fn send_log(&self, item_id: &ItemId, rq: SaveLogRq, file: Option<Attachment>) -> PendingOp {
        self.record(ClientCall::SendLog {
            id: item_id.clone(),
            rq,
            file,
        });
        self.settle(())
    }

    fn finish_launch(&self, launch_id: &ItemId, rq: FinishLaunchRq) -> PendingOp<LaunchFinished> {
        self.record(ClientCall::FinishLaunch {
            id: launch_id.clone(),
            rq,
        });
        self.settle(LaunchFinished {
            number: Some(1),
            link: self.link.clone(),
        })
    }
}
