//! Result tree reconciliation.
//!
//! Turns the flat stream of per-file results into the nested
//! launch → suite → test → step tree of the reporting service. Suites are
//! keyed by name and tests by their `/`-joined ancestor path; both tables
//! only hold items opened for the batch currently being processed. Every
//! remote call is handed off without waiting and joined at run completion.

use futures::future::{BoxFuture, FutureExt, join_all};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

use super::Reporter;
use super::attachments::resolve_attachments;
use super::markers::{MarkerSink, StdoutSink, report_failure, report_link};
use super::naming::{code_ref, full_step_name, full_test_name, join_titles};
use super::step::{StepAttempt, failure_logs, finish_request, plan_attempts};
use crate::client::{
    Attachment, FinishLaunchRq, FinishTestItemRq, ItemAttribute, ItemId, ItemType, PendingOp,
    ReportingClient, StartLaunchRq, StartTestItemRq,
};
use crate::config::Config;
use crate::state::{AssertionResult, FileResult, TestStatus};
use crate::time;

/// System attribute identifying this agent on every launch
pub fn agent_attribute() -> ItemAttribute {
    ItemAttribute::system(
        "agent",
        format!("{}|{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")),
    )
}

pub struct PortalReporter {
    client: Arc<dyn ReportingClient>,
    config: Config,
    markers: Arc<dyn MarkerSink>,
    root: PathBuf,
    launch_id: Option<ItemId>,
    suite_ids: HashMap<String, ItemId>,
    suite_order: Vec<String>,
    test_ids: HashMap<String, ItemId>,
    test_order: Vec<String>,
    step_id: Option<ItemId>,
    pending: Vec<BoxFuture<'static, ()>>,
}

impl PortalReporter {
    pub fn new(client: Arc<dyn ReportingClient>, config: Config) -> Self {
        Self {
            client,
            config,
            markers: Arc::new(StdoutSink),
            root: std::env::current_dir().unwrap_or_default(),
            launch_id: None,
            suite_ids: HashMap::new(),
            suite_order: Vec::new(),
            test_ids: HashMap::new(),
            test_order: Vec::new(),
            step_id: None,
            pending: Vec::new(),
        }
    }

    /// Destination of the error and link markers
    pub fn with_markers(mut self, markers: Arc<dyn MarkerSink>) -> Self {
        self.markers = markers;
        self
    }

    /// Directory code references are made relative to
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    pub fn launch_id(&self) -> Option<&ItemId> {
        self.launch_id.as_ref()
    }

    /// Operations handed off and not yet joined
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Suites and tests currently open
    pub fn open_items(&self) -> usize {
        self.suite_ids.len() + self.test_ids.len()
    }

    fn disabled(&self) -> bool {
        self.config.reporting.disabled
    }

    fn launch_request(&self) -> StartLaunchRq {
        let portal = &self.config.portal;
        let mut attributes = portal.attributes.clone();
        attributes.push(agent_attribute());

        StartLaunchRq {
            name: portal.launch.clone(),
            description: portal.description.clone(),
            attributes,
            mode: portal.mode,
            rerun: portal.rerun,
            rerun_of: portal.rerun_of.clone(),
            start_time: time::now_unix_millis(),
            id: portal.launch_id.clone(),
        }
    }

    fn start_launch(&mut self) -> ItemId {
        let started = self.client.start_launch(self.launch_request());
        debug!("Started launch {}", started.id);
        self.launch_id = Some(started.id.clone());
        self.track(started.pending);
        started.id
    }

    fn ensure_launch(&mut self) -> ItemId {
        match &self.launch_id {
            Some(id) => id.clone(),
            None => {
                warn!("Test results arrived before the run started, starting launch now");
                self.start_launch()
            }
        }
    }

    /// Keep an operation until run completion; failures only raise the marker
    fn track(&mut self, op: PendingOp) {
        let markers = self.markers.clone();
        self.pending.push(
            async move {
                if let Err(e) = op.await {
                    report_failure(markers.as_ref(), &e);
                }
            }
            .boxed(),
        );
    }

    fn start_item(
        &mut self,
        rq: StartTestItemRq,
        launch_id: &ItemId,
        parent_id: Option<&ItemId>,
    ) -> ItemId {
        let started = self.client.start_test_item(rq, launch_id, parent_id);
        self.track(started.pending);
        started.id
    }

    fn start_suite(&mut self, name: &str, test_path: &Path, duration: u64, launch_id: &ItemId) {
        if self.suite_ids.contains_key(name) {
            return;
        }
        let rq = StartTestItemRq::new(ItemType::Suite, name, duration)
            .with_code_ref(code_ref(test_path, &self.root, name));
        let id = self.start_item(rq, launch_id, None);

        self.suite_ids.insert(name.to_string(), id);
        self.suite_order.push(name.to_string());
    }

    /// Open every describe level below the suite that is not open yet
    fn start_tests(
        &mut self,
        result: &AssertionResult,
        test_path: &Path,
        duration: u64,
        launch_id: &ItemId,
    ) {
        let titles = &result.ancestor_titles;
        for depth in 2..=titles.len() {
            let key = join_titles(&titles[..depth]);
            if self.test_ids.contains_key(&key) {
                continue;
            }

            let parent = self
                .test_ids
                .get(&join_titles(&titles[..depth - 1]))
                .or_else(|| self.suite_ids.get(&titles[0]))
                .cloned();
            let rq = StartTestItemRq::new(ItemType::Test, &titles[depth - 1], duration)
                .with_code_ref(code_ref(test_path, &self.root, &key));
            let id = self.start_item(rq, launch_id, parent.as_ref());

            self.test_ids.insert(key.clone(), id);
            self.test_order.push(key);
        }
    }

    fn start_step(
        &mut self,
        result: &AssertionResult,
        attempt: StepAttempt,
        test_path: &Path,
        launch_id: &ItemId,
    ) {
        let parent = self
            .test_ids
            .get(&full_test_name(result))
            .or_else(|| {
                result
                    .ancestor_titles
                    .first()
                    .and_then(|suite| self.suite_ids.get(suite))
            })
            .cloned();
        let rq = StartTestItemRq::new(ItemType::Step, &result.title, result.duration_ms())
            .with_code_ref(code_ref(test_path, &self.root, &full_step_name(result)))
            .with_retry(attempt.retried);

        let id = self.start_item(rq, launch_id, parent.as_ref());
        self.step_id = Some(id);
    }

    fn finish_step(&mut self, result: &AssertionResult, attempt: StepAttempt) {
        let Some(step_id) = self.step_id.clone() else {
            return;
        };

        if result.status == TestStatus::Failed {
            let attachments = self.step_attachments(result, attempt);
            for (rq, file) in failure_logs(result, attachments) {
                let op = self.client.send_log(&step_id, rq, file);
                self.track(op);
            }
        }

        let rq = finish_request(
            result.status,
            attempt.retried,
            self.config.reporting.skipped_issue,
        );
        let op = self.client.finish_test_item(&step_id, rq);
        self.track(op);
    }

    fn step_attachments(&self, result: &AssertionResult, attempt: StepAttempt) -> Vec<Attachment> {
        let reporting = &self.config.reporting;
        if reporting.disable_upload_attachments {
            return Vec::new();
        }
        match resolve_attachments(
            reporting.artifacts_path.as_deref(),
            &result.full_name,
            attempt.invocation,
        ) {
            Ok(attachments) => attachments,
            Err(e) => {
                report_failure(self.markers.as_ref(), &format!("{:#}", e));
                Vec::new()
            }
        }
    }

    /// Close the tests (deepest first) and suites opened for the batch
    fn finish_open_items(&mut self) {
        for key in std::mem::take(&mut self.test_order).into_iter().rev() {
            if let Some(id) = self.test_ids.remove(&key) {
                let op = self.client.finish_test_item(&id, FinishTestItemRq::derived());
                self.track(op);
            }
        }
        for name in std::mem::take(&mut self.suite_order) {
            if let Some(id) = self.suite_ids.remove(&name) {
                let op = self.client.finish_test_item(&id, FinishTestItemRq::derived());
                self.track(op);
            }
        }
    }

    async fn complete(&mut self) {
        let pending = std::mem::take(&mut self.pending);
        debug!("Waiting for {} reporting operations", pending.len());
        join_all(pending).await;

        if self.config.portal.launch_id.is_some() {
            debug!("Launch was supplied externally, leaving it open");
            return;
        }
        let Some(launch_id) = self.launch_id.take() else {
            return;
        };

        match self
            .client
            .finish_launch(&launch_id, FinishLaunchRq::default())
            .await
        {
            Ok(finished) => {
                if self.config.reporting.log_launch_link
                    && let Some(link) = finished.link
                {
                    report_link(self.markers.as_ref(), &link);
                }
            }
            Err(e) => report_failure(self.markers.as_ref(), &e),
        }
    }
}

impl Reporter for PortalReporter {
    fn on_run_start(&mut self) {
        if self.disabled() || self.launch_id.is_some() {
            return;
        }
        self.start_launch();
    }

    fn on_test_result(&mut self, test_path: &Path, file: &FileResult) {
        if self.disabled() {
            return;
        }
        let launch_id = self.ensure_launch();
        let suite_duration = file.suite_duration();
        let test_duration = file.test_duration();
        let rerun_index = self.config.reporting.rerun_index;

        for result in &file.test_results {
            if let Some(suite) = result.ancestor_titles.first() {
                self.start_suite(suite, test_path, suite_duration, &launch_id);
            }
            if result.ancestor_titles.len() > 1 {
                self.start_tests(result, test_path, test_duration, &launch_id);
            }

            for attempt in plan_attempts(result, rerun_index) {
                self.start_step(result, attempt, test_path, &launch_id);
                self.finish_step(result, attempt);
            }
        }

        self.finish_open_items();
    }

    fn on_run_complete(&mut self) -> BoxFuture<'_, ()> {
        if self.disabled() {
            return futures::future::ready(()).boxed();
        }
        self.complete().boxed()
    }
}
