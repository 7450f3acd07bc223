//! Suite orchestration and run reporting.
//!
//! The runner executes a suite's contracts in declared order, records the
//! resource identities they produce for later `depends_on` lookups, and
//! aggregates one [`CaseResult`] per declared contract into a [`RunReport`].
//! Individual failures never abort a run.

use crate::contract::Suite;
use crate::executor::{execute, CaseResult, DependencyValues};
use crate::transport::{HttpTransport, Transport};
use crate::validator::{JsonSchemaValidator, Validator};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::info;
use uuid::Uuid;

/// Execution mode for a suite run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Declared order, one contract at a time.
    Serial,

    /// Independent contracts run concurrently (bounded by worker count);
    /// dependent contracts run afterwards in declared order, once every
    /// identity they can reference has been recorded.
    Parallel,
}

impl RunMode {
    fn label(&self) -> &'static str {
        match self {
            RunMode::Serial => "serial",
            RunMode::Parallel => "parallel",
        }
    }
}

/// Configuration for a suite run.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Per-call timeout handed to the transport.
    pub timeout: Duration,

    /// Maximum concurrent contracts in parallel mode.
    pub workers: usize,

    /// Execution mode.
    pub mode: RunMode,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            workers: 4,
            mode: RunMode::Serial,
        }
    }
}

/// Aggregate report for one suite run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Unique id for this run.
    pub run_id: String,

    /// Name of the executed suite.
    pub suite_name: String,

    /// Deterministic digest of the suite definition.
    pub suite_digest: String,

    /// When the run started.
    pub started_at: DateTime<Utc>,

    /// One result per declared contract, in declared order.
    pub results: Vec<CaseResult>,

    /// Total wall-clock duration in milliseconds.
    pub duration_ms: u64,

    /// Whether every contract passed.
    pub success: bool,
}

impl RunReport {
    /// Number of contracts that passed.
    pub fn passed_count(&self) -> usize {
        self.results.iter().filter(|r| r.passed).count()
    }

    /// Number of contracts that failed.
    pub fn failed_count(&self) -> usize {
        self.results.iter().filter(|r| !r.passed).count()
    }
}

/// Suite runner driving contracts through a transport and validator.
pub struct SuiteRunner {
    transport: Arc<dyn Transport>,
    validator: Arc<dyn Validator>,
    config: RunnerConfig,
}

impl SuiteRunner {
    /// Create a runner over explicit capabilities.
    pub fn new(
        transport: Arc<dyn Transport>,
        validator: Arc<dyn Validator>,
        config: RunnerConfig,
    ) -> Self {
        Self {
            transport,
            validator,
            config,
        }
    }

    /// Create a runner backed by the live HTTP transport and the JSON Schema
    /// validator.
    pub fn with_defaults(config: RunnerConfig) -> Self {
        Self::new(
            Arc::new(HttpTransport::new()),
            Arc::new(JsonSchemaValidator),
            config,
        )
    }

    /// Execute every contract in the suite exactly once.
    ///
    /// The suite is assumed to have passed [`Suite::validate`]; runs always
    /// produce one result per declared contract.
    pub async fn run(&self, suite: &Suite) -> RunReport {
        let run_id = Uuid::new_v4().to_string();
        let started_at = Utc::now();
        let started = Instant::now();

        info!(
            run_id = %run_id,
            suite = %suite.name,
            digest = %suite.digest(),
            mode = self.config.mode.label(),
            contracts = suite.contracts.len(),
            "starting suite run"
        );

        let results = match self.config.mode {
            RunMode::Serial => self.run_serial(suite).await,
            RunMode::Parallel => self.run_parallel(suite).await,
        };

        let duration_ms = started.elapsed().as_millis() as u64;
        let success = results.iter().all(|r| r.passed);

        let report = RunReport {
            run_id,
            suite_name: suite.name.clone(),
            suite_digest: suite.digest(),
            started_at,
            results,
            duration_ms,
            success,
        };

        info!(
            run_id = %report.run_id,
            duration_ms = report.duration_ms,
            passed = report.passed_count(),
            failed = report.failed_count(),
            success = report.success,
            "suite run finished"
        );

        report
    }

    async fn run_serial(&self, suite: &Suite) -> Vec<CaseResult> {
        let mut deps = DependencyValues::new();
        let mut results = Vec::with_capacity(suite.contracts.len());

        for contract in &suite.contracts {
            let outcome = execute(
                contract,
                &suite.base_url,
                &deps,
                self.transport.as_ref(),
                self.validator.as_ref(),
                self.config.timeout,
            )
            .await;

            info!(
                contract = %contract.name,
                passed = outcome.result.passed,
                duration_ms = outcome.result.duration_ms,
                "contract executed"
            );

            if let Some(id) = outcome.resource_id {
                deps.insert(contract.name.clone(), id);
            }
            results.push(outcome.result);
        }

        results
    }

    async fn run_parallel(&self, suite: &Suite) -> Vec<CaseResult> {
        let mut slots: Vec<Option<CaseResult>> = vec![None; suite.contracts.len()];
        let mut deps = DependencyValues::new();

        // Phase one: independent contracts, bounded by the worker count.
        // Every identity they produce is recorded before any dependent starts.
        let semaphore = Arc::new(Semaphore::new(self.config.workers.max(1)));
        let mut tasks = JoinSet::new();

        for (index, contract) in suite.contracts.iter().enumerate() {
            if contract.depends_on.is_some() {
                continue;
            }

            let permit_pool = Arc::clone(&semaphore);
            let transport = Arc::clone(&self.transport);
            let validator = Arc::clone(&self.validator);
            let contract = contract.clone();
            let base_url = suite.base_url.clone();
            let timeout = self.config.timeout;

            tasks.spawn(async move {
                // Semaphore is never closed while tasks run.
                let _permit = permit_pool.acquire_owned().await.ok();
                let outcome = execute(
                    &contract,
                    &base_url,
                    &DependencyValues::new(),
                    transport.as_ref(),
                    validator.as_ref(),
                    timeout,
                )
                .await;
                (index, contract.name, outcome)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            if let Ok((index, name, outcome)) = joined {
                info!(
                    contract = %name,
                    passed = outcome.result.passed,
                    duration_ms = outcome.result.duration_ms,
                    "contract executed"
                );
                if let Some(id) = outcome.resource_id {
                    deps.insert(name, id);
                }
                slots[index] = Some(outcome.result);
            }
        }

        // Phase two: dependent contracts, declared order, sequential.
        for (index, contract) in suite.contracts.iter().enumerate() {
            if contract.depends_on.is_none() {
                continue;
            }

            let outcome = execute(
                contract,
                &suite.base_url,
                &deps,
                self.transport.as_ref(),
                self.validator.as_ref(),
                self.config.timeout,
            )
            .await;

            info!(
                contract = %contract.name,
                passed = outcome.result.passed,
                duration_ms = outcome.result.duration_ms,
                "contract executed"
            );

            if let Some(id) = outcome.resource_id {
                deps.insert(contract.name.clone(), id);
            }
            slots[index] = Some(outcome.result);
        }

        // One result per declared contract, always. A slot can only be empty
        // if a spawned task panicked; report it rather than dropping it.
        slots
            .into_iter()
            .enumerate()
            .map(|(index, slot)| {
                slot.unwrap_or_else(|| CaseResult {
                    contract_name: suite.contracts[index].name.clone(),
                    observed_status: None,
                    duration_ms: 0,
                    passed: false,
                    reason: Some("execution task aborted".to_string()),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::{Contract, HttpMethod};
    use crate::error::TransportError;
    use crate::transport::{TransportRequest, TransportResponse};
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::BTreeMap;

    /// Stub transport that routes on method + path suffix.
    struct ScriptedTransport;

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn request(
            &self,
            req: TransportRequest,
        ) -> Result<TransportResponse, TransportError> {
            let respond = |status: u16, body: serde_json::Value| {
                Ok(TransportResponse {
                    status,
                    headers: BTreeMap::new(),
                    body: serde_json::to_vec(&body).unwrap(),
                })
            };

            match (req.method, req.url.as_str()) {
                (HttpMethod::Post, url) if url.ends_with("/posts") => {
                    respond(201, json!({"id": 101, "title": "New Post"}))
                }
                (HttpMethod::Put, url) if url.ends_with("/posts/101") => {
                    respond(200, json!({"id": 101, "title": "Updated Post"}))
                }
                (HttpMethod::Delete, url) if url.ends_with("/posts/101") => {
                    respond(200, json!({}))
                }
                (HttpMethod::Get, url) if url.ends_with("/posts/1") => {
                    respond(200, json!({"id": 1, "title": "First Post"}))
                }
                _ => respond(404, json!({"error": "not found"})),
            }
        }
    }

    fn crud_suite() -> Suite {
        Suite::new("posts_crud", "https://api.example.com")
            .add_contract(Contract::new("get_post", HttpMethod::Get, "/posts/1", 200))
            .add_contract(
                Contract::new("create_post", HttpMethod::Post, "/posts", 201)
                    .with_body(json!({"title": "New Post"})),
            )
            .add_contract(
                Contract::new("update_post", HttpMethod::Put, "/posts/{id}", 200)
                    .with_body(json!({"title": "Updated Post"}))
                    .with_depends_on("create_post"),
            )
            .add_contract(
                Contract::new("delete_post", HttpMethod::Delete, "/posts/{id}", 200)
                    .with_depends_on("create_post"),
            )
    }

    fn runner(mode: RunMode) -> SuiteRunner {
        SuiteRunner::new(
            Arc::new(ScriptedTransport),
            Arc::new(JsonSchemaValidator),
            RunnerConfig {
                mode,
                ..RunnerConfig::default()
            },
        )
    }

    #[tokio::test]
    async fn test_serial_crud_flow_passes() {
        let suite = crud_suite();
        let report = runner(RunMode::Serial).run(&suite).await;

        assert!(report.success);
        assert_eq!(report.results.len(), suite.contracts.len());
        assert_eq!(report.passed_count(), 4);
        assert_eq!(report.failed_count(), 0);
    }

    #[tokio::test]
    async fn test_parallel_mode_resolves_dependencies() {
        let suite = crud_suite();
        let report = runner(RunMode::Parallel).run(&suite).await;

        assert!(report.success, "results: {:?}", report.results);
        assert_eq!(report.results.len(), suite.contracts.len());
        // Results stay in declared order regardless of completion order.
        let names: Vec<&str> = report
            .results
            .iter()
            .map(|r| r.contract_name.as_str())
            .collect();
        assert_eq!(
            names,
            vec!["get_post", "create_post", "update_post", "delete_post"]
        );
    }

    #[tokio::test]
    async fn test_failure_does_not_abort_run() {
        let suite = Suite::new("mixed", "https://api.example.com")
            .add_contract(Contract::new("missing", HttpMethod::Get, "/nope", 200))
            .add_contract(Contract::new("get_post", HttpMethod::Get, "/posts/1", 200));

        let report = runner(RunMode::Serial).run(&suite).await;

        assert!(!report.success);
        assert_eq!(report.results.len(), 2);
        assert!(!report.results[0].passed);
        assert!(report.results[1].passed);
        assert!(report.results[0]
            .reason
            .as_deref()
            .unwrap()
            .contains("status mismatch"));
    }

    #[tokio::test]
    async fn test_same_suite_twice_is_idempotent() {
        let suite = crud_suite();
        let runner = runner(RunMode::Serial);

        let first = runner.run(&suite).await;
        let second = runner.run(&suite).await;

        let verdicts =
            |report: &RunReport| report.results.iter().map(|r| r.passed).collect::<Vec<_>>();
        assert_eq!(verdicts(&first), verdicts(&second));
        assert_ne!(first.run_id, second.run_id);
        assert_eq!(first.suite_digest, second.suite_digest);
    }
}
