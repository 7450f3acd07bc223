//! Contract execution and result recording.
//!
//! The executor runs one contract against a transport, measures wall-clock
//! duration, and folds every per-contract failure (status mismatch, schema
//! violation, transport error, missing dependency) into a [`CaseResult`].
//! Nothing here aborts a run.

use crate::contract::Contract;
use crate::transport::{Transport, TransportRequest, TransportResponse};
use crate::validator::Validator;
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

/// Outcome record of executing one contract. Immutable once produced;
/// exactly one per execution attempt.
#[derive(Debug, Clone, serde::Serialize)]
pub struct CaseResult {
    /// Name of the executed contract.
    pub contract_name: String,

    /// Observed HTTP status. Absent when the transport itself failed.
    pub observed_status: Option<u16>,

    /// Wall-clock duration of the exchange in milliseconds.
    pub duration_ms: u64,

    /// Whether every expectation held.
    pub passed: bool,

    /// Failure reason (absent on pass).
    pub reason: Option<String>,
}

impl CaseResult {
    fn pass(contract_name: &str, status: u16, duration_ms: u64) -> Self {
        Self {
            contract_name: contract_name.to_string(),
            observed_status: Some(status),
            duration_ms,
            passed: true,
            reason: None,
        }
    }

    fn fail(
        contract_name: &str,
        status: Option<u16>,
        duration_ms: u64,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            contract_name: contract_name.to_string(),
            observed_status: status,
            duration_ms,
            passed: false,
            reason: Some(reason.into()),
        }
    }
}

/// Result of one execution plus the resource identity it produced, if any.
#[derive(Debug, Clone)]
pub struct ExecutionOutcome {
    pub result: CaseResult,
    /// Value of the `id` field of a passing JSON-object response, recorded
    /// under the contract's name for later `depends_on` lookups.
    pub resource_id: Option<Value>,
}

impl ExecutionOutcome {
    fn failed(result: CaseResult) -> Self {
        Self {
            result,
            resource_id: None,
        }
    }
}

/// Read-only map of resource identities produced by earlier contracts,
/// keyed by contract name.
pub type DependencyValues = BTreeMap<String, Value>;

/// Execute a single contract against the transport.
///
/// Stateless and referentially transparent per invocation; the only side
/// effect is the network call itself.
pub async fn execute(
    contract: &Contract,
    base_url: &str,
    deps: &DependencyValues,
    transport: &dyn Transport,
    validator: &dyn Validator,
    timeout: Duration,
) -> ExecutionOutcome {
    // Resolve the dependency identity before touching the network.
    let dep_id = match &contract.depends_on {
        Some(dependency) => match deps.get(dependency) {
            Some(id) => Some(render_id(id)),
            None => {
                return ExecutionOutcome::failed(CaseResult::fail(
                    &contract.name,
                    None,
                    0,
                    format!("missing dependency: `{dependency}` produced no resource id"),
                ));
            }
        },
        None => None,
    };

    let path = match &dep_id {
        Some(id) => contract.path.replace("{id}", id),
        None => contract.path.clone(),
    };
    let body = contract
        .body
        .as_ref()
        .map(|body| substitute_strings(body, dep_id.as_deref()));

    let request = TransportRequest {
        method: contract.method,
        url: join_url(base_url, &path),
        headers: contract.headers.clone(),
        body,
        timeout,
    };

    let started = Instant::now();
    let response = transport.request(request).await;
    let duration_ms = started.elapsed().as_millis() as u64;

    let response = match response {
        Ok(response) => response,
        Err(err) => {
            return ExecutionOutcome::failed(CaseResult::fail(
                &contract.name,
                None,
                duration_ms,
                format!("transport error: {err}"),
            ));
        }
    };

    if let Some(reason) = check_expectations(contract, &response, validator) {
        return ExecutionOutcome::failed(CaseResult::fail(
            &contract.name,
            Some(response.status),
            duration_ms,
            reason,
        ));
    }

    let resource_id = response
        .json()
        .and_then(|value| value.get("id").cloned());

    ExecutionOutcome {
        result: CaseResult::pass(&contract.name, response.status, duration_ms),
        resource_id,
    }
}

/// Compare the response against the contract's expectations, returning the
/// first failure reason.
fn check_expectations(
    contract: &Contract,
    response: &TransportResponse,
    validator: &dyn Validator,
) -> Option<String> {
    if response.status != contract.expected_status {
        return Some(format!(
            "status mismatch: expected {} got {}",
            contract.expected_status, response.status
        ));
    }

    if let Some(schema) = &contract.schema {
        let Some(body) = response.json() else {
            return Some("schema violation: response body is not valid JSON".to_string());
        };
        if let Err(err) = validator.validate(&body, schema) {
            return Some(format!("schema violation: {err}"));
        }
    }

    if let Some(expected) = &contract.expected_body {
        if let Some(reason) = check_body_subset(expected, response) {
            return Some(reason);
        }
    }

    None
}

/// Subset match: every key/value in `expected` must appear in the response
/// body object.
fn check_body_subset(expected: &Value, response: &TransportResponse) -> Option<String> {
    let Some(body) = response.json() else {
        return Some("body mismatch: response body is not valid JSON".to_string());
    };
    let (Some(expected), Some(body)) = (expected.as_object(), body.as_object()) else {
        return Some("body mismatch: response body is not a JSON object".to_string());
    };

    for (field, want) in expected {
        match body.get(field) {
            Some(got) if got == want => {}
            Some(got) => {
                return Some(format!(
                    "body mismatch: field `{field}` expected {want} got {got}"
                ));
            }
            None => {
                return Some(format!("body mismatch: field `{field}` is missing"));
            }
        }
    }

    None
}

/// Render a produced identity for path/body substitution.
fn render_id(id: &Value) -> String {
    match id {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Replace `{id}` in every string value of a JSON document.
fn substitute_strings(value: &Value, dep_id: Option<&str>) -> Value {
    let Some(id) = dep_id else {
        return value.clone();
    };
    match value {
        Value::String(s) => Value::String(s.replace("{id}", id)),
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| substitute_strings(item, dep_id))
                .collect(),
        ),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), substitute_strings(v, dep_id)))
                .collect(),
        ),
        other => other.clone(),
    }
}

fn join_url(base_url: &str, path: &str) -> String {
    let base = base_url.trim_end_matches('/');
    if path.starts_with('/') {
        format!("{base}{path}")
    } else {
        format!("{base}/{path}")
    }
}
