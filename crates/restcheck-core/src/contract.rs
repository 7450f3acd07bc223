//! Contract and suite definitions.
//!
//! A [`Contract`] is the declarative description of one HTTP interaction and
//! its expected outcome. A [`Suite`] is an ordered collection of contracts;
//! declaration order is the execution order, and a contract may reference the
//! resource identity produced by an earlier contract via `depends_on`.

use crate::error::SuiteError;
use jsonschema::Draft;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashSet};
use std::fmt::{self, Display};
use std::path::Path;

/// HTTP methods supported by contracts.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
}

impl HttpMethod {
    /// Whether this method carries a request body in this domain.
    pub fn allows_body(&self) -> bool {
        matches!(self, HttpMethod::Post | HttpMethod::Put | HttpMethod::Patch)
    }
}

impl Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Head => "HEAD",
        };
        write!(f, "{label}")
    }
}

impl From<HttpMethod> for reqwest::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Delete => reqwest::Method::DELETE,
            HttpMethod::Head => reqwest::Method::HEAD,
        }
    }
}

/// A single endpoint contract within a suite.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Contract {
    /// Unique name, used for reporting and dependency references.
    pub name: String,

    /// HTTP method.
    pub method: HttpMethod,

    /// Path template, appended to the suite base URL. May contain an `{id}`
    /// placeholder resolved from the `depends_on` contract's produced identity.
    pub path: String,

    /// Extra request headers.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    /// Request body (JSON). Only valid for methods that carry a body.
    #[serde(default)]
    pub body: Option<serde_json::Value>,

    /// Expected HTTP status code.
    pub expected_status: u16,

    /// Expected response schema (JSON Schema, Draft 2020-12).
    #[serde(default)]
    pub schema: Option<serde_json::Value>,

    /// Field-level expectations: every key/value here must appear in the
    /// response body object.
    #[serde(default)]
    pub expected_body: Option<serde_json::Value>,

    /// Name of an earlier contract whose produced resource identity this
    /// contract substitutes into its path/body.
    #[serde(default)]
    pub depends_on: Option<String>,
}

impl Contract {
    /// Create a new contract with the required fields.
    pub fn new(
        name: impl Into<String>,
        method: HttpMethod,
        path: impl Into<String>,
        expected_status: u16,
    ) -> Self {
        Self {
            name: name.into(),
            method,
            path: path.into(),
            headers: BTreeMap::new(),
            body: None,
            expected_status,
            schema: None,
            expected_body: None,
            depends_on: None,
        }
    }

    /// Attach a request body.
    pub fn with_body(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Attach a response schema.
    pub fn with_schema(mut self, schema: serde_json::Value) -> Self {
        self.schema = Some(schema);
        self
    }

    /// Attach field-level body expectations.
    pub fn with_expected_body(mut self, expected: serde_json::Value) -> Self {
        self.expected_body = Some(expected);
        self
    }

    /// Add a request header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Declare a dependency on an earlier contract's produced identity.
    pub fn with_depends_on(mut self, dependency: impl Into<String>) -> Self {
        self.depends_on = Some(dependency.into());
        self
    }
}

fn default_version() -> String {
    "1.0.0".to_string()
}

/// An ordered collection of contracts executed together.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Suite {
    /// Suite name, used for reporting.
    pub name: String,

    /// Version string for the suite definition.
    #[serde(default = "default_version")]
    pub version: String,

    /// Base URL the contract paths are appended to.
    pub base_url: String,

    /// Contracts in declared execution order.
    pub contracts: Vec<Contract>,
}

impl Suite {
    /// Create an empty suite.
    pub fn new(name: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: default_version(),
            base_url: base_url.into(),
            contracts: Vec::new(),
        }
    }

    /// Append a contract.
    pub fn add_contract(mut self, contract: Contract) -> Self {
        self.contracts.push(contract);
        self
    }

    /// Parse and validate a suite from a JSON document.
    pub fn from_json(input: &str) -> Result<Self, SuiteError> {
        let suite: Suite = serde_json::from_str(input)?;
        suite.validate()?;
        Ok(suite)
    }

    /// Load and validate a suite from a file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SuiteError> {
        let input = std::fs::read_to_string(path)?;
        Self::from_json(&input)
    }

    /// SHA-256 hex digest of ordered contract names (deterministic).
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        for contract in &self.contracts {
            hasher.update(contract.name.as_bytes());
            hasher.update(b"\0");
        }
        hex::encode(hasher.finalize())
    }

    /// Check the static shape constraints of the suite.
    ///
    /// Any violation is fatal: the suite must not execute a single contract
    /// when one of them is malformed.
    pub fn validate(&self) -> Result<(), SuiteError> {
        if self.contracts.is_empty() {
            return Err(SuiteError::EmptySuite);
        }

        url::Url::parse(&self.base_url).map_err(|err| SuiteError::InvalidBaseUrl {
            url: self.base_url.clone(),
            reason: err.to_string(),
        })?;

        let mut seen: HashSet<&str> = HashSet::new();
        for contract in &self.contracts {
            if contract.name.trim().is_empty() {
                return Err(SuiteError::MalformedContract {
                    name: "<unnamed>".to_string(),
                    reason: "contract name must not be empty".to_string(),
                });
            }

            if let Some(dependency) = &contract.depends_on {
                // Declared order is execution order: a dependency must
                // already have run, so it must appear earlier in the suite.
                // `seen` holds only earlier contracts here, which also
                // rejects a contract depending on itself.
                if !seen.contains(dependency.as_str()) {
                    return Err(SuiteError::MalformedContract {
                        name: contract.name.clone(),
                        reason: format!(
                            "depends_on `{dependency}` does not name an earlier contract"
                        ),
                    });
                }
            }

            if !seen.insert(contract.name.as_str()) {
                return Err(SuiteError::MalformedContract {
                    name: contract.name.clone(),
                    reason: "duplicate contract name".to_string(),
                });
            }

            if !(100..=599).contains(&contract.expected_status) {
                return Err(SuiteError::MalformedContract {
                    name: contract.name.clone(),
                    reason: format!(
                        "expected status {} is not a valid HTTP status",
                        contract.expected_status
                    ),
                });
            }

            if contract.body.is_some() && !contract.method.allows_body() {
                return Err(SuiteError::MalformedContract {
                    name: contract.name.clone(),
                    reason: format!("{} contracts must not carry a body", contract.method),
                });
            }

            if let Some(schema) = &contract.schema {
                jsonschema::options()
                    .with_draft(Draft::Draft202012)
                    .build(schema)
                    .map_err(|err| SuiteError::InvalidSchema {
                        name: contract.name.clone(),
                        reason: err.to_string(),
                    })?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn post_schema() -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "id": {"type": "integer"},
                "title": {"type": "string"},
                "body": {"type": "string"},
                "userId": {"type": "integer"}
            },
            "required": ["id", "title", "body", "userId"]
        })
    }

    fn crud_suite() -> Suite {
        Suite::new("posts_crud", "https://api.example.com")
            .add_contract(
                Contract::new("create_post", HttpMethod::Post, "/posts", 201)
                    .with_body(json!({"title": "New Post", "body": "text", "userId": 1}))
                    .with_schema(post_schema()),
            )
            .add_contract(
                Contract::new("update_post", HttpMethod::Put, "/posts/{id}", 200)
                    .with_body(json!({"title": "Updated Post", "body": "text", "userId": 1}))
                    .with_depends_on("create_post"),
            )
            .add_contract(
                Contract::new("delete_post", HttpMethod::Delete, "/posts/{id}", 200)
                    .with_depends_on("create_post"),
            )
    }

    #[test]
    fn test_valid_suite_passes_validation() {
        crud_suite().validate().expect("suite should be valid");
    }

    #[test]
    fn test_suite_serde_roundtrip() {
        let suite = crud_suite();
        let json = serde_json::to_string(&suite).expect("serialize");
        let deserialized = Suite::from_json(&json).expect("deserialize");
        assert_eq!(suite, deserialized);
    }

    #[test]
    fn test_empty_suite_rejected() {
        let suite = Suite::new("empty", "https://api.example.com");
        assert!(matches!(suite.validate(), Err(SuiteError::EmptySuite)));
    }

    #[test]
    fn test_invalid_base_url_rejected() {
        let suite = Suite::new("bad", "not a url")
            .add_contract(Contract::new("get_post", HttpMethod::Get, "/posts/1", 200));
        let err = suite.validate().unwrap_err();
        assert!(matches!(err, SuiteError::InvalidBaseUrl { .. }));
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let suite = Suite::new("dupes", "https://api.example.com")
            .add_contract(Contract::new("get_post", HttpMethod::Get, "/posts/1", 200))
            .add_contract(Contract::new("get_post", HttpMethod::Get, "/posts/2", 200));
        let err = suite.validate().unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn test_body_on_get_rejected() {
        let suite = Suite::new("bad", "https://api.example.com").add_contract(
            Contract::new("get_post", HttpMethod::Get, "/posts/1", 200)
                .with_body(json!({"x": 1})),
        );
        let err = suite.validate().unwrap_err();
        assert!(err.to_string().contains("must not carry a body"));
    }

    #[test]
    fn test_invalid_status_rejected() {
        let suite = Suite::new("bad", "https://api.example.com")
            .add_contract(Contract::new("get_post", HttpMethod::Get, "/posts/1", 999));
        let err = suite.validate().unwrap_err();
        assert!(err.to_string().contains("999"));
    }

    #[test]
    fn test_forward_dependency_rejected() {
        let suite = Suite::new("bad", "https://api.example.com")
            .add_contract(
                Contract::new("update_post", HttpMethod::Put, "/posts/{id}", 200)
                    .with_body(json!({"title": "x"}))
                    .with_depends_on("create_post"),
            )
            .add_contract(
                Contract::new("create_post", HttpMethod::Post, "/posts", 201)
                    .with_body(json!({"title": "x"})),
            );
        let err = suite.validate().unwrap_err();
        assert!(err.to_string().contains("create_post"));
    }

    #[test]
    fn test_self_dependency_rejected() {
        let suite = Suite::new("bad", "https://api.example.com")
            .add_contract(
                Contract::new("create_post", HttpMethod::Post, "/posts", 201)
                    .with_body(json!({"title": "x"})),
            )
            .add_contract(
                Contract::new("update_post", HttpMethod::Put, "/posts/{id}", 200)
                    .with_body(json!({"title": "x"}))
                    .with_depends_on("update_post"),
            );
        let err = suite.validate().unwrap_err();
        assert!(matches!(err, SuiteError::MalformedContract { .. }));
        assert!(err.to_string().contains("update_post"));
    }

    #[test]
    fn test_unknown_dependency_rejected() {
        let suite = Suite::new("bad", "https://api.example.com").add_contract(
            Contract::new("delete_post", HttpMethod::Delete, "/posts/{id}", 200)
                .with_depends_on("nope"),
        );
        let err = suite.validate().unwrap_err();
        assert!(err.to_string().contains("nope"));
    }

    #[test]
    fn test_invalid_schema_rejected() {
        let suite = Suite::new("bad", "https://api.example.com").add_contract(
            Contract::new("get_post", HttpMethod::Get, "/posts/1", 200)
                .with_schema(json!({"type": "not-a-type"})),
        );
        let err = suite.validate().unwrap_err();
        assert!(matches!(err, SuiteError::InvalidSchema { .. }));
    }

    #[test]
    fn test_digest_deterministic_and_order_sensitive() {
        let a = crud_suite();
        let b = crud_suite();
        assert_eq!(a.digest(), b.digest());

        let reordered = Suite::new("posts_crud", "https://api.example.com")
            .add_contract(Contract::new("b", HttpMethod::Get, "/b", 200))
            .add_contract(Contract::new("a", HttpMethod::Get, "/a", 200));
        let forward = Suite::new("posts_crud", "https://api.example.com")
            .add_contract(Contract::new("a", HttpMethod::Get, "/a", 200))
            .add_contract(Contract::new("b", HttpMethod::Get, "/b", 200));
        assert_ne!(reordered.digest(), forward.digest());
    }

    #[test]
    fn test_method_display_and_body_rules() {
        assert_eq!(HttpMethod::Get.to_string(), "GET");
        assert_eq!(HttpMethod::Delete.to_string(), "DELETE");
        assert!(HttpMethod::Post.allows_body());
        assert!(HttpMethod::Put.allows_body());
        assert!(!HttpMethod::Get.allows_body());
        assert!(!HttpMethod::Delete.allows_body());
        assert!(!HttpMethod::Head.allows_body());
    }

    #[test]
    fn test_from_json_defaults() {
        let input = r#"{
            "name": "minimal",
            "base_url": "https://api.example.com",
            "contracts": [
                {"name": "get_post", "method": "GET", "path": "/posts/1", "expected_status": 200}
            ]
        }"#;
        let suite = Suite::from_json(input).expect("parse");
        assert_eq!(suite.version, "1.0.0");
        assert!(suite.contracts[0].headers.is_empty());
        assert!(suite.contracts[0].body.is_none());
        assert!(suite.contracts[0].depends_on.is_none());
    }
}
