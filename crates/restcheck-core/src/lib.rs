//! restcheck core library
//!
//! A declarative HTTP contract-test engine:
//! - Loads endpoint contracts (method, path, payload, expected status,
//!   response schema) from a suite file
//! - Executes them against a live service through an injected transport
//! - Collects pass/fail/timing results into an aggregate run report

pub mod contract;
pub mod error;
pub mod executor;
pub mod runner;
pub mod telemetry;
pub mod transport;
pub mod validator;

// Re-export key types
pub use contract::{Contract, HttpMethod, Suite};
pub use error::{SuiteError, TransportError, ValidationError};
pub use executor::{execute, CaseResult, DependencyValues, ExecutionOutcome};
pub use runner::{RunMode, RunReport, RunnerConfig, SuiteRunner};
pub use telemetry::init_tracing;
pub use transport::{HttpTransport, Transport, TransportRequest, TransportResponse};
pub use validator::{JsonSchemaValidator, Validator};
