//! apiconform-runner: API document resolution and endpoint verification
//!
//! Resolves a Swagger 2 / OpenAPI 3 document into `$ref`-free, nullable-normalized
//! schemas, calls the API over a shared blocking HTTP session, checks each
//! response against status, JSON:API envelope and schema, then applies the
//! business assertions of the fixed test catalog.

pub mod driver;
pub mod locate;
pub mod session;
pub mod spec;
pub mod verify;

pub use driver::{Driver, RunContext, RunOptions, TestFilter};
pub use locate::{LocateError, find_schema};
pub use session::{Session, SessionError};
pub use spec::{ApiDocument, Dialect, ResolveError, ResourceSchema, ValidationStrategy, resolve};
pub use verify::{
    CallWarning, EndpointCall, EndpointCallResult, Payload, QueryParams, VerifyError,
    VerifyErrorKind, verify,
};
