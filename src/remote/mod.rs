//! The platform's object/attribute API, as the uploader sees it.
//!
//! The uploader only needs resolve/exists/set_many, so that surface is a
//! set of traits with the HTTP client behind them. Tests substitute an
//! in-memory remote.

pub mod http;

use anyhow::Result;
use std::collections::BTreeMap;

pub use http::XnatClient;

/// A connected session against the platform, scoped to one run.
pub trait Remote {
    type Subject: SubjectResource;

    /// Resolve a subject by project and label. Resolution is cheap; whether
    /// the subject actually exists is a separate `exists` call.
    fn subject(&self, project: &str, label: &str) -> Result<Self::Subject>;
}

/// A subject record on the platform.
pub trait SubjectResource {
    type Experiment: ExperimentResource;

    fn exists(&self) -> Result<bool>;

    /// Set every attribute in `attrs` (field path → value) in one request.
    fn set_many(&self, attrs: &BTreeMap<String, String>) -> Result<()>;

    fn experiment(&self, label: &str) -> Result<Self::Experiment>;
}

/// An imaging session nested under a subject.
pub trait ExperimentResource {
    fn exists(&self) -> Result<bool>;

    /// The experiment's xsi type, needed to address session-level fields.
    fn xsi_type(&self) -> Result<String>;

    fn set_many(&self, attrs: &BTreeMap<String, String>) -> Result<()>;
}
