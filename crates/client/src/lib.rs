//! Client-side session, authorization, and data-consistency layer for the
//! LabRec clinical record service.
//!
//! - [`credentials`]: durable single-owner store for the bearer token
//! - [`session`]: login/registration/logout and the derived session view
//! - [`gateway`]: authorized request wrapper with the failure taxonomy
//! - [`registry`]: paginated, searchable, editable collection controller
//! - [`dashboard`]: aggregate counts
//!
//! The rendering layer on top (views, routing) is out of scope; everything
//! here is UI-agnostic state and wire plumbing.

pub mod config;
pub mod credentials;
pub mod dashboard;
pub mod error;
pub mod gateway;
pub mod registry;
pub mod session;

pub use config::{ClientConfig, DEFAULT_SERVER_URL};
pub use credentials::CredentialStore;
pub use dashboard::{DashboardSummary, fetch_summary};
pub use error::{Error, ErrorBody, Result};
pub use gateway::{Envelope, Gateway};
pub use registry::{ReferenceRangeRegistry, ReferenceRanges, Registry, Resource};
pub use session::SessionManager;
