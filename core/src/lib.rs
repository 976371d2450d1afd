//! Client core for the platform's compute, locks, metadata and restrictions
//! services.
//!
//! # Overview
//! Requests are described as plain data (`HttpRequest`) and executed by a
//! host-supplied [`Transport`]. Around that seam the core adds the parts with
//! real state: a shared bearer credential with auto-managed and manual modes,
//! one renew-and-retry on rejection, and cursor pagination across list
//! endpoints.
//!
//! # Design
//! - `CredentialManager` owns the token; `RequestExecutor` injects it and
//!   renews at most once per call.
//! - Resource clients split each operation into `build_*` (produces the
//!   request) and `parse_*` (consumes the response), plus a driving method
//!   that runs the pair through the executor.
//! - Keys are plain strings in the API and base64 on the wire; `key` owns
//!   that mapping.
//! - `get_all_pages` walks cursors strictly in sequence and never caps the
//!   page count.

pub mod client;
pub mod compute;
pub mod config;
pub mod error;
pub mod executor;
pub mod http;
pub mod identity;
pub mod key;
pub mod locks;
pub mod metadata;
pub mod page;
pub mod restrictions;
pub mod types;

mod resource;
#[cfg(test)]
mod testing;

pub use client::PlatformClient;
pub use compute::{ComputeClient, Flight, Formation, FormationPage, PageMeta};
pub use config::Configuration;
pub use error::{ApiError, AuthError, Result, TransportError};
pub use executor::RequestExecutor;
pub use http::{HttpMethod, HttpRequest, HttpResponse, Transport};
pub use identity::{CredentialManager, CredentialMode};
pub use key::Key;
pub use locks::{HeldLock, Lock, LockInfo, LocksClient};
pub use metadata::{KeyValue, MetadataClient};
pub use page::{get_all_pages, Page, PageQuery};
pub use restrictions::{Restriction, RestrictionCursor, RestrictionDetails, RestrictionsClient};
pub use types::{Provider, Region, RestrictedApi, RestrictionState};
