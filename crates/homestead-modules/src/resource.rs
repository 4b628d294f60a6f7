//! Web resources registered by modules.
//!
//! The registry only maps exact paths to handlers. Serving HTTP, routing and
//! authentication stay with the host.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::error::RegistrationError;
use crate::module::ModuleId;

/// Prefix reserved for the core client-server and federation APIs.
pub const RESERVED_PREFIX: &str = "/_matrix";

/// A request routed to a module resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceRequest {
    /// HTTP method, upper case.
    pub method: String,
    /// Request path.
    pub path: String,
    /// Decoded query parameters.
    #[serde(default)]
    pub query: BTreeMap<String, String>,
    /// JSON body, `Null` when absent.
    #[serde(default)]
    pub body: Value,
}

impl ResourceRequest {
    /// A `GET` request without query or body.
    #[must_use]
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: "GET".to_string(),
            path: path.into(),
            query: BTreeMap::new(),
            body: Value::Null,
        }
    }
}

/// A module resource's answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceResponse {
    /// HTTP status code.
    pub status: u16,
    /// JSON body.
    pub body: Value,
}

impl ResourceResponse {
    /// `200 OK` with a JSON body.
    #[must_use]
    pub fn ok(body: Value) -> Self {
        Self { status: 200, body }
    }

    /// An error status with a Matrix-style error body.
    #[must_use]
    pub fn error(status: u16, errcode: &str, message: &str) -> Self {
        Self {
            status,
            body: serde_json::json!({ "errcode": errcode, "error": message }),
        }
    }

    /// `405 Method Not Allowed`.
    #[must_use]
    pub fn method_not_allowed() -> Self {
        Self::error(405, "M_UNRECOGNIZED", "Method not allowed")
    }
}

/// Handles requests for one registered path.
#[async_trait]
pub trait ResourceHandler: Send + Sync {
    /// Handle a request.
    async fn handle(&self, request: ResourceRequest) -> ResourceResponse;
}

/// A path bound to a handler.
#[derive(Clone)]
pub struct ResourceBinding {
    path: String,
    handler: Arc<dyn ResourceHandler>,
    owner: ModuleId,
}

impl ResourceBinding {
    /// The bound path.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The handler.
    #[must_use]
    pub fn handler(&self) -> Arc<dyn ResourceHandler> {
        Arc::clone(&self.handler)
    }

    /// The module that registered the path.
    #[must_use]
    pub fn owner(&self) -> &ModuleId {
        &self.owner
    }
}

impl fmt::Debug for ResourceBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceBinding")
            .field("path", &self.path)
            .field("owner", &self.owner)
            .finish_non_exhaustive()
    }
}

/// Exact-path map of module resources. The first registration of a path wins.
#[derive(Debug)]
pub struct ResourceRegistry {
    bindings: HashMap<String, ResourceBinding>,
    reserved_prefix: String,
}

impl Default for ResourceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceRegistry {
    /// Create an empty registry reserving [`RESERVED_PREFIX`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_reserved_prefix(RESERVED_PREFIX)
    }

    /// Create an empty registry reserving a custom prefix.
    #[must_use]
    pub fn with_reserved_prefix(prefix: impl Into<String>) -> Self {
        Self {
            bindings: HashMap::new(),
            reserved_prefix: prefix.into(),
        }
    }

    /// Bind `path` to `handler` on behalf of `owner`.
    ///
    /// # Errors
    ///
    /// - [`RegistrationError::InvalidPath`] if `path` does not start with `/`
    /// - [`RegistrationError::ReservedNamespace`] if `path` is the reserved
    ///   prefix or below it
    /// - [`RegistrationError::PathTaken`] if the path is already bound; the
    ///   existing binding is left untouched
    pub fn register(
        &mut self,
        path: impl Into<String>,
        handler: Arc<dyn ResourceHandler>,
        owner: ModuleId,
    ) -> Result<(), RegistrationError> {
        let path = path.into();

        if !path.starts_with('/') {
            warn!(module = %owner, path = %path, "rejected relative resource path");
            return Err(RegistrationError::InvalidPath { path });
        }

        if self.is_reserved(&path) {
            warn!(module = %owner, path = %path, "rejected resource in reserved namespace");
            return Err(RegistrationError::ReservedNamespace {
                path,
                prefix: self.reserved_prefix.clone(),
            });
        }

        if let Some(existing) = self.bindings.get(&path) {
            warn!(
                module = %owner,
                path = %path,
                owner = %existing.owner,
                "rejected resource path already taken"
            );
            return Err(RegistrationError::PathTaken {
                path,
                owner: existing.owner.clone(),
            });
        }

        info!(module = %owner, path = %path, "web resource registered");
        self.bindings.insert(
            path.clone(),
            ResourceBinding {
                path,
                handler,
                owner,
            },
        );
        Ok(())
    }

    /// Whether `path` is the reserved prefix or lies below it.
    #[must_use]
    pub fn is_reserved(&self, path: &str) -> bool {
        path.strip_prefix(self.reserved_prefix.as_str())
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
    }

    /// The handler bound to exactly `path`.
    #[must_use]
    pub fn lookup(&self, path: &str) -> Option<Arc<dyn ResourceHandler>> {
        self.bindings.get(path).map(ResourceBinding::handler)
    }

    /// The module that owns `path`.
    #[must_use]
    pub fn owner_of(&self, path: &str) -> Option<&ModuleId> {
        self.bindings.get(path).map(ResourceBinding::owner)
    }

    /// All bindings, sorted by path.
    #[must_use]
    pub fn bindings(&self) -> Vec<&ResourceBinding> {
        let mut bindings: Vec<&ResourceBinding> = self.bindings.values().collect();
        bindings.sort_unstable_by(|a, b| a.path.cmp(&b.path));
        bindings
    }

    /// All bound paths, sorted.
    #[must_use]
    pub fn paths(&self) -> Vec<&str> {
        self.bindings().into_iter().map(ResourceBinding::path).collect()
    }

    /// Number of bound paths.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Whether nothing is bound.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Unbind every path registered by `owner`.
    ///
    /// Only used while the host is being built, to roll back a module whose
    /// constructor failed.
    pub(crate) fn discard_owner(&mut self, owner: &ModuleId) -> usize {
        let before = self.bindings.len();
        self.bindings.retain(|_, binding| &binding.owner != owner);
        before.saturating_sub(self.bindings.len())
    }
}
