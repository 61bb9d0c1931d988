//! Opaque layer handles.
//!
//! The core never owns layer objects; it holds cheap handles supplied by
//! the surrounding data-type subsystem and only queries identity, a
//! display name, and a kind tag. Predicates over layers are supplied by
//! callers as closures over `&dyn Layer`.

use std::fmt;
use std::sync::Arc;

/// A data layer as seen by the group graph.
///
/// Implementations live with the external data-type subsystem; the core
/// only relies on this narrow surface.
pub trait Layer: fmt::Debug + Send + Sync {
    /// Globally unique layer identifier.
    fn id(&self) -> &str;

    /// Human-readable name shown in display trees.
    fn display_name(&self) -> &str;

    /// Free-form kind tag ("raster", "vector", "heatmap", ...), used by
    /// layer categorizers.
    fn kind(&self) -> &str;
}

/// Shared handle to a layer.
///
/// Groups hold these as owned associations; the layer object itself is
/// owned elsewhere. Identity is the layer id.
pub type MemberRef = Arc<dyn Layer>;

/// Check whether two member handles refer to the same layer.
pub fn same_layer(a: &dyn Layer, b: &dyn Layer) -> bool {
    a.id() == b.id()
}

/// A plain, self-contained layer implementation.
///
/// Used by catalogs, the CLI, and tests; real deployments pass handles
/// to their own layer objects instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticLayer {
    id: String,
    display_name: String,
    kind: String,
}

impl StaticLayer {
    /// Create a new static layer handle.
    pub fn new(
        id: impl Into<String>,
        display_name: impl Into<String>,
        kind: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            kind: kind.into(),
        }
    }

    /// Wrap into a shared member handle.
    pub fn into_member(self) -> MemberRef {
        Arc::new(self)
    }
}

impl Layer for StaticLayer {
    fn id(&self) -> &str {
        &self.id
    }

    fn display_name(&self) -> &str {
        &self.display_name
    }

    fn kind(&self) -> &str {
        &self.kind
    }
}
