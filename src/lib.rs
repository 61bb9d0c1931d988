//! Strata - layer-group management engine for geospatial visualization.
//!
//! Strata manages a hierarchy of "data groups" (folders of data layers):
//! grouping, searching, categorizing, and activating/deactivating layers,
//! where activation triggers expensive, fallible, interruptible work that
//! must be coordinated safely across many groups at once.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                           Callers                               │
//! │     structural mutation │ activation requests │ tree queries    │
//! └─────────────────────────────────────────────────────────────────┘
//!                                  │
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        GroupNode graph                          │
//! │   per-node RwLock │ weak parent links │ members │ listeners     │
//! └─────────────────────────────────────────────────────────────────┘
//!            │                     │                     │
//! ┌────────────────────┐ ┌──────────────────┐ ┌────────────────────┐
//! │    KeyRegistry     │ │    Activator     │ │    TreeBuilder     │
//! │  weak id lookup    │ │ protocol fan-out │ │ categorize/flatten │
//! │  lazy + swept      │ │ shared cancel    │ │ snapshot display   │
//! └────────────────────┘ └──────────────────┘ └────────────────────┘
//! ```
//!
//! # Module Organization
//!
//! ## Core
//! - [`core::config`] - Configuration parsing and validation
//! - [`core::runtime`] - Component lifecycle wiring
//! - [`core::cancel`] - Cooperative cancellation tokens
//! - [`core::error`] - Error taxonomy
//!
//! ## Group graph
//! - [`group::node`] - The group tree entity and structural operations
//! - [`group::member`] - Opaque layer handles
//! - [`group::listener`] - Structural event listeners
//! - [`group::registry`] - Weak id → group lookup
//!
//! ## Activation
//! - [`activation::protocol`] - Per-group activation state machine
//! - [`activation::activator`] - Single and batch activation orchestration
//! - [`activation::effect`] - Side-effect and message-sink collaborator traits
//!
//! ## Display trees
//! - [`tree::builder`] - Categorized, filtered, flattened tree derivation
//! - [`tree::display`] - Display tree output model
//!
//! ## Catalogs
//! - [`catalog`] - TOML group-tree manifests
//!
//! ## CLI
//! - [`cli::commands`] - CLI command implementations
//!
//! # Key Invariants
//!
//! - The parent/child relation is a forest: no node is its own ancestor,
//!   and cycle-creating mutations are rejected before any state changes.
//! - Root nodes never acquire a parent.
//! - Activation never leaves a group in a transient state once a request
//!   returns: every transition commits or rolls back.
//! - Read traversals of the group graph return snapshots, never live
//!   views, so callers never observe concurrent mutation mid-iteration.

pub mod activation;
pub mod catalog;
pub mod cli;
pub mod core;
pub mod group;
pub mod tree;

pub use crate::activation::activator::{ActivationStats, Activator};
pub use crate::activation::effect::{ActivationEffect, MessageSink};
pub use crate::activation::protocol::{ActivationProtocol, ActivationState};
pub use crate::core::cancel::CancelToken;
pub use crate::core::error::{StrataError, StrataResult};
pub use crate::group::member::{Layer, MemberRef};
pub use crate::group::node::{GroupFlags, GroupNode};
pub use crate::group::registry::KeyRegistry;
pub use crate::tree::builder::TreeBuilder;
pub use crate::tree::display::{DisplayKind, DisplayNode, DisplayTree};
