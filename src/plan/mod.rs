// src/plan/mod.rs

//! What the graph is made of.
//!
//! - [`action`] holds the action descriptors and graph nodes.
//! - [`graph`] holds the directed acyclic graph of nodes, built either by
//!   hand or from a validated plan file.

pub mod action;
pub mod graph;

pub use action::{
    Action, ActionKind, ActionNode, Checkout, CreateSource, DEFAULT_QUEUE, InstallSource, NodeId,
    SourceDescriptor,
};
pub use graph::{ActionGraph, ROOT_ID};
