use crate::live::NodeId;
use thiserror::Error;

/// Failures surfaced while materializing or applying patches.
///
/// Diffing itself is infallible. Errors from [`LiveTree`](`crate::live::LiveTree`) primitives
/// propagate unmodified, and patches that were already applied stay applied.
#[derive(Debug, Error)]
pub enum Error {
	#[error("unknown live node {0:?}")]
	UnknownNode(NodeId),

	#[error("live node {0:?} is not an element")]
	NotAnElement(NodeId),

	#[error("live node {0:?} cannot have children")]
	NotAContainer(NodeId),

	#[error("virtual node has no live handle; it was never materialized or its handle was moved")]
	Unmaterialized,

	#[error("patch requires a parent live node, but none was given")]
	MissingParent,

	#[error("DOM operation failed: {0}")]
	Dom(String),

	#[error("component failed: {0}")]
	Component(String),
}
