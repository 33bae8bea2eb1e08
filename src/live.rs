//! The live tree: the mutable UI structure that virtual trees are rendered into.
//!
//! The reconciler never touches live nodes directly. It goes through [`LiveTree`], which owns a
//! table of live nodes and hands out [`NodeId`] slots into it.

use crate::{
	vnode::{AttrValue, Listener},
	Error,
};
use core::{
	convert::TryInto,
	fmt::{self, Debug, Formatter},
};

/// An index into a [`LiveTree`]'s node table.
///
/// Ids are only meaningful for the tree that issued them.
/// Ids in a subtree discarded by [`LiveTree::remove`] may be reused, but not before the next [`LiveTree::settle`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);
impl NodeId {
	/// # Panics
	///
	/// Iff `index` doesn't fit into a [`u32`].
	#[must_use]
	pub fn new(index: usize) -> Self {
		Self(index.try_into().expect("Too many live nodes (more than 4G)."))
	}

	#[must_use]
	pub fn index(self) -> usize {
		self.0 as usize
	}
}
impl Debug for NodeId {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		write!(f, "#{}", self.0)
	}
}

/// A read-back of one live node, as far as [`load`](`crate::load`) needs it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LiveNode {
	Text(String),
	Element {
		tag: String,
		/// In the order the live tree reports them.
		attributes: Vec<(String, String)>,
	},
}

/// Primitive operations on a live tree.
///
/// Implementations are assumed to be correct; the reconciler calls these and nothing else.
/// Any error returned here is passed through to the caller of [`apply`](`crate::patch::apply`) as-is.
pub trait LiveTree {
	fn create_text(&mut self, text: &str) -> Result<NodeId, Error>;
	fn create_element(&mut self, tag: &str) -> Result<NodeId, Error>;

	fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) -> Result<(), Error>;
	fn remove_attribute(&mut self, node: NodeId, name: &str) -> Result<(), Error>;

	/// Mirrors an attribute as state on the underlying object, e.g. an input's `value`.
	fn set_property(&mut self, node: NodeId, name: &str, value: &AttrValue) -> Result<(), Error>;
	fn clear_property(&mut self, node: NodeId, name: &str) -> Result<(), Error>;

	fn set_style_property(&mut self, node: NodeId, property: &str, value: &str) -> Result<(), Error>;
	fn remove_style_property(&mut self, node: NodeId, property: &str) -> Result<(), Error>;

	/// Inserts `node` into `parent` before `reference`, or at the end if `reference` is [`None`].
	///
	/// If `node` is currently attached elsewhere, it is moved.
	fn insert_before(&mut self, parent: NodeId, node: NodeId, reference: Option<NodeId>) -> Result<(), Error>;

	/// Unparents `node` but keeps it (and its subtree) alive for reinsertion.
	fn detach(&mut self, node: NodeId) -> Result<(), Error>;

	/// Unparents `node` and discards it along with its subtree.
	fn remove(&mut self, node: NodeId) -> Result<(), Error>;

	fn add_listener(&mut self, node: NodeId, event: &str, listener: &Listener) -> Result<(), Error>;
	fn remove_listener(&mut self, node: NodeId, event: &str, listener: &Listener) -> Result<(), Error>;

	fn focused(&self) -> Option<NodeId>;
	fn focus(&mut self, node: NodeId) -> Result<(), Error>;

	fn child_count(&self, parent: NodeId) -> Result<usize, Error>;
	fn child_at(&self, parent: NodeId, index: usize) -> Result<Option<NodeId>, Error>;

	fn describe(&self, node: NodeId) -> Result<LiveNode, Error>;

	/// Called once after each top-level [`apply`](`crate::patch::apply`), on success or failure.
	fn settle(&mut self) {}
}

/// Finds the current index of `node` among `parent`'s children.
pub(crate) fn index_of(tree: &dyn LiveTree, parent: NodeId, node: NodeId) -> Result<Option<usize>, Error> {
	for i in 0..tree.child_count(parent)? {
		if tree.child_at(parent, i)? == Some(node) {
			return Ok(Some(i));
		}
	}
	Ok(None)
}

/// Inserts `node` so that it ends up at `position` in `parent`, or appends it.
pub(crate) fn insert_at(tree: &mut dyn LiveTree, parent: NodeId, node: NodeId, position: Option<usize>) -> Result<(), Error> {
	let reference = match position {
		Some(position) => tree.child_at(parent, position)?,
		None => None,
	};
	tree.insert_before(parent, node, reference)
}
