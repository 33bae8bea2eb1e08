use crate::{
	diff::diff_children,
	live::{LiveTree, NodeId},
	load::load_child_nodes,
	patch::apply,
	Error, VNode,
};
use tracing::{info, instrument};

/// Attached to a specific live element during instantiation, this `struct` can be used to update its children.
///
/// It remembers the last rendered child list, so each [`update`](`Root::update`) only applies the difference.
///
/// # Correct Use
///
/// Nothing else may add, move or remove children of `element` in between updates.
/// Attributes and listeners of `element` itself aren't managed here.
#[derive(Debug)]
pub struct Root<T: LiveTree> {
	tree: T,
	element: NodeId,
	current: Vec<VNode>,
}
impl<T: LiveTree> Root<T> {
	/// Starts out assuming `element` is empty.
	#[must_use]
	pub fn new(tree: T, element: NodeId) -> Self {
		Self { tree, element, current: Vec::new() }
	}

	/// Starts out from the children `element` already has, so they can be reused by the first update.
	///
	/// # Errors
	///
	/// Iff reading the live tree fails.
	#[instrument(skip(tree))]
	pub fn adopt(tree: T, element: NodeId) -> Result<Self, Error> {
		let current = load_child_nodes(&tree, element)?;
		info!("Adopted {} existing child node(s).", current.len());
		Ok(Self { tree, element, current })
	}

	/// Reconciles the live children of the root element with `next`.
	///
	/// On error, the patches applied so far stay in place and `next` becomes the current render anyway,
	/// since the previous one's live handles may already have moved.
	///
	/// # Errors
	///
	/// The first error of any patch.
	#[instrument(skip(self, next), fields(next.len = next.len()))]
	pub fn update(&mut self, next: Vec<VNode>) -> Result<(), Error> {
		let patches = diff_children(&self.current, &next);
		let result = apply(&mut self.tree, Some(self.element), &patches, None);
		drop(patches);
		self.current = next;
		result
	}

	#[must_use]
	pub fn element(&self) -> NodeId {
		self.element
	}

	#[must_use]
	pub fn current(&self) -> &[VNode] {
		&self.current
	}

	#[must_use]
	pub fn tree(&self) -> &T {
		&self.tree
	}

	/// Changes made through this reference must not touch the root element's managed children.
	pub fn tree_mut(&mut self) -> &mut T {
		&mut self.tree
	}

	#[must_use]
	pub fn into_tree(self) -> T {
		self.tree
	}
}
