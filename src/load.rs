//! Reading existing live nodes back into virtual nodes, live handles included,
//! so that markup that's already there can be reconciled instead of rebuilt.
//!
//! Listeners can't be read back, so loaded nodes have none.

use crate::{
	live::{LiveNode, LiveTree, NodeId},
	vnode::{AttrValue, VNode},
	Error,
};
use tracing::instrument;

/// # Errors
///
/// Iff a [`LiveTree`] read fails.
#[instrument(skip(tree))]
pub fn load_child_nodes(tree: &dyn LiveTree, parent: NodeId) -> Result<Vec<VNode>, Error> {
	(0..tree.child_count(parent)?)
		.map(|i| match tree.child_at(parent, i)? {
			Some(child) => load_node(tree, child),
			None => Err(Error::NotAContainer(parent)),
		})
		.collect()
}

/// # Errors
///
/// Iff a [`LiveTree`] read fails.
pub fn load_node(tree: &dyn LiveTree, node: NodeId) -> Result<VNode, Error> {
	let loaded = match tree.describe(node)? {
		LiveNode::Text(text) => VNode::text(text),
		LiveNode::Element { tag, attributes } => load_element(tree, node, tag, attributes)?,
	};
	loaded.set_live(node);
	Ok(loaded)
}

fn load_element(tree: &dyn LiveTree, node: NodeId, tag: String, attributes: Vec<(String, String)>) -> Result<VNode, Error> {
	let mut element = VNode::element(tag);
	element.attributes = load_attributes(attributes);
	element.children = load_child_nodes(tree, node)?;
	Ok(element)
}

/// A `style` attribute loads as plain string.
fn load_attributes(attributes: Vec<(String, String)>) -> crate::vnode::Attributes {
	attributes.into_iter().map(|(name, value)| (name.into(), AttrValue::Str(value.into()))).collect()
}
