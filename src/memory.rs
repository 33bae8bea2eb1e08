//! A headless [`LiveTree`] kept entirely in memory.
//!
//! Everything written to it can be read back, which makes it the backend of choice for tests
//! and for rendering outside of a browser.

use crate::{
	live::{LiveNode, LiveTree, NodeId},
	vnode::{AttrValue, Listener},
	Error,
};
use core::{any::Any, fmt::Write as _};
use std::collections::BTreeMap;
use tracing::trace;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemoryKind {
	Element(String),
	Text(String),
}

#[derive(Debug, Clone)]
pub struct MemoryNode {
	pub kind: MemoryKind,
	pub attributes: BTreeMap<String, String>,
	pub properties: BTreeMap<String, AttrValue>,
	pub style: BTreeMap<String, String>,
	pub listeners: Vec<(String, Listener)>,
	pub parent: Option<NodeId>,
	pub children: Vec<NodeId>,
}
impl MemoryNode {
	fn new(kind: MemoryKind) -> Self {
		Self {
			kind,
			attributes: BTreeMap::new(),
			properties: BTreeMap::new(),
			style: BTreeMap::new(),
			listeners: Vec::new(),
			parent: None,
			children: Vec::new(),
		}
	}
}

/// An arena of [`MemoryNode`]s with a root element and browser-like focus.
///
/// Ids are never reused, so a removed node stays recognizably gone.
/// Detaching the focused node or one of its ancestors blurs it.
#[derive(Debug)]
pub struct MemoryTree {
	nodes: Vec<Option<MemoryNode>>,
	root: NodeId,
	focused: Option<NodeId>,
	created: usize,
}
impl Default for MemoryTree {
	fn default() -> Self {
		Self::new()
	}
}
impl MemoryTree {
	/// Creates a tree containing only an empty `<root>` element.
	#[must_use]
	pub fn new() -> Self {
		Self {
			nodes: vec![Some(MemoryNode::new(MemoryKind::Element("root".to_owned())))],
			root: NodeId::new(0),
			focused: None,
			created: 0,
		}
	}

	#[must_use]
	pub fn root(&self) -> NodeId {
		self.root
	}

	/// How many nodes were created through [`LiveTree`] so far.
	#[must_use]
	pub fn created_count(&self) -> usize {
		self.created
	}

	#[must_use]
	pub fn contains(&self, node: NodeId) -> bool {
		self.node(node).is_ok()
	}

	/// # Errors
	///
	/// Iff `node` doesn't exist (anymore).
	pub fn node(&self, node: NodeId) -> Result<&MemoryNode, Error> {
		self.nodes.get(node.index()).and_then(Option::as_ref).ok_or(Error::UnknownNode(node))
	}

	fn node_mut(&mut self, node: NodeId) -> Result<&mut MemoryNode, Error> {
		self.nodes.get_mut(node.index()).and_then(Option::as_mut).ok_or(Error::UnknownNode(node))
	}

	fn element_mut(&mut self, node: NodeId) -> Result<&mut MemoryNode, Error> {
		let memory_node = self.node_mut(node)?;
		match memory_node.kind {
			MemoryKind::Element(_) => Ok(memory_node),
			MemoryKind::Text(_) => Err(Error::NotAnElement(node)),
		}
	}

	#[must_use]
	pub fn children(&self, parent: NodeId) -> &[NodeId] {
		self.node(parent).map_or(&[][..], |parent| parent.children.as_slice())
	}

	#[must_use]
	pub fn parent(&self, node: NodeId) -> Option<NodeId> {
		self.node(node).ok().and_then(|node| node.parent)
	}

	#[must_use]
	pub fn tag(&self, node: NodeId) -> Option<&str> {
		match &self.node(node).ok()?.kind {
			MemoryKind::Element(tag) => Some(tag.as_str()),
			MemoryKind::Text(_) => None,
		}
	}

	#[must_use]
	pub fn text(&self, node: NodeId) -> Option<&str> {
		match &self.node(node).ok()?.kind {
			MemoryKind::Text(text) => Some(text.as_str()),
			MemoryKind::Element(_) => None,
		}
	}

	#[must_use]
	pub fn attribute(&self, node: NodeId, name: &str) -> Option<&str> {
		self.node(node).ok()?.attributes.get(name).map(String::as_str)
	}

	#[must_use]
	pub fn property(&self, node: NodeId, name: &str) -> Option<&AttrValue> {
		self.node(node).ok()?.properties.get(name)
	}

	#[must_use]
	pub fn style_property(&self, node: NodeId, property: &str) -> Option<&str> {
		self.node(node).ok()?.style.get(property).map(String::as_str)
	}

	/// The listeners attached to `node` for `event`, in attachment order.
	#[must_use]
	pub fn listeners(&self, node: NodeId, event: &str) -> Vec<Listener> {
		self.node(node)
			.map(|node| node.listeners.iter().filter(|(e, _)| e == event).map(|(_, listener)| listener.clone()).collect())
			.unwrap_or_default()
	}

	/// Calls every listener for `event` on `node` with `payload`. Returns how many were called.
	///
	/// There is no bubbling.
	pub fn dispatch(&self, node: NodeId, event: &str, payload: &dyn Any) -> usize {
		let listeners = self.listeners(node, event);
		for listener in &listeners {
			listener.call(payload)
		}
		listeners.len()
	}

	/// Serializes `node` and its subtree as HTML-like markup, with attributes in name order.
	///
	/// Style properties set individually are rendered as `style` attribute if there is no such attribute already.
	#[must_use]
	pub fn markup(&self, node: NodeId) -> String {
		let mut markup = String::new();
		self.write_markup(&mut markup, node);
		markup
	}

	fn write_markup(&self, markup: &mut String, node: NodeId) {
		let memory_node = match self.node(node) {
			Ok(memory_node) => memory_node,
			Err(_) => return markup.push_str("<!--missing-->"),
		};
		match &memory_node.kind {
			MemoryKind::Text(text) => markup.push_str(&escape(text, false)),
			MemoryKind::Element(tag) => {
				markup.push('<');
				markup.push_str(tag);
				for (name, value) in &memory_node.attributes {
					let _ = write!(markup, " {}=\"{}\"", name, escape(value, true));
				}
				if !memory_node.style.is_empty() && !memory_node.attributes.contains_key("style") {
					let css = memory_node.style.iter().map(|(property, value)| format!("{}: {};", property, value)).collect::<Vec<_>>().join(" ");
					let _ = write!(markup, " style=\"{}\"", escape(&css, true));
				}
				markup.push('>');
				for &child in &memory_node.children {
					self.write_markup(markup, child)
				}
				let _ = write!(markup, "</{}>", tag);
			}
		}
	}

	/// Whether `ancestor` is `node` or one of its ancestors.
	fn is_inclusive_ancestor(&self, ancestor: NodeId, mut node: NodeId) -> bool {
		loop {
			if node == ancestor {
				return true;
			}
			match self.parent(node) {
				Some(parent) => node = parent,
				None => return false,
			}
		}
	}

	fn push(&mut self, kind: MemoryKind) -> NodeId {
		let id = NodeId::new(self.nodes.len());
		self.nodes.push(Some(MemoryNode::new(kind)));
		self.created += 1;
		id
	}

	fn unlink(&mut self, node: NodeId) -> Result<(), Error> {
		if let Some(focused) = self.focused {
			if self.is_inclusive_ancestor(node, focused) {
				trace!(?focused, "Blurring detached node.");
				self.focused = None;
			}
		}
		if let Some(parent) = self.node_mut(node)?.parent.take() {
			self.node_mut(parent)?.children.retain(|&child| child != node);
		}
		Ok(())
	}
}

fn escape(text: &str, attribute: bool) -> String {
	let mut escaped = String::with_capacity(text.len());
	for c in text.chars() {
		match c {
			'&' => escaped.push_str("&amp;"),
			'<' => escaped.push_str("&lt;"),
			'>' => escaped.push_str("&gt;"),
			'"' if attribute => escaped.push_str("&quot;"),
			c => escaped.push(c),
		}
	}
	escaped
}

impl LiveTree for MemoryTree {
	fn create_text(&mut self, text: &str) -> Result<NodeId, Error> {
		Ok(self.push(MemoryKind::Text(text.to_owned())))
	}

	fn create_element(&mut self, tag: &str) -> Result<NodeId, Error> {
		Ok(self.push(MemoryKind::Element(tag.to_owned())))
	}

	fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) -> Result<(), Error> {
		self.element_mut(node)?.attributes.insert(name.to_owned(), value.to_owned());
		Ok(())
	}

	fn remove_attribute(&mut self, node: NodeId, name: &str) -> Result<(), Error> {
		self.element_mut(node)?.attributes.remove(name);
		Ok(())
	}

	fn set_property(&mut self, node: NodeId, name: &str, value: &AttrValue) -> Result<(), Error> {
		self.node_mut(node)?.properties.insert(name.to_owned(), value.clone());
		Ok(())
	}

	fn clear_property(&mut self, node: NodeId, name: &str) -> Result<(), Error> {
		self.node_mut(node)?.properties.remove(name);
		Ok(())
	}

	fn set_style_property(&mut self, node: NodeId, property: &str, value: &str) -> Result<(), Error> {
		self.element_mut(node)?.style.insert(property.to_owned(), value.to_owned());
		Ok(())
	}

	fn remove_style_property(&mut self, node: NodeId, property: &str) -> Result<(), Error> {
		self.element_mut(node)?.style.remove(property);
		Ok(())
	}

	fn insert_before(&mut self, parent: NodeId, node: NodeId, reference: Option<NodeId>) -> Result<(), Error> {
		if self.text(parent).is_some() {
			return Err(Error::NotAContainer(parent));
		}
		self.node(parent)?;
		self.node(node)?;
		if self.is_inclusive_ancestor(node, parent) {
			return Err(Error::Dom(format!("Can't insert {:?} into its own descendant {:?}.", node, parent)));
		}
		if reference == Some(node) {
			return Ok(());
		}

		self.unlink(node)?;
		let children = &mut self.node_mut(parent)?.children;
		let index = match reference {
			None => children.len(),
			Some(reference) => children
				.iter()
				.position(|&child| child == reference)
				.ok_or_else(|| Error::Dom(format!("Reference node {:?} is not a child of {:?}.", reference, parent)))?,
		};
		children.insert(index, node);
		self.node_mut(node)?.parent = Some(parent);
		Ok(())
	}

	fn detach(&mut self, node: NodeId) -> Result<(), Error> {
		self.unlink(node)
	}

	fn remove(&mut self, node: NodeId) -> Result<(), Error> {
		self.unlink(node)?;
		let mut discarded = vec![node];
		while let Some(node) = discarded.pop() {
			if let Some(memory_node) = self.nodes.get_mut(node.index()).and_then(Option::take) {
				discarded.extend(memory_node.children);
			}
		}
		Ok(())
	}

	fn add_listener(&mut self, node: NodeId, event: &str, listener: &Listener) -> Result<(), Error> {
		let listeners = &mut self.node_mut(node)?.listeners;
		if !listeners.iter().any(|(e, l)| e == event && l == listener) {
			listeners.push((event.to_owned(), listener.clone()))
		}
		Ok(())
	}

	fn remove_listener(&mut self, node: NodeId, event: &str, listener: &Listener) -> Result<(), Error> {
		self.node_mut(node)?.listeners.retain(|(e, l)| !(e == event && l == listener));
		Ok(())
	}

	fn focused(&self) -> Option<NodeId> {
		self.focused
	}

	fn focus(&mut self, node: NodeId) -> Result<(), Error> {
		self.element_mut(node)?;
		self.focused = Some(node);
		Ok(())
	}

	fn child_count(&self, parent: NodeId) -> Result<usize, Error> {
		Ok(self.node(parent)?.children.len())
	}

	fn child_at(&self, parent: NodeId, index: usize) -> Result<Option<NodeId>, Error> {
		Ok(self.node(parent)?.children.get(index).copied())
	}

	fn describe(&self, node: NodeId) -> Result<LiveNode, Error> {
		let memory_node = self.node(node)?;
		Ok(match &memory_node.kind {
			MemoryKind::Text(text) => LiveNode::Text(text.clone()),
			MemoryKind::Element(tag) => LiveNode::Element {
				tag: tag.clone(),
				attributes: memory_node.attributes.iter().map(|(name, value)| (name.clone(), value.clone())).collect(),
			},
		})
	}
}
