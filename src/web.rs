//! The browser DOM as [`LiveTree`], via [`web_sys`].

use crate::{
	live::{LiveNode, LiveTree, NodeId},
	rc_hash_map::{CountSaturatedError, RcHashMap},
	vnode::{AttrValue, Listener},
	Error,
};
use js_sys::{Function, Object, Reflect};
use tracing::{info, instrument, trace, warn};
use wasm_bindgen::{closure::Closure, JsCast, JsValue};

#[derive(Debug)]
struct Slot {
	node: web_sys::Node,
	parent: Option<NodeId>,
	children: Vec<NodeId>,
	listeners: Vec<(String, Listener)>,
}
impl Slot {
	fn new(node: web_sys::Node, parent: Option<NodeId>) -> Self {
		Self {
			node,
			parent,
			children: Vec::new(),
			listeners: Vec::new(),
		}
	}
}

/// Attached to a specific [`web_sys::Element`] during instantiation, this `struct` tracks that element and every node inserted under it.
///
/// Child lists are mirrored on the Rust side, so nothing else may add, move or remove nodes in the managed subtree.
///
/// # Listeners
///
/// Each distinct [`Listener`] is bridged into [***JavaScript***](https://developer.mozilla.org/en-US/docs/Web/JavaScript) once,
/// through a reference-counted [`Closure`] that is released in [`LiveTree::settle`] once no node uses it anymore.
///
/// Associated event listeners will start throwing errors into [***JavaScript***](https://developer.mozilla.org/en-US/docs/Web/JavaScript)
/// if the instance is dropped while they are still attached.
///
/// # Node Ids
///
/// Ids of removed nodes are only handed out again after [`LiveTree::settle`],
/// so an id captured before a patch list runs can't come to mean a different node halfway through.
#[derive(Debug)]
pub struct WebDom {
	document: web_sys::Document,
	slots: Vec<Option<Slot>>,
	free: Vec<NodeId>,
	/// Removed since the last [`LiveTree::settle`].
	pending_free: Vec<NodeId>,
	root: NodeId,
	handler_handles: RcHashMap<Listener, Closure<dyn Fn(web_sys::Event)>>,
}
impl WebDom {
	/// Takes over `element` and its existing element and text descendants.
	///
	/// Other nodes found in there, like comments, are removed.
	///
	/// # Errors
	///
	/// Iff `element` has no owner document or a stray node can't be removed.
	#[instrument]
	pub fn new_for_element(element: web_sys::Element) -> Result<Self, Error> {
		let document = element.owner_document().ok_or_else(|| Error::Dom("No owner document found for root element.".to_owned()))?;
		let mut dom = Self {
			document,
			slots: vec![Some(Slot::new(element.into(), None))],
			free: Vec::new(),
			pending_free: Vec::new(),
			root: NodeId::new(0),
			handler_handles: RcHashMap::new(),
		};
		dom.adopt_children(dom.root)?;
		info!("Adopted {} existing node(s).", dom.slots.len() - 1);
		Ok(dom)
	}

	#[must_use]
	pub fn root(&self) -> NodeId {
		self.root
	}

	#[must_use]
	pub fn document(&self) -> &web_sys::Document {
		&self.document
	}

	/// The DOM node behind `node`, if it is still tracked.
	#[must_use]
	pub fn node(&self, node: NodeId) -> Option<&web_sys::Node> {
		self.slot(node).ok().map(|slot| &slot.node)
	}

	fn adopt_children(&mut self, parent: NodeId) -> Result<(), Error> {
		let parent_node = self.slot(parent)?.node.clone();
		let child_nodes = parent_node.child_nodes();
		let children: Vec<web_sys::Node> = (0..child_nodes.length()).filter_map(|i| child_nodes.item(i)).collect();
		for child in children {
			match child.node_type() {
				web_sys::Node::ELEMENT_NODE => {
					let id = self.alloc(Slot::new(child, Some(parent)));
					self.slot_mut(parent)?.children.push(id);
					self.adopt_children(id)?
				}
				web_sys::Node::TEXT_NODE => {
					let id = self.alloc(Slot::new(child, Some(parent)));
					self.slot_mut(parent)?.children.push(id)
				}
				node_type => {
					warn!("Removing unsupported node of type {} from managed subtree: {:?}", node_type, crate::loggable(&child));
					parent_node.remove_child(&child).map_err(dom_error)?;
				}
			}
		}
		Ok(())
	}

	fn alloc(&mut self, slot: Slot) -> NodeId {
		match self.free.pop() {
			Some(id) => {
				self.slots[id.index()] = Some(slot);
				id
			}
			None => {
				self.slots.push(Some(slot));
				NodeId::new(self.slots.len() - 1)
			}
		}
	}

	fn slot(&self, node: NodeId) -> Result<&Slot, Error> {
		self.slots.get(node.index()).and_then(Option::as_ref).ok_or(Error::UnknownNode(node))
	}

	fn slot_mut(&mut self, node: NodeId) -> Result<&mut Slot, Error> {
		self.slots.get_mut(node.index()).and_then(Option::as_mut).ok_or(Error::UnknownNode(node))
	}

	fn element(&self, node: NodeId) -> Result<&web_sys::Element, Error> {
		self.slot(node)?.node.dyn_ref::<web_sys::Element>().ok_or(Error::NotAnElement(node))
	}

	fn style(&self, node: NodeId) -> Result<web_sys::CssStyleDeclaration, Error> {
		let dom_node = &self.slot(node)?.node;
		if let Some(html_element) = dom_node.dyn_ref::<web_sys::HtmlElement>() {
			Ok(html_element.style())
		} else if let Some(svg_element) = dom_node.dyn_ref::<web_sys::SvgElement>() {
			Ok(svg_element.style())
		} else {
			Err(Error::NotAnElement(node))
		}
	}

	/// Updates the mirrored child lists only.
	fn unlink(&mut self, node: NodeId) -> Result<(), Error> {
		if let Some(parent) = self.slot_mut(node)?.parent.take() {
			self.slot_mut(parent)?.children.retain(|&child| child != node);
		}
		Ok(())
	}

	fn release_listener(&mut self, dom_node: &web_sys::Node, event: &str, listener: &Listener) -> Result<(), Error> {
		match self.handler_handles.weak_decrement(listener) {
			Ok(Some(closure)) => dom_node.remove_event_listener_with_callback(event, closure.as_ref().unchecked_ref::<Function>()).map_err(dom_error),
			Ok(None) => Err(Error::Dom(format!("Tried to release listener {:?} that was never bridged.", listener))),
			Err(CountSaturatedError) => Err(Error::Dom(format!("Tried to release listener {:?} more often than it was bridged.", listener))),
		}
	}
}

fn dom_error(error: JsValue) -> Error {
	Error::Dom(format!("{:?}", error))
}

#[allow(clippy::cast_precision_loss)]
fn to_js(value: &AttrValue) -> JsValue {
	match value {
		AttrValue::Str(text) => JsValue::from_str(text),
		AttrValue::Bool(value) => JsValue::from_bool(*value),
		AttrValue::Int(value) => JsValue::from_f64(*value as f64),
		AttrValue::Float(value) => JsValue::from_f64(*value),
		AttrValue::Style(style) => JsValue::from_str(&style.css_text()),
	}
}

impl LiveTree for WebDom {
	fn create_text(&mut self, text: &str) -> Result<NodeId, Error> {
		let dom_text = self.document.create_text_node(text);
		Ok(self.alloc(Slot::new(dom_text.into(), None)))
	}

	fn create_element(&mut self, tag: &str) -> Result<NodeId, Error> {
		let dom_element = self.document.create_element(tag).map_err(dom_error)?;
		Ok(self.alloc(Slot::new(dom_element.into(), None)))
	}

	fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) -> Result<(), Error> {
		self.element(node)?.set_attribute(name, value).map_err(dom_error)
	}

	fn remove_attribute(&mut self, node: NodeId, name: &str) -> Result<(), Error> {
		self.element(node)?.remove_attribute(name).map_err(dom_error)
	}

	fn set_property(&mut self, node: NodeId, name: &str, value: &AttrValue) -> Result<(), Error> {
		let target: &JsValue = self.slot(node)?.node.as_ref();
		Reflect::set(target, &JsValue::from_str(name), &to_js(value)).map_err(dom_error)?;
		Ok(())
	}

	fn clear_property(&mut self, node: NodeId, name: &str) -> Result<(), Error> {
		let target: &Object = self.slot(node)?.node.as_ref();
		Reflect::delete_property(target, &JsValue::from_str(name)).map_err(dom_error)?;
		Ok(())
	}

	fn set_style_property(&mut self, node: NodeId, property: &str, value: &str) -> Result<(), Error> {
		self.style(node)?.set_property(property, value).map_err(dom_error)
	}

	fn remove_style_property(&mut self, node: NodeId, property: &str) -> Result<(), Error> {
		self.style(node)?.remove_property(property).map_err(dom_error)?;
		Ok(())
	}

	fn insert_before(&mut self, parent: NodeId, node: NodeId, reference: Option<NodeId>) -> Result<(), Error> {
		if reference == Some(node) {
			trace!("Inserting node before itself. Nothing to do.");
			return Ok(());
		}
		let parent_node = self.slot(parent)?.node.clone();
		let child = self.slot(node)?.node.clone();
		let reference_node = match reference {
			Some(reference) => Some(self.slot(reference)?.node.clone()),
			None => None,
		};
		parent_node.insert_before(&child, reference_node.as_ref()).map_err(dom_error)?;

		self.unlink(node)?;
		let children = &mut self.slot_mut(parent)?.children;
		let index = reference.and_then(|reference| children.iter().position(|&child| child == reference)).unwrap_or(children.len());
		children.insert(index, node);
		self.slot_mut(node)?.parent = Some(parent);
		Ok(())
	}

	fn detach(&mut self, node: NodeId) -> Result<(), Error> {
		let dom_node = self.slot(node)?.node.clone();
		if let Some(parent) = dom_node.parent_node() {
			parent.remove_child(&dom_node).map_err(dom_error)?;
		}
		self.unlink(node)
	}

	#[instrument(skip(self))]
	fn remove(&mut self, node: NodeId) -> Result<(), Error> {
		self.detach(node)?;
		let mut discarded = vec![node];
		while let Some(node) = discarded.pop() {
			let slot = match self.slots.get_mut(node.index()).and_then(Option::take) {
				Some(slot) => slot,
				None => continue,
			};
			for (event, listener) in &slot.listeners {
				self.release_listener(&slot.node, event, listener)?
			}
			discarded.extend(slot.children);
			self.pending_free.push(node);
		}
		Ok(())
	}

	fn add_listener(&mut self, node: NodeId, event: &str, listener: &Listener) -> Result<(), Error> {
		let slot = self.slot(node)?;
		if slot.listeners.iter().any(|(e, l)| e == event && l == listener) {
			trace!("Listener already attached.");
			return Ok(());
		}
		let dom_node = slot.node.clone();

		let closure = self
			.handler_handles
			.increment_or_insert_with(listener.clone(), |listener| {
				let listener = listener.clone();
				Closure::wrap(Box::new(move |event: web_sys::Event| listener.call(&event)) as Box<dyn Fn(web_sys::Event)>)
			})
			.map_err(|CountSaturatedError| Error::Dom("Too many (more than 65k) active references to the same listener.".to_owned()))?;
		dom_node.add_event_listener_with_callback(event, closure.as_ref().unchecked_ref::<Function>()).map_err(dom_error)?;

		self.slot_mut(node)?.listeners.push((event.to_owned(), listener.clone()));
		Ok(())
	}

	fn remove_listener(&mut self, node: NodeId, event: &str, listener: &Listener) -> Result<(), Error> {
		let slot = self.slot_mut(node)?;
		let index = match slot.listeners.iter().position(|(e, l)| e == event && l == listener) {
			Some(index) => index,
			None => {
				trace!("Listener not attached.");
				return Ok(());
			}
		};
		slot.listeners.remove(index);
		let dom_node = slot.node.clone();
		self.release_listener(&dom_node, event, listener)
	}

	fn focused(&self) -> Option<NodeId> {
		let active = self.document.active_element()?;
		let active: &web_sys::Node = active.as_ref();
		self.slots
			.iter()
			.position(|slot| slot.as_ref().map_or(false, |slot| slot.node.is_same_node(Some(active))))
			.map(NodeId::new)
	}

	fn focus(&mut self, node: NodeId) -> Result<(), Error> {
		self.slot(node)?.node.dyn_ref::<web_sys::HtmlElement>().ok_or(Error::NotAnElement(node))?.focus().map_err(dom_error)
	}

	fn child_count(&self, parent: NodeId) -> Result<usize, Error> {
		Ok(self.slot(parent)?.children.len())
	}

	fn child_at(&self, parent: NodeId, index: usize) -> Result<Option<NodeId>, Error> {
		Ok(self.slot(parent)?.children.get(index).copied())
	}

	fn describe(&self, node: NodeId) -> Result<LiveNode, Error> {
		let dom_node = &self.slot(node)?.node;
		if let Some(text) = dom_node.dyn_ref::<web_sys::Text>() {
			return Ok(LiveNode::Text(text.data()));
		}
		let element = self.element(node)?;
		let attributes = element.attributes();
		Ok(LiveNode::Element {
			tag: element.local_name(),
			attributes: (0..attributes.length()).filter_map(|i| attributes.item(i)).map(|attribute| (attribute.name(), attribute.value())).collect(),
		})
	}

	fn settle(&mut self) {
		self.free.append(&mut self.pending_free);
		let released = self.handler_handles.release_unused();
		trace!("Released {} listener closure(s).", released);
		info!("Listener closure count: {}, free node slots: {}/{}", self.handler_handles.len(), self.free.len(), self.slots.len());
	}
}
