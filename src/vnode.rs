//! The virtual node model: an immutable-per-render description of one tree node.

use crate::{live::NodeId, Error, LiveTree};
use core::{
	any::Any,
	cell::{Cell, RefCell},
	fmt::{self, Debug, Formatter},
	hash::{Hash, Hasher},
};
use hashbrown::HashMap;
use std::{
	borrow::Cow,
	collections::BTreeMap,
	rc::Rc,
};
use tracing::warn;

/// The attribute under which (inline or structured) styling is stored.
pub const STYLE: &str = "style";

pub type Attributes = HashMap<Cow<'static, str>, AttrValue>;
pub type Listeners = HashMap<Cow<'static, str>, Vec<Listener>>;

/// A caller-declared stable identity among siblings.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
	Int(i64),
	Str(Cow<'static, str>),
}
impl From<i64> for Key {
	fn from(key: i64) -> Self {
		Self::Int(key)
	}
}
impl From<i32> for Key {
	fn from(key: i32) -> Self {
		Self::Int(key.into())
	}
}
impl From<u32> for Key {
	fn from(key: u32) -> Self {
		Self::Int(key.into())
	}
}
impl From<&'static str> for Key {
	fn from(key: &'static str) -> Self {
		Self::Str(key.into())
	}
}
impl From<String> for Key {
	fn from(key: String) -> Self {
		Self::Str(key.into())
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Style {
	/// Opaque CSS text, replaced wholesale.
	Inline(Cow<'static, str>),
	/// Property → value. Equality doesn't depend on insertion order.
	Map(BTreeMap<Cow<'static, str>, Cow<'static, str>>),
}
impl Style {
	pub fn map<K, V>(properties: impl IntoIterator<Item = (K, V)>) -> Self
	where
		K: Into<Cow<'static, str>>,
		V: Into<Cow<'static, str>>,
	{
		Self::Map(properties.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
	}

	#[must_use]
	pub fn css_text(&self) -> Cow<'_, str> {
		match self {
			Style::Inline(text) => Cow::Borrowed(&**text),
			Style::Map(properties) => Cow::Owned(properties.iter().map(|(property, value)| format!("{}: {};", property, value)).collect::<Vec<_>>().join(" ")),
		}
	}
}

/// An attribute value.
///
/// Compared by value. There are no reference types here, so this is the same as primitive equality.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
	Str(Cow<'static, str>),
	Bool(bool),
	Int(i64),
	Float(f64),
	Style(Style),
}
impl AttrValue {
	/// How this value is written as markup attribute, if at all.
	///
	/// `Bool(false)` means "attribute absent".
	#[must_use]
	pub fn markup(&self) -> Option<Cow<'_, str>> {
		match self {
			AttrValue::Str(text) => Some(Cow::Borrowed(&**text)),
			AttrValue::Bool(true) => Some(Cow::Borrowed("")),
			AttrValue::Bool(false) => None,
			AttrValue::Int(value) => Some(Cow::Owned(value.to_string())),
			AttrValue::Float(value) => Some(Cow::Owned(value.to_string())),
			AttrValue::Style(style) => Some(style.css_text()),
		}
	}
}
impl From<&'static str> for AttrValue {
	fn from(value: &'static str) -> Self {
		Self::Str(value.into())
	}
}
impl From<String> for AttrValue {
	fn from(value: String) -> Self {
		Self::Str(value.into())
	}
}
impl From<bool> for AttrValue {
	fn from(value: bool) -> Self {
		Self::Bool(value)
	}
}
impl From<i64> for AttrValue {
	fn from(value: i64) -> Self {
		Self::Int(value)
	}
}
impl From<i32> for AttrValue {
	fn from(value: i32) -> Self {
		Self::Int(value.into())
	}
}
impl From<f64> for AttrValue {
	fn from(value: f64) -> Self {
		Self::Float(value)
	}
}
impl From<Style> for AttrValue {
	fn from(style: Style) -> Self {
		Self::Style(style)
	}
}

/// An event handler, compared and hashed by identity.
///
/// Two listeners created from identical closures are still different listeners.
/// Keep a [`Listener`] around across renders to avoid detaching and reattaching it each time.
#[derive(Clone)]
pub struct Listener(Rc<dyn Fn(&dyn Any)>);
impl Listener {
	pub fn new(handler: impl 'static + Fn(&dyn Any)) -> Self {
		Self(Rc::new(handler))
	}

	pub fn call(&self, event: &dyn Any) {
		(self.0)(event)
	}

	fn address(&self) -> *const () {
		Rc::as_ptr(&self.0).cast()
	}
}
impl PartialEq for Listener {
	fn eq(&self, other: &Self) -> bool {
		self.address() == other.address()
	}
}
impl Eq for Listener {}
impl Hash for Listener {
	fn hash<H: Hasher>(&self, state: &mut H) {
		self.address().hash(state)
	}
}
impl Debug for Listener {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		write!(f, "Listener({:p})", self.address())
	}
}

/// A mounted, user-defined component. Opaque to the reconciler beyond these methods.
pub trait Component {
	fn props(&self) -> &Attributes;

	/// Overwrites the props wholesale. Internal state is the component's business.
	fn set_props(&mut self, props: Attributes);

	/// The live node standing in for this component in its parent.
	fn mount_point(&self) -> NodeId;
}

pub trait ComponentFactory {
	/// Used in logs only.
	fn name(&self) -> &str;

	/// # Errors
	///
	/// Whatever the component or the live tree fails with.
	fn create(&self, props: &Attributes, children: &[VNode], tree: &mut dyn LiveTree) -> Result<Box<dyn Component>, Error>;
}

pub type ComponentInstance = Rc<RefCell<Box<dyn Component>>>;

#[derive(Clone)]
pub enum Kind {
	Element(Cow<'static, str>),
	/// Carries the literal text.
	Text(Cow<'static, str>),
	/// Factory identity is pointer identity.
	Component(Rc<dyn ComponentFactory>),
}
impl PartialEq for Kind {
	fn eq(&self, other: &Self) -> bool {
		match (self, other) {
			(Kind::Element(a), Kind::Element(b)) | (Kind::Text(a), Kind::Text(b)) => a == b,
			(Kind::Component(a), Kind::Component(b)) => Rc::as_ptr(a).cast::<()>() == Rc::as_ptr(b).cast::<()>(),
			_ => false,
		}
	}
}
impl Debug for Kind {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		match self {
			Kind::Element(tag) => write!(f, "<{}>", tag),
			Kind::Text(text) => write!(f, "Text({:?})", crate::loggable(text)),
			Kind::Component(factory) => write!(f, "Component({})", factory.name()),
		}
	}
}

/// One node of a virtual tree.
///
/// Everything except the live handle and component instance is fixed once built.
/// Those two are moved over from the matching node of the previous render during reconciliation.
pub struct VNode {
	pub kind: Kind,
	pub key: Option<Key>,
	pub attributes: Attributes,
	pub listeners: Listeners,
	pub children: Vec<VNode>,
	/// Promises that this subtree is identical to the previous render's, skipping the diff entirely.
	pub is_static: bool,
	live: Cell<Option<NodeId>>,
	instance: RefCell<Option<ComponentInstance>>,
}
impl VNode {
	#[must_use]
	pub fn new(kind: Kind) -> Self {
		Self {
			kind,
			key: None,
			attributes: Attributes::new(),
			listeners: Listeners::new(),
			children: Vec::new(),
			is_static: false,
			live: Cell::new(None),
			instance: RefCell::new(None),
		}
	}

	#[must_use]
	pub fn element(tag: impl Into<Cow<'static, str>>) -> Self {
		Self::new(Kind::Element(tag.into()))
	}

	#[must_use]
	pub fn text(text: impl Into<Cow<'static, str>>) -> Self {
		Self::new(Kind::Text(text.into()))
	}

	#[must_use]
	pub fn component(factory: Rc<dyn ComponentFactory>) -> Self {
		Self::new(Kind::Component(factory))
	}

	#[must_use]
	pub fn key(mut self, key: impl Into<Key>) -> Self {
		self.key = Some(key.into());
		self
	}

	#[must_use]
	pub fn attr(mut self, name: impl Into<Cow<'static, str>>, value: impl Into<AttrValue>) -> Self {
		self.attributes.insert(name.into(), value.into());
		self
	}

	#[must_use]
	pub fn style(self, style: Style) -> Self {
		self.attr(STYLE, style)
	}

	/// Adds `listener` for `event`. Adding the same listener twice for one event has no further effect.
	#[must_use]
	pub fn on(mut self, event: impl Into<Cow<'static, str>>, listener: Listener) -> Self {
		let listeners = self.listeners.entry(event.into()).or_default();
		if !listeners.contains(&listener) {
			listeners.push(listener)
		}
		self
	}

	#[must_use]
	pub fn child(mut self, child: VNode) -> Self {
		self.children.push(child);
		self
	}

	#[must_use]
	pub fn children(mut self, children: impl IntoIterator<Item = VNode>) -> Self {
		self.children.extend(children);
		self
	}

	#[must_use]
	pub fn mark_static(mut self) -> Self {
		self.is_static = true;
		self
	}

	#[must_use]
	pub fn text_value(&self) -> Option<&str> {
		match &self.kind {
			Kind::Text(text) => Some(&**text),
			_ => None,
		}
	}

	/// The live node this virtual node currently represents.
	#[must_use]
	pub fn live(&self) -> Option<NodeId> {
		self.live.get()
	}

	#[must_use]
	pub fn instance(&self) -> Option<ComponentInstance> {
		self.instance.borrow().clone()
	}

	pub(crate) fn set_live(&self, node: NodeId) {
		self.live.set(Some(node))
	}

	pub(crate) fn set_instance(&self, instance: ComponentInstance) {
		*self.instance.borrow_mut() = Some(instance)
	}

	/// Whether `self` and `other` represent the same live node across renders.
	///
	/// Text nodes are the same iff their text is equal.
	/// Anything else is the same iff kind and key are equal.
	#[must_use]
	pub fn is_same(&self, other: &VNode) -> bool {
		match (&self.kind, &other.kind) {
			(Kind::Text(a), Kind::Text(b)) => a == b,
			(Kind::Text(_), _) | (_, Kind::Text(_)) => false,
			(a, b) => a == b && self.key == other.key,
		}
	}

	/// Moves the live handle and component instance out of `old` into `self`.
	pub(crate) fn take_live_from(&self, old: &VNode) {
		self.live.set(old.live.take());
		let instance = old.instance.borrow_mut().take();
		*self.instance.borrow_mut() = instance;
	}

	/// Like [`take_live_from`](`VNode::take_live_from`), but for the whole subtree, pairing children by position.
	pub(crate) fn take_subtree_from(&self, old: &VNode) {
		self.take_live_from(old);
		if self.children.len() != old.children.len() {
			warn!(
				"Static node {:?} has {} children, but the previous render had {}. The live tree will not match.",
				self.kind,
				self.children.len(),
				old.children.len()
			);
		}
		for (new, old) in self.children.iter().zip(&old.children) {
			if new.is_same(old) {
				new.take_subtree_from(old)
			} else {
				warn!("Static node child {:?} doesn't match previous {:?}. Leaving it without live handle.", new.kind, old.kind);
			}
		}
	}
}
impl Debug for VNode {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		let mut debug = f.debug_struct("VNode");
		debug.field("kind", &self.kind).field("key", &self.key);
		if !self.attributes.is_empty() {
			debug.field("attributes", &self.attributes.keys().collect::<Vec<_>>());
		}
		if !self.listeners.is_empty() {
			debug.field("listeners", &self.listeners);
		}
		if !self.children.is_empty() {
			debug.field("children", &self.children);
		}
		if self.is_static {
			debug.field("is_static", &true);
		}
		debug.field("live", &self.live.get()).finish()
	}
}
