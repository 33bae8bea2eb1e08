//! Patches: inspectable, deferred mutations of a live tree, and their executor.

use crate::{
	live::{index_of, insert_at, LiveTree, NodeId},
	materialize::materialize,
	vnode::{AttrValue, Attributes, ComponentInstance, Listener, Style, VNode, STYLE},
	Error,
};
use core::{
	fmt::{self, Debug, Formatter},
	ops::{Deref, DerefMut},
};
use tracing::{instrument, trace, trace_span, warn};

/// One deferred mutation.
///
/// A patch list is applied against a live node (the one the list was computed for) and that node's parent.
/// Patches borrow from the virtual trees they were diffed from.
pub enum Patch<'a> {
	/// Writes the attribute and mirrors it as live property.
	SetAttribute { name: &'a str, value: &'a AttrValue },
	RemoveAttribute { name: &'a str },
	/// Removes all styling implied by `old`, then applies `new`.
	ReplaceStyle { old: Option<&'a AttrValue>, new: Option<&'a AttrValue> },
	AttachListener { event: &'a str, listener: &'a Listener },
	DetachListener { event: &'a str, listener: &'a Listener },
	/// Materializes `node` and inserts it into the parent.
	InsertAt { node: &'a VNode, position: Option<usize> },
	RemoveNode { node: NodeId },
	/// Removes `old` (if it was ever materialized) and inserts a freshly materialized `node` in its place.
	///
	/// Without `position`, `node` takes `old`'s current index.
	Replace { old: Option<NodeId>, node: &'a VNode, position: Option<usize> },
	/// Moves `node`'s live handle to `position` in the parent, unless `previous` is already there.
	Reposition { previous: NodeId, node: &'a VNode, position: usize },
	ForwardProps { instance: ComponentInstance, props: &'a Attributes },
	/// Applies `patches` to `target` (or, if absent, creation patches with the current node as parent).
	Descend { target: Option<NodeId>, patches: Vec<Patch<'a>> },
}
impl<'a> Debug for Patch<'a> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		match self {
			Patch::SetAttribute { name, value } => f.debug_struct("SetAttribute").field("name", name).field("value", &crate::loggable(value)).finish(),
			Patch::RemoveAttribute { name } => f.debug_struct("RemoveAttribute").field("name", name).finish(),
			Patch::ReplaceStyle { old, new } => f.debug_struct("ReplaceStyle").field("old", &old.is_some()).field("new", &new.is_some()).finish(),
			Patch::AttachListener { event, listener } => f.debug_struct("AttachListener").field("event", event).field("listener", listener).finish(),
			Patch::DetachListener { event, listener } => f.debug_struct("DetachListener").field("event", event).field("listener", listener).finish(),
			Patch::InsertAt { node, position } => f.debug_struct("InsertAt").field("node", &node.kind).field("position", position).finish(),
			Patch::RemoveNode { node } => f.debug_struct("RemoveNode").field("node", node).finish(),
			Patch::Replace { old, node, position } => f.debug_struct("Replace").field("old", old).field("node", &node.kind).field("position", position).finish(),
			Patch::Reposition { previous, node, position } => f.debug_struct("Reposition").field("previous", previous).field("node", &node.kind).field("position", position).finish(),
			Patch::ForwardProps { props, .. } => f.debug_struct("ForwardProps").field("props", &props.keys().collect::<Vec<_>>()).finish(),
			Patch::Descend { target, patches } => f.debug_struct("Descend").field("target", target).field("patches", patches).finish(),
		}
	}
}

/// Applies `patches` in order to `live` and its `parent`.
///
/// The focused live node, if any, is focused again afterwards, even if a patch fails.
///
/// # Errors
///
/// The first error returned by a [`LiveTree`] primitive or component factory.
/// Patches before it stay applied; nothing is rolled back.
#[instrument(skip(tree, patches), fields(patches.len = patches.len()))]
pub fn apply(tree: &mut dyn LiveTree, live: Option<NodeId>, patches: &[Patch<'_>], parent: Option<NodeId>) -> Result<(), Error> {
	let result = {
		let mut tree = FocusGuard::capture(tree);
		apply_in_order(&mut *tree, live, patches, parent)
	};
	tree.settle();
	result
}

fn apply_in_order(tree: &mut dyn LiveTree, live: Option<NodeId>, patches: &[Patch<'_>], parent: Option<NodeId>) -> Result<(), Error> {
	for patch in patches {
		apply_one(tree, live, patch, parent)?
	}
	Ok(())
}

#[allow(clippy::too_many_lines)]
fn apply_one(tree: &mut dyn LiveTree, live: Option<NodeId>, patch: &Patch<'_>, parent: Option<NodeId>) -> Result<(), Error> {
	let target = || live.ok_or(Error::Unmaterialized);
	let parent = || parent.ok_or(Error::MissingParent);

	match *patch {
		Patch::SetAttribute { name, value } => {
			let span = trace_span!("Setting attribute", name, value = ?crate::loggable(value));
			let _enter = span.enter();
			write_attribute(tree, target()?, name, value)
		}

		Patch::RemoveAttribute { name } => {
			let span = trace_span!("Removing attribute", name);
			let _enter = span.enter();
			let node = target()?;
			tree.remove_attribute(node, name)?;
			tree.clear_property(node, name)
		}

		Patch::ReplaceStyle { old, new } => {
			let span = trace_span!("Replacing style");
			let _enter = span.enter();
			let node = target()?;
			if let Some(old) = old {
				unwrite_style(tree, node, old)?
			}
			match new {
				Some(new) => write_style(tree, node, new),
				None => Ok(()),
			}
		}

		Patch::AttachListener { event, listener } => {
			let span = trace_span!("Attaching listener", event, ?listener);
			let _enter = span.enter();
			tree.add_listener(target()?, event, listener)
		}

		Patch::DetachListener { event, listener } => {
			let span = trace_span!("Detaching listener", event, ?listener);
			let _enter = span.enter();
			tree.remove_listener(target()?, event, listener)
		}

		Patch::InsertAt { node, position } => {
			let span = trace_span!("Inserting", kind = ?node.kind, ?position);
			let _enter = span.enter();
			let parent = parent()?;
			let created = materialize(tree, node)?;
			insert_at(tree, parent, created, position)
		}

		Patch::RemoveNode { node } => {
			let span = trace_span!("Removing", ?node);
			let _enter = span.enter();
			tree.remove(node)
		}

		Patch::Replace { old, node, position } => {
			let span = trace_span!("Replacing", ?old, kind = ?node.kind, ?position);
			let _enter = span.enter();
			let parent = parent()?;
			let position = match (position, old) {
				(Some(position), _) => Some(position),
				(None, Some(old)) => index_of(tree, parent, old)?,
				(None, None) => None,
			};
			match old {
				Some(old) => tree.remove(old)?,
				None => warn!("Replacing a node that was never materialized. Inserting only."),
			}
			let created = materialize(tree, node)?;
			insert_at(tree, parent, created, position)
		}

		Patch::Reposition { previous, node, position } => {
			let span = trace_span!("Repositioning", ?previous, position);
			let _enter = span.enter();
			let parent = parent()?;
			if tree.child_at(parent, position)? == Some(previous) {
				trace!("Already in place.");
				return Ok(());
			}
			let moved = node.live().ok_or(Error::Unmaterialized)?;
			tree.detach(moved)?;
			insert_at(tree, parent, moved, Some(position))
		}

		Patch::ForwardProps { ref instance, props } => {
			let span = trace_span!("Forwarding props", "props.len()" = props.len());
			let _enter = span.enter();
			instance.borrow_mut().set_props(props.clone());
			Ok(())
		}

		Patch::Descend { target, ref patches } => {
			let span = trace_span!("Descending", ?target, "patches.len()" = patches.len());
			let _enter = span.enter();
			apply_in_order(tree, target, patches, live)
		}
	}
}

pub(crate) fn write_attribute(tree: &mut dyn LiveTree, node: NodeId, name: &str, value: &AttrValue) -> Result<(), Error> {
	match value.markup() {
		Some(markup) => tree.set_attribute(node, name, &markup)?,
		None => tree.remove_attribute(node, name)?,
	}
	tree.set_property(node, name, value)
}

pub(crate) fn write_style(tree: &mut dyn LiveTree, node: NodeId, style: &AttrValue) -> Result<(), Error> {
	match style {
		AttrValue::Style(Style::Map(properties)) => {
			for (property, value) in properties {
				tree.set_style_property(node, property, value)?
			}
			Ok(())
		}
		other => match other.markup() {
			Some(text) => tree.set_attribute(node, STYLE, &text),
			None => tree.remove_attribute(node, STYLE),
		},
	}
}

fn unwrite_style(tree: &mut dyn LiveTree, node: NodeId, style: &AttrValue) -> Result<(), Error> {
	match style {
		AttrValue::Style(Style::Map(properties)) => {
			for property in properties.keys() {
				tree.remove_style_property(node, property)?
			}
			Ok(())
		}
		_ => tree.remove_attribute(node, STYLE),
	}
}

/// Holds on to the focused node while patches run and refocuses it when dropped.
struct FocusGuard<'t> {
	tree: &'t mut dyn LiveTree,
	focused: Option<NodeId>,
}
impl<'t> FocusGuard<'t> {
	fn capture(tree: &'t mut dyn LiveTree) -> Self {
		let focused = tree.focused();
		trace!(?focused, "Captured focus.");
		Self { tree, focused }
	}
}
impl<'t> Deref for FocusGuard<'t> {
	type Target = dyn LiveTree + 't;

	fn deref(&self) -> &Self::Target {
		&*self.tree
	}
}
impl<'t> DerefMut for FocusGuard<'t> {
	fn deref_mut(&mut self) -> &mut Self::Target {
		&mut *self.tree
	}
}
impl<'t> Drop for FocusGuard<'t> {
	fn drop(&mut self) {
		if let Some(focused) = self.focused {
			if self.tree.focused() != Some(focused) {
				let span = trace_span!("Restoring focus", ?focused);
				let _enter = span.enter();
				if let Err(error) = self.tree.focus(focused) {
					warn!("Failed to restore focus: {}", error)
				}
			}
		}
	}
}
