//! Reconciliation: turning an old and a new virtual tree into an ordered patch list.
//!
//! Nothing here touches the live tree. The only side effect is moving live handles (and component
//! instances) from old virtual nodes onto the new nodes they're matched with.

use crate::{
	live::NodeId,
	patch::Patch,
	vnode::{Attributes, Key, Kind, Listeners, VNode, STYLE},
};
use core::ptr;
use hashbrown::{hash_map::Entry, HashMap, HashSet};
use tracing::{error, instrument, level_filters::STATIC_MAX_LEVEL, trace, trace_span, warn, Level};

/// Computes the patches that turn `old`'s live node into one matching `new`.
///
/// - Without `old`, `new` is materialized and inserted at `position` into the parent.
/// - Without `new`, `old`'s live node is removed.
/// - If the two aren't [the same](`VNode::is_same`), `old` is replaced wholesale.
/// - Otherwise `old`'s live handle moves to `new` and the two are diffed,
///   unless `new` [is static](`VNode::is_static`).
///
/// The resulting patches are meant to be [applied](`crate::patch::apply`) to `old`'s live node and its parent.
/// A `position` of [`None`] (or past the end) appends.
#[must_use]
#[instrument(skip(old, new), fields(old = ?old.map(|old| &old.kind), new = ?new.map(|new| &new.kind)))]
pub fn reconcile<'a>(old: Option<&'a VNode>, new: Option<&'a VNode>, position: Option<usize>) -> Vec<Patch<'a>> {
	let (old, new) = match (old, new) {
		(None, None) => {
			trace!("Nothing to reconcile.");
			return Vec::new();
		}
		(None, Some(new)) => return vec![Patch::InsertAt { node: new, position }],
		(Some(old), None) => {
			return match old.live() {
				Some(node) => vec![Patch::RemoveNode { node }],
				None => {
					error!("Removed node {:?} has no live handle. Nothing to remove.", old.kind);
					Vec::new()
				}
			}
		}
		(Some(old), Some(new)) => (old, new),
	};

	if !old.is_same(new) {
		if STATIC_MAX_LEVEL >= Level::WARN {
			if let (Kind::Element(a), Kind::Element(b)) = (&old.kind, &new.kind) {
				if a != b && a.eq_ignore_ascii_case(b) {
					warn!("Recreating element due to different tag name casing: {:?} -> {:?}", a, b)
				}
			}
		}
		return vec![Patch::Replace { old: old.live(), node: new, position }];
	}

	let previous = old.live();
	if previous.is_none() {
		error!("Reused node {:?} has no live handle. Its patches will fail to apply.", old.kind);
	}

	if new.is_static {
		trace!("Static node. Skipping diff.");
		new.take_subtree_from(old);
		return Vec::new();
	}
	new.take_live_from(old);

	let mut patches = diff_listeners(&old.listeners, &new.listeners);
	match &new.kind {
		Kind::Element(_) | Kind::Text(_) => {
			patches.extend(diff_style(&old.attributes, &new.attributes));
			patches.extend(diff_props(&old.attributes, &new.attributes));
			patches.extend(diff_children(&old.children, &new.children));
		}
		Kind::Component(factory) => match new.instance() {
			Some(instance) => patches.push(Patch::ForwardProps { instance, props: &new.attributes }),
			None => error!("Component {} has no instance to forward props to.", factory.name()),
		},
	}

	if let (Some(position), Some(previous), Some(_)) = (position, previous, &new.key) {
		patches.push(Patch::Reposition { previous, node: new, position })
	}

	patches
}

/// Diffs two event type → listener set mappings by listener identity.
#[must_use]
pub fn diff_listeners<'a>(old: &'a Listeners, new: &'a Listeners) -> Vec<Patch<'a>> {
	let mut patches = Vec::new();

	for (event, old_listeners) in old {
		match new.get(event) {
			None => patches.extend(old_listeners.iter().map(|listener| Patch::DetachListener { event, listener })),
			Some(new_listeners) => {
				let span = trace_span!("Diffing listeners", event = &**event, "old.len()" = old_listeners.len(), "new.len()" = new_listeners.len());
				let _enter = span.enter();
				let kept: HashSet<_> = new_listeners.iter().collect();
				patches.extend(old_listeners.iter().filter(|listener| !kept.contains(listener)).map(|listener| Patch::DetachListener { event, listener }));
				let prior: HashSet<_> = old_listeners.iter().collect();
				patches.extend(new_listeners.iter().filter(|listener| !prior.contains(listener)).map(|listener| Patch::AttachListener { event, listener }));
			}
		}
	}

	for (event, new_listeners) in new {
		if !old.contains_key(event) {
			patches.extend(new_listeners.iter().map(|listener| Patch::AttachListener { event, listener }))
		}
	}

	patches
}

/// Diffs attributes other than [`STYLE`].
///
/// Removed attributes are removed, added or changed ones are (re)written.
#[must_use]
pub fn diff_props<'a>(old: &'a Attributes, new: &'a Attributes) -> Vec<Patch<'a>> {
	let mut patches = Vec::new();

	for (name, old_value) in old {
		if name == STYLE {
			continue;
		}
		match new.get(name) {
			None => patches.push(Patch::RemoveAttribute { name }),
			Some(value) if value != old_value => patches.push(Patch::SetAttribute { name, value }),
			Some(_) => (),
		}
	}

	for (name, value) in new {
		if name != STYLE && !old.contains_key(name) {
			patches.push(Patch::SetAttribute { name, value })
		}
	}

	patches
}

/// Diffs the [`STYLE`] attribute by value, producing at most one wholesale replacement.
#[must_use]
pub fn diff_style<'a>(old: &'a Attributes, new: &'a Attributes) -> Option<Patch<'a>> {
	let (old, new) = (old.get(STYLE), new.get(STYLE));
	if old == new {
		None
	} else {
		Some(Patch::ReplaceStyle { old, new })
	}
}

/// Diffs two child lists.
///
/// Keyed new children are matched with the old child of the same key, wherever it is.
/// Unkeyed ones are paired positionally with the next unkeyed old child.
/// Keyed old children that find no match are removed at the end.
///
/// Old children without a match are removed first, so that every later index refers to the new child list.
/// Moved keyed children are then put back in order by the [`Patch::Reposition`] that [`reconcile`] emits for them,
/// and reused unkeyed or static children get one here since earlier moves can shift them.
/// Repositioning is a no-op for a child that is already in place.
///
/// This isn't move-count-optimal: A child moving forward can cause its siblings to be repositioned too.
#[must_use]
#[instrument(skip(old, new), fields(old.len = old.len(), new.len = new.len()))]
pub fn diff_children<'a>(old: &'a [VNode], new: &'a [VNode]) -> Vec<Patch<'a>> {
	let mut pool = HashMap::<&Key, &VNode>::new();
	let mut shadowed = Vec::new();
	for child in old {
		if let Some(key) = &child.key {
			match pool.entry(key) {
				Entry::Vacant(vacant) => {
					vacant.insert(child);
				}
				Entry::Occupied(_) => {
					warn!("Duplicate key {:?} among old children. Only the first one can be reused.", crate::loggable(key));
					shadowed.push(child);
				}
			}
		}
	}

	let mut patches = Vec::new();
	let mut descend = |target, child_patches: Vec<Patch<'a>>| {
		if !child_patches.is_empty() {
			patches.push(Patch::Descend { target, patches: child_patches })
		}
	};

	let (mut i_old, mut i_new) = (0, 0);
	while i_old < old.len() || i_new < new.len() {
		let old_child = old.get(i_old);
		let new_child = new.get(i_new);

		if let Some(key) = new_child.and_then(|new_child| new_child.key.as_ref()) {
			if let Some(matched) = pool.remove(key) {
				let span = trace_span!("Matched by key", key = ?crate::loggable(key), i_new);
				let _enter = span.enter();
				let target = matched.live();
				let mut child_patches = reconcile(Some(matched), new_child, Some(i_new));
				reposition_reused(&mut child_patches, target, new_child, i_new);
				descend(target, child_patches);
				i_new += 1;
				continue;
			}
		}

		if let Some(old_child) = old_child {
			if old_child.key.is_some() {
				trace!(key = ?crate::loggable(&old_child.key), "Reserving keyed old child.");
				i_old += 1;
				continue;
			}
		}

		let target = old_child.and_then(VNode::live);
		let mut child_patches = reconcile(old_child, new_child, Some(i_new));
		reposition_reused(&mut child_patches, target, new_child, i_new);
		descend(target, child_patches);
		i_old += 1;
		i_new += 1;
	}

	let unmatched = old.iter().filter(|child| child.key.as_ref().and_then(|key| pool.get(key)).map_or(false, |pooled| ptr::eq(*pooled, *child)));
	let mut removals = Vec::new();
	for child in unmatched.chain(shadowed) {
		match child.live() {
			Some(node) => removals.push(Patch::RemoveNode { node }),
			None => error!("Unmatched keyed child {:?} has no live handle. Nothing to remove.", crate::loggable(&child.key)),
		}
	}

	removals.append(&mut patches);
	removals
}

/// Adds the [`Patch::Reposition`] that [`reconcile`] only emits for keyed, non-static nodes.
fn reposition_reused<'a>(patches: &mut Vec<Patch<'a>>, previous: Option<NodeId>, new: Option<&'a VNode>, position: usize) {
	if let (Some(previous), Some(new)) = (previous, new) {
		if (new.key.is_none() || new.is_static) && new.live() == Some(previous) {
			patches.push(Patch::Reposition { previous, node: new, position })
		}
	}
}
