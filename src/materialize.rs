use crate::{
	live::{LiveTree, NodeId},
	patch::{write_attribute, write_style},
	vnode::{Kind, VNode, STYLE},
	Error,
};
use std::{cell::RefCell, rc::Rc};
use tracing::{instrument, trace_span};

/// Builds a live node for `node` from scratch and records it as `node`'s live handle.
///
/// The result is not attached to anything yet.
/// A component's own output is the component's business; only its mount point is returned here.
///
/// # Errors
///
/// The first error returned by a [`LiveTree`] primitive or component factory.
#[instrument(skip(tree, node), fields(kind = ?node.kind))]
pub fn materialize(tree: &mut dyn LiveTree, node: &VNode) -> Result<NodeId, Error> {
	let live = match &node.kind {
		Kind::Component(factory) => {
			let span = trace_span!("Creating component", name = factory.name());
			let _enter = span.enter();
			let instance = factory.create(&node.attributes, &node.children, tree)?;
			let live = instance.mount_point();
			node.set_instance(Rc::new(RefCell::new(instance)));
			attach_listeners(tree, live, node)?;
			live
		}

		Kind::Text(text) => {
			let span = trace_span!("Creating text node", text = ?crate::loggable(text));
			let _enter = span.enter();
			tree.create_text(text)?
		}

		Kind::Element(tag) => {
			let span = trace_span!("Creating element", tag = &**tag, "children.len()" = node.children.len());
			let _enter = span.enter();
			let live = tree.create_element(tag)?;

			for (name, value) in &node.attributes {
				if name == STYLE {
					write_style(tree, live, value)?
				} else {
					write_attribute(tree, live, name, value)?
				}
			}

			attach_listeners(tree, live, node)?;

			for child in &node.children {
				let child = materialize(tree, child)?;
				tree.insert_before(live, child, None)?
			}
			live
		}
	};

	node.set_live(live);
	Ok(live)
}

fn attach_listeners(tree: &mut dyn LiveTree, live: NodeId, node: &VNode) -> Result<(), Error> {
	for (event, listeners) in &node.listeners {
		for listener in listeners {
			tree.add_listener(live, event, listener)?
		}
	}
	Ok(())
}
