use std::{
	cell::Cell,
	rc::Rc,
};
use xylem_dom::{
	apply,
	diff::{diff_children, diff_listeners},
	materialize::materialize,
	memory::MemoryTree,
	reconcile,
	vnode::{AttrValue, Attributes, Component, ComponentFactory, Listener, Style},
	Error, LiveTree, NodeId, Patch, VNode,
};

/// Materializes `old` as only child of the tree's root.
fn mount(old: &VNode) -> (MemoryTree, NodeId, NodeId) {
	let mut tree = MemoryTree::new();
	let root = tree.root();
	let live = materialize(&mut tree, old).unwrap();
	tree.insert_before(root, live, None).unwrap();
	(tree, root, live)
}

#[test]
fn nothing_to_nothing() {
	assert!(reconcile(None, None, None).is_empty());
	assert!(diff_children(&[], &[]).is_empty());
}

#[test]
fn text_change_is_one_replacement() {
	let old = VNode::text("a");
	let (mut tree, root, live) = mount(&old);
	let new = VNode::text("b");

	let patches = reconcile(Some(&old), Some(&new), None);
	assert!(matches!(patches.as_slice(), [Patch::Replace { old: Some(replaced), position: None, .. }] if *replaced == live));

	apply(&mut tree, Some(live), &patches, Some(root)).unwrap();
	assert_eq!(tree.markup(root), "<root>b</root>");
	assert!(!tree.contains(live));
	assert_ne!(new.live(), None);
}

#[test]
fn kind_change_is_one_replacement() {
	let old = VNode::element("div").key(1).child(VNode::text("x"));
	let (mut tree, root, live) = mount(&old);
	let new = VNode::element("span").key(1).child(VNode::text("x"));

	let patches = reconcile(Some(&old), Some(&new), None);
	assert_eq!(patches.len(), 1);
	assert!(matches!(patches[0], Patch::Replace { .. }));

	apply(&mut tree, Some(live), &patches, Some(root)).unwrap();
	assert_eq!(tree.markup(root), "<root><span>x</span></root>");
}

#[test]
fn replacement_keeps_the_index() {
	let mut tree = MemoryTree::new();
	let root = tree.root();
	let old = vec![VNode::text("a"), VNode::element("b"), VNode::text("c")];
	for child in &old {
		let live = materialize(&mut tree, child).unwrap();
		tree.insert_before(root, live, None).unwrap();
	}
	let replaced = old[1].live().unwrap();
	let new = VNode::element("i");

	let patches = reconcile(Some(&old[1]), Some(&new), None);
	apply(&mut tree, Some(replaced), &patches, Some(root)).unwrap();
	assert_eq!(tree.markup(root), "<root>a<i></i>c</root>");
}

#[test]
fn identical_text_is_kept() {
	let old = VNode::text("same");
	let (_, _, live) = mount(&old);
	let new = VNode::text("same");

	assert!(reconcile(Some(&old), Some(&new), None).is_empty());
	assert_eq!(new.live(), Some(live));
	assert_eq!(old.live(), None);
}

#[test]
fn static_subtrees_are_skipped() {
	let old = VNode::element("div").attr("id", "a").child(VNode::element("p").child(VNode::text("x")));
	let (tree, _, live) = mount(&old);
	let paragraph = old.children[0].live();

	let new = VNode::element("div").attr("id", "changed").child(VNode::element("p").child(VNode::text("x"))).mark_static();
	assert!(reconcile(Some(&old), Some(&new), None).is_empty());

	assert_eq!(new.live(), Some(live));
	assert_eq!(new.children[0].live(), paragraph);
	assert!(new.children[0].children[0].live().is_some());
	assert_eq!(tree.attribute(live, "id"), Some("a"));
}

#[test]
fn listener_changes_are_a_symmetric_difference() {
	let (kept, dropped, added, unrelated) = (Listener::new(|_| ()), Listener::new(|_| ()), Listener::new(|_| ()), Listener::new(|_| ()));
	let old = VNode::element("button").on("click", dropped.clone()).on("click", kept.clone()).on("input", unrelated.clone());
	let (mut tree, root, live) = mount(&old);
	let new = VNode::element("button").on("click", kept.clone()).on("click", added.clone());

	let patches = diff_listeners(&old.listeners, &new.listeners);
	assert_eq!(patches.len(), 3);
	assert!(patches.iter().any(|patch| matches!(patch, Patch::DetachListener { event: "click", listener } if **listener == dropped)));
	assert!(patches.iter().any(|patch| matches!(patch, Patch::DetachListener { event: "input", listener } if **listener == unrelated)));
	assert!(patches.iter().any(|patch| matches!(patch, Patch::AttachListener { event: "click", listener } if **listener == added)));

	let patches = reconcile(Some(&old), Some(&new), None);
	apply(&mut tree, Some(live), &patches, Some(root)).unwrap();
	assert_eq!(tree.listeners(live, "click"), vec![kept, added]);
	assert!(tree.listeners(live, "input").is_empty());
}

#[test]
fn listeners_are_called() {
	let clicks = Rc::new(Cell::new(0));
	let listener = {
		let clicks = Rc::clone(&clicks);
		Listener::new(move |payload| {
			assert_eq!(payload.downcast_ref::<&str>(), Some(&"payload"));
			clicks.set(clicks.get() + 1)
		})
	};
	let old = VNode::element("button").on("click", listener);
	let (tree, _, live) = mount(&old);

	assert_eq!(tree.dispatch(live, "click", &"payload"), 1);
	assert_eq!(clicks.get(), 1);
}

#[test]
fn attributes_are_diffed_by_value() {
	let old = VNode::element("input").attr("id", "a").attr("class", "x").attr("value", 1).attr("disabled", true);
	let (mut tree, root, live) = mount(&old);
	assert_eq!(tree.markup(root), r#"<root><input class="x" disabled="" id="a" value="1"></input></root>"#);

	let new = VNode::element("input").attr("id", "b").attr("value", 1).attr("disabled", false).attr("title", "t");
	let patches = reconcile(Some(&old), Some(&new), None);
	assert_eq!(patches.len(), 4);

	apply(&mut tree, Some(live), &patches, Some(root)).unwrap();
	assert_eq!(tree.markup(root), r#"<root><input id="b" title="t" value="1"></input></root>"#);
	assert_eq!(tree.property(live, "id"), Some(&AttrValue::from("b")));
	assert_eq!(tree.property(live, "disabled"), Some(&AttrValue::Bool(false)));
	assert_eq!(tree.property(live, "class"), None);
}

#[test]
fn style_maps_are_replaced_wholesale() {
	let old = VNode::element("div").style(Style::map(vec![("color", "red"), ("margin", "0")]));
	let (mut tree, root, live) = mount(&old);
	assert_eq!(tree.style_property(live, "margin"), Some("0"));

	let new = VNode::element("div").style(Style::map(vec![("color", "blue")]));
	let patches = reconcile(Some(&old), Some(&new), None);
	assert!(matches!(patches.as_slice(), [Patch::ReplaceStyle { old: Some(_), new: Some(_) }]));

	apply(&mut tree, Some(live), &patches, Some(root)).unwrap();
	assert_eq!(tree.style_property(live, "color"), Some("blue"));
	assert_eq!(tree.style_property(live, "margin"), None);
}

#[test]
fn inline_style_to_map() {
	let old = VNode::element("div").style(Style::Inline("color: red;".into()));
	let (mut tree, root, live) = mount(&old);
	assert_eq!(tree.markup(root), r#"<root><div style="color: red;"></div></root>"#);

	let new = VNode::element("div").style(Style::map(vec![("color", "blue")]));
	let patches = reconcile(Some(&old), Some(&new), None);
	apply(&mut tree, Some(live), &patches, Some(root)).unwrap();
	assert_eq!(tree.attribute(live, "style"), None);
	assert_eq!(tree.markup(root), r#"<root><div style="color: blue;"></div></root>"#);

	let unstyled = VNode::element("div");
	let patches = reconcile(Some(&new), Some(&unstyled), None);
	apply(&mut tree, Some(live), &patches, Some(root)).unwrap();
	assert_eq!(tree.markup(root), "<root><div></div></root>");
}

#[test]
fn patch_order() {
	let listener = Listener::new(|_| ());
	let old = VNode::element("li").key(1).attr("class", "a").child(VNode::text("x"));
	let (_, _, live) = mount(&old);
	let new = VNode::element("li")
		.key(1)
		.attr("class", "b")
		.style(Style::map(vec![("color", "red")]))
		.on("click", listener)
		.child(VNode::text("y"));

	let patches = reconcile(Some(&old), Some(&new), Some(0));
	assert!(
		matches!(
			patches.as_slice(),
			[
				Patch::AttachListener { .. },
				Patch::ReplaceStyle { .. },
				Patch::SetAttribute { name: "class", .. },
				Patch::Descend { .. },
				Patch::Reposition { previous, position: 0, .. },
			] if *previous == live
		),
		"{:#?}",
		patches
	);
}

#[test]
fn removal_without_live_handle_is_skipped() {
	let never_rendered = VNode::text("ghost");
	assert!(reconcile(Some(&never_rendered), None, None).is_empty());
}

#[test]
fn insertion_needs_a_parent() {
	let mut tree = MemoryTree::new();
	let new = VNode::text("orphan");
	let patches = reconcile(None, Some(&new), None);
	assert!(matches!(apply(&mut tree, None, &patches, None), Err(Error::MissingParent)));
}

struct Labeled {
	props: Attributes,
	mount_point: NodeId,
	forwarded: Rc<Cell<usize>>,
}
impl Component for Labeled {
	fn props(&self) -> &Attributes {
		&self.props
	}

	fn set_props(&mut self, props: Attributes) {
		self.forwarded.set(self.forwarded.get() + 1);
		self.props = props;
	}

	fn mount_point(&self) -> NodeId {
		self.mount_point
	}
}

#[derive(Default)]
struct LabeledFactory {
	created: Cell<usize>,
	forwarded: Rc<Cell<usize>>,
}
impl ComponentFactory for LabeledFactory {
	fn name(&self) -> &str {
		"Labeled"
	}

	fn create(&self, props: &Attributes, _children: &[VNode], tree: &mut dyn LiveTree) -> Result<Box<dyn Component>, Error> {
		let mount_point = tree.create_element("section")?;
		self.created.set(self.created.get() + 1);
		Ok(Box::new(Labeled {
			props: props.clone(),
			mount_point,
			forwarded: Rc::clone(&self.forwarded),
		}))
	}
}

#[test]
fn components_receive_props() {
	let factory = Rc::new(LabeledFactory::default());
	let old = VNode::component(factory.clone()).attr("label", "a");
	let (mut tree, root, live) = mount(&old);
	assert_eq!(tree.markup(root), "<root><section></section></root>");
	let instance = old.instance().unwrap();

	let new = VNode::component(factory.clone()).attr("label", "b");
	let patches = reconcile(Some(&old), Some(&new), None);
	assert!(matches!(patches.as_slice(), [Patch::ForwardProps { .. }]));
	apply(&mut tree, Some(live), &patches, Some(root)).unwrap();

	assert_eq!(factory.created.get(), 1);
	assert_eq!(factory.forwarded.get(), 1);
	assert!(Rc::ptr_eq(&new.instance().unwrap(), &instance));
	assert!(old.instance().is_none());
	assert_eq!(instance.borrow().props().get("label"), Some(&AttrValue::from("b")));
	assert_eq!(new.live(), Some(live));
}

#[test]
fn different_factories_replace() {
	let (first, second) = (Rc::new(LabeledFactory::default()), Rc::new(LabeledFactory::default()));
	let old = VNode::component(first.clone());
	let (mut tree, root, live) = mount(&old);

	let new = VNode::component(second.clone());
	let patches = reconcile(Some(&old), Some(&new), None);
	apply(&mut tree, Some(live), &patches, Some(root)).unwrap();

	assert_eq!((first.created.get(), second.created.get()), (1, 1));
	assert_eq!(first.forwarded.get(), 0);
	assert!(!tree.contains(live));
}
