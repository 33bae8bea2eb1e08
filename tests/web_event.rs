#![cfg(target_arch = "wasm32")]

use std::{cell::Cell, rc::Rc, sync::Once};
use wasm_bindgen::JsCast;
use wasm_bindgen_test::{wasm_bindgen_test, wasm_bindgen_test_configure};
use web_sys::{window, HtmlBodyElement, HtmlElement, HtmlInputElement};
use xylem_dom::{vnode::Listener, web::WebDom, LiveTree, Root, VNode};

wasm_bindgen_test_configure!(run_in_browser);

static LOG_INIT: Once = Once::new();

fn body() -> HtmlBodyElement {
	LOG_INIT.call_once(tracing_wasm::set_as_global_default);
	let body = window().unwrap().document().unwrap().body().unwrap().dyn_into::<HtmlBodyElement>().unwrap();
	body.set_inner_html("");
	body
}

fn by_id<T: JsCast>(id: &str) -> T {
	window().unwrap().document().unwrap().get_element_by_id(id).unwrap().dyn_into().unwrap()
}

#[wasm_bindgen_test]
fn click() {
	let body = body();
	let dom = WebDom::new_for_element(body.into()).unwrap();
	let element = dom.root();
	let mut root = Root::new(dom, element);

	let click_count = Rc::new(Cell::new(0));
	let listener = {
		let click_count = Rc::clone(&click_count);
		Listener::new(move |event| {
			assert!(event.downcast_ref::<web_sys::Event>().is_some(), "Expected Event but received something else.");
			click_count.set(click_count.get() + 1)
		})
	};
	let button = || VNode::element("button").attr("id", "test-button").on("click", listener.clone());

	root.update(vec![button()]).unwrap();
	assert_eq!(click_count.get(), 0);

	by_id::<HtmlElement>("test-button").click();
	assert_eq!(click_count.get(), 1);

	root.update(vec![button()]).unwrap();
	by_id::<HtmlElement>("test-button").click();
	assert_eq!(click_count.get(), 2);

	root.update(vec![VNode::element("button").attr("id", "test-button")]).unwrap();
	by_id::<HtmlElement>("test-button").click();
	assert_eq!(click_count.get(), 2);

	root.update(Vec::new()).unwrap();
}

#[wasm_bindgen_test]
fn input_value_is_mirrored_as_property() {
	let body = body();
	let dom = WebDom::new_for_element(body.into()).unwrap();
	let element = dom.root();
	let mut root = Root::new(dom, element);

	root.update(vec![VNode::element("input").attr("id", "test-input").attr("value", "a")]).unwrap();
	let input = by_id::<HtmlInputElement>("test-input");
	input.set_value("typed");

	root.update(vec![VNode::element("input").attr("id", "test-input").attr("value", "b")]).unwrap();
	assert_eq!(input.value(), "b");

	root.update(Vec::new()).unwrap();
}

#[wasm_bindgen_test]
fn focus_survives_reordering() {
	let body = body();
	let dom = WebDom::new_for_element(body.into()).unwrap();
	let element = dom.root();
	let mut root = Root::new(dom, element);

	let input = || VNode::element("input").key(2).attr("id", "focused-input");
	root.update(vec![VNode::element("p").key(1), input()]).unwrap();
	by_id::<HtmlElement>("focused-input").focus().unwrap();
	let focused = root.tree().focused();
	assert!(focused.is_some());

	root.update(vec![input(), VNode::element("p").key(1)]).unwrap();
	assert_eq!(root.tree().focused(), focused);

	root.update(Vec::new()).unwrap();
}

#[wasm_bindgen_test]
fn adoption_drops_comments() {
	let body = body();
	body.set_inner_html("<!--stray--><p>kept</p>");
	let dom = WebDom::new_for_element(body.clone().into()).unwrap();
	let element = dom.root();
	let mut root = Root::adopt(dom, element).unwrap();
	assert_eq!(body.inner_html(), "<p>kept</p>");

	root.update(vec![VNode::element("p").child(VNode::text("kept"))]).unwrap();
	assert_eq!(body.inner_html(), "<p>kept</p>");

	root.update(Vec::new()).unwrap();
}

#[wasm_bindgen_test]
fn replacing_the_focused_node_does_not_focus_its_replacement() {
	let body = body();
	let dom = WebDom::new_for_element(body.into()).unwrap();
	let element = dom.root();
	let mut root = Root::new(dom, element);

	root.update(vec![VNode::element("input").attr("id", "replaced-input")]).unwrap();
	by_id::<HtmlElement>("replaced-input").focus().unwrap();

	root.update(vec![VNode::element("button").attr("id", "replacement")]).unwrap();

	let replacement = by_id::<web_sys::Node>("replacement");
	let active = window().unwrap().document().unwrap().active_element();
	assert!(active.map_or(true, |active| !active.is_same_node(Some(&replacement))));

	root.update(Vec::new()).unwrap();
}
