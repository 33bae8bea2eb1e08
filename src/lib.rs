#![doc(html_root_url = "https://docs.rs/xylem-dom/0.0.1")]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

#[cfg(doctest)]
pub mod readme {
	doc_comment::doctest!("../README.md");
}

pub mod diff;
mod error;
pub mod live;
pub mod load;
pub mod materialize;
pub mod memory;
pub mod patch;
mod rc_hash_map;
pub mod root;
pub mod vnode;
pub mod web;

pub use diff::reconcile;
pub use error::Error;
pub use live::{LiveTree, NodeId};
pub use patch::{apply, Patch};
pub use root::Root;
pub use vnode::VNode;

use core::fmt::{self, Debug, Formatter};

/// Debug-formats the wrapped value only with the `dangerous-logging` feature.
pub(crate) struct Loggable<T>(T);
impl<T: Debug> Debug for Loggable<T> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		if cfg!(feature = "dangerous-logging") {
			self.0.fmt(f)
		} else {
			f.write_str("<redacted>")
		}
	}
}

pub(crate) fn loggable<T: Debug>(value: T) -> Loggable<T> {
	Loggable(value)
}
