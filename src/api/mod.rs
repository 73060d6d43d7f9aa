//! Purpose: Define the stable public Rust API boundary for screenbrew.
//! Exports: Stores, repository, and core types needed by the CLI and tests.
//! Role: Public, additive-only surface; hides internal module layout.
//! Invariants: This module is the only public path to the pipeline types.

mod remote;
mod repository;
mod store;

#[doc(hidden)]
pub use crate::core::error::to_exit_code;
pub use crate::core::error::{Error, ErrorKind};

pub use crate::core::decode::{RawDocument, decode, unknown_count};
pub use crate::core::element::{ScreenElement, SizeSpec, UNKNOWN_INDEX};
pub use crate::core::render::{TextNode, TextRole, UiNode, node_json, render};
pub use crate::core::view::{GapSize, ViewElement, to_view};

pub use remote::RemoteStore;
pub use repository::{ScreenRepository, ScreenState};
pub use store::{ApiResult, DirStore, DocumentStore, document_from_str};
