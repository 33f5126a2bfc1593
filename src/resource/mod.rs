//! Resource subsystem
//!
//! A resource binds a [`Schema`](crate::schema::Schema), an optional
//! [`Storer`] and a [`Conf`]. The [`Index`] maps request paths to resources
//! and is shared read-only while serving.

mod conf;
mod context;
mod index;
mod item;
mod storer;

pub use conf::{Conf, Mode, Modes};
pub use context::{CancelHandle, RequestContext};
pub use index::{Index, IndexError, IndexResult, ParentRef, Resource, Route};
pub use item::{Item, ItemList, Payload};
pub use storer::{StorageError, StorageResult, Storer};
