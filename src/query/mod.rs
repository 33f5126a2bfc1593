//! Query subsystem
//!
//! Compiles the `filter`, `sort`, `skip`, `limit` and `page` request
//! parameters into a canonical [`Query`].
//!
//! # Pipeline
//!
//! ```text
//! raw params -> parse_filter -> Predicate
//!            -> QueryValidator (Schema) -> Query -> Storer
//! ```
//!
//! Parsing is purely syntactic. Field existence, filterability, sortability
//! and value kinds are checked by [`QueryValidator`], which reports every
//! problem at once.

mod parser;
mod predicate;
mod sort;
mod types;
mod validator;
mod value;

pub use parser::{parse_filter, ParseError, ParseResult};
pub use predicate::{CompareOp, MembershipOp, Pattern, Predicate};
pub use sort::{Sort, SortField};
pub use types::{Query, Window};
pub use validator::{QueryValidator, RawQuery, UNLIMITED};
pub use value::{compare_total, lookup};
