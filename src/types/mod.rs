pub mod span;
pub mod guarantees;
pub mod relation;

pub use span::{Span, NamedCapture};
pub use guarantees::{Guarantees, SortOrder};
pub use relation::{Relation, RelationSpanMode};
