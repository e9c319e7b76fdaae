//! Pluggable insertion, split and restructuring strategies for dynamic RTrees.

mod quadratic;
mod restructure;
mod r#trait;

pub use quadratic::{GuttmanQuadraticInsert, GuttmanQuadraticSplit};
pub use r#trait::{InsertStrategy, RestructureStrategy, SplitGroup, SplitGroups, SplitStrategy};
pub use restructure::{CondenseRestructure, NullRestructure};
