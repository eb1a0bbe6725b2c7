pub mod builder;
pub mod natural_sort;
pub mod node;
pub mod table;

pub use builder::{build_tree, KeyRewriter, KeyTreeBuilder};
pub use natural_sort::{natural_cmp, sort_children};
pub use node::{LocNode, LocalizationTree};
pub use table::{LocalizationRow, TableReader};
