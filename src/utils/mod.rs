pub mod logging;
pub mod natural_sort;
pub mod sanitize;

pub use natural_sort::{natural_cmp, sort_naturally, sort_paths_naturally};
