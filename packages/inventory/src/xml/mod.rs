//! XML utilities for navigating Inventory DOM trees.

mod utils;

pub use utils::{
    element_children, find_by_path, find_child, find_children, get_attribute, get_optional_text,
    get_tag_name, get_text, has_tag, path_raw_text, path_text,
};
