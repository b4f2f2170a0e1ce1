use super::*;

mod attrs_and_classes;
mod core_nodes;
mod serialize;
mod text_content;
mod traversal_and_query;
mod tree_mutation;

pub(crate) use attrs_and_classes::validate_class_token;

// Recursive walks grow the stack on demand so deeply nested fixtures do not overflow.
const STACK_RED_ZONE: usize = 64 * 1024;
const STACK_GROW_SIZE: usize = 2 * 1024 * 1024;

#[derive(Debug, Clone)]
pub(crate) struct Dom {
    pub(crate) nodes: Vec<Node>,
    pub(crate) root: NodeId,
    pub(crate) id_index: HashMap<String, Vec<NodeId>>,
}
