use std::sync::Arc;

/// Interned node name. Cheap to clone and to use as a map key.
pub type NodeId = Arc<str>;

#[derive(Debug, Clone)]
pub struct Node {
    pub id: NodeId,
    pub is_datacenter: bool,
}

impl Node {
    pub fn new(id: impl Into<Arc<str>>, is_datacenter: bool) -> Self {
        Self {
            id: id.into(),
            is_datacenter,
        }
    }
}
