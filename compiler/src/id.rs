// id.rs — Arena identifiers for graph values and backend handles
//
// A `NodeId` is a non-owning edge into a `Graph`'s node table: every node has
// exactly one output, so the node index doubles as the value reference.
// A `Handle` names a backend value produced while lowering.

use std::fmt;

use serde::Serialize;

/// Index of a node (and of its single output value) within a graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct NodeId(pub u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%{}", self.0)
    }
}

/// Backend-native value handle, produced by the lowering context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Handle(pub u32);

impl Handle {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "h{}", self.0)
    }
}

/// Allocator for backend handles. Produces monotonically increasing handles
/// in emission order, so lowering the same graph twice yields the same program.
#[derive(Debug, Default)]
pub struct HandleAllocator {
    next: u32,
}

impl HandleAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self) -> Handle {
        let h = Handle(self.next);
        self.next += 1;
        h
    }

    /// Number of handles allocated so far.
    pub fn count(&self) -> usize {
        self.next as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handles_are_sequential() {
        let mut alloc = HandleAllocator::new();
        assert_eq!(alloc.alloc(), Handle(0));
        assert_eq!(alloc.alloc(), Handle(1));
        assert_eq!(alloc.count(), 2);
    }

    #[test]
    fn display_forms() {
        assert_eq!(NodeId(3).to_string(), "%3");
        assert_eq!(Handle(7).to_string(), "h7");
    }
}
