//! Build parameters shared by every node of a tree.

/// Configuration controlling how an octree is built and maintained.
///
/// A tree takes its own copy at construction; `auto_delete_if_empty` can be
/// toggled afterwards through the tree's accessor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OctreeBuildParameter {
    /// Smallest node extent that still subdivides. A node whose bound is
    /// below this size on every axis becomes a leaf regardless of payload.
    pub min_size: f32,
    /// Whether a node that becomes empty detaches itself from its parent,
    /// cascading up through newly emptied ancestors.
    pub auto_delete_if_empty: bool,
    /// Whether the root bound is replaced by its smallest enclosing cube
    /// before the top-level build.
    pub cubify: bool,
}

impl Default for OctreeBuildParameter {
    fn default() -> Self {
        Self {
            min_size: 1.0,
            auto_delete_if_empty: true,
            cubify: false,
        }
    }
}

impl OctreeBuildParameter {
    /// Creates parameters with the given minimum node size and empty-node
    /// deletion policy.
    pub fn new(min_size: f32, auto_delete_if_empty: bool) -> Self {
        Self {
            min_size,
            auto_delete_if_empty,
            ..Self::default()
        }
    }

    /// Creates parameters with the given minimum node size.
    pub fn with_min_size(min_size: f32) -> Self {
        Self {
            min_size,
            ..Self::default()
        }
    }

    /// Creates parameters with the given empty-node deletion policy.
    pub fn with_auto_delete(auto_delete_if_empty: bool) -> Self {
        Self {
            auto_delete_if_empty,
            ..Self::default()
        }
    }
}
