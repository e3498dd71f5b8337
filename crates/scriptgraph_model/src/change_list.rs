// SPDX-License-Identifier: MIT OR Apache-2.0
//! Per-pass record of what changed in a graph.

use crate::element::ElementId;
use indexmap::IndexSet;

/// Elements touched since the last reconciliation pass
#[derive(Debug, Clone, Default)]
pub struct ChangeList {
    /// Created or modified elements
    pub changed: IndexSet<ElementId>,
    /// Elements removed from the model
    pub deleted: IndexSet<ElementId>,
    /// Blackboard contents changed
    pub blackboard_changed: bool,
}

impl ChangeList {
    /// Create an empty change-list
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a created or modified element
    pub fn mark_changed(&mut self, element: impl Into<ElementId>) -> &mut Self {
        self.changed.insert(element.into());
        self
    }

    /// Record a deleted element
    pub fn mark_deleted(&mut self, element: impl Into<ElementId>) -> &mut Self {
        let element = element.into();
        if matches!(element, ElementId::Variable(_)) {
            self.blackboard_changed = true;
        }
        self.deleted.insert(element);
        self
    }

    /// Whether an element was deleted during this pass
    pub fn is_deleted(&self, element: ElementId) -> bool {
        self.deleted.contains(&element)
    }

    /// Whether nothing was recorded
    pub fn is_empty(&self) -> bool {
        self.changed.is_empty() && self.deleted.is_empty()
    }

    /// Forget everything recorded
    pub fn clear(&mut self) {
        self.changed.clear();
        self.deleted.clear();
        self.blackboard_changed = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeId;
    use crate::variable::VariableId;

    #[test]
    fn test_only_variable_deletion_flags_blackboard() {
        let mut changes = ChangeList::new();
        changes.mark_changed(NodeId::new()).mark_deleted(NodeId::new());
        assert!(!changes.blackboard_changed);

        let variable = VariableId::new();
        changes.mark_deleted(variable);
        assert!(changes.blackboard_changed);
        assert!(changes.is_deleted(ElementId::Variable(variable)));

        changes.clear();
        assert!(changes.is_empty());
        assert!(!changes.blackboard_changed);
    }
}
