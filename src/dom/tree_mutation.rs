use super::*;

impl Dom {
    /// Moves `child` under `parent`, returning the parent it was detached from.
    pub(crate) fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<Option<NodeId>> {
        self.check_insertion(parent, child, "appendChild")?;
        let old_parent = self.detach(child);
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
        self.rebuild_id_index();
        Ok(old_parent)
    }

    pub(crate) fn insert_before(
        &mut self,
        parent: NodeId,
        child: NodeId,
        reference: NodeId,
    ) -> Result<Option<NodeId>> {
        self.check_insertion(parent, child, "insertBefore")?;
        self.ensure_node(reference, "insertBefore")?;
        if self.parent(reference) != Some(parent) {
            return Err(Error::DomOperation(
                "insertBefore reference is not a direct child".into(),
            ));
        }
        if child == reference {
            return Ok(Some(parent));
        }

        let old_parent = self.detach(child);
        let Some(index) = self.nodes[parent.0]
            .children
            .iter()
            .position(|id| *id == reference)
        else {
            return Err(Error::DomOperation(
                "insertBefore reference is missing".into(),
            ));
        };

        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.insert(index, child);
        self.rebuild_id_index();
        Ok(old_parent)
    }

    pub(crate) fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        self.ensure_node(parent, "removeChild")?;
        self.ensure_node(child, "removeChild")?;
        if self.parent(child) != Some(parent) {
            return Err(Error::DomOperation(
                "removeChild target is not a direct child".into(),
            ));
        }
        self.nodes[parent.0].children.retain(|id| *id != child);
        self.nodes[child.0].parent = None;
        self.rebuild_id_index();
        Ok(())
    }

    /// Drops every child of `node_id` and returns them in document order.
    pub(crate) fn take_children(&mut self, node_id: NodeId) -> Vec<NodeId> {
        let old_children = std::mem::take(&mut self.nodes[node_id.0].children);
        for child in &old_children {
            self.nodes[child.0].parent = None;
        }
        old_children
    }

    fn check_insertion(&self, parent: NodeId, child: NodeId, operation: &str) -> Result<()> {
        self.ensure_node(parent, operation)?;
        self.ensure_node(child, operation)?;
        if !self.can_have_children(parent) {
            return Err(Error::DomOperation(format!(
                "{operation} target cannot have children"
            )));
        }
        if child == self.root || child == parent {
            return Err(Error::DomOperation(format!("invalid {operation} node")));
        }

        // parent must not be inside child's subtree
        let mut cursor = Some(parent);
        while let Some(node) = cursor {
            if node == child {
                return Err(Error::DomOperation(format!(
                    "{operation} would create a cycle"
                )));
            }
            cursor = self.parent(node);
        }
        Ok(())
    }

    fn detach(&mut self, child: NodeId) -> Option<NodeId> {
        let old_parent = self.parent(child)?;
        self.nodes[old_parent.0].children.retain(|id| *id != child);
        self.nodes[child.0].parent = None;
        Some(old_parent)
    }
}
