use super::*;
use crate::dom::validate_class_token;

impl Document {
    /// Creates a detached element; attach it with [`Document::append_child`].
    pub fn create_element(&mut self, tag_name: &str) -> Result<NodeId> {
        let tag = tag_name.trim().to_ascii_lowercase();
        if tag.is_empty() || !tag.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-') {
            return Err(Error::DomOperation(format!(
                "invalid element tag name: {tag_name:?}"
            )));
        }
        Ok(self.dom.create_detached_element(tag))
    }

    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.dom.create_detached_text(text.to_string())
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        let old_parent = self.dom.append_child(parent, child)?;
        self.queue_move(old_parent, parent, child);
        Ok(())
    }

    pub fn insert_before(&mut self, parent: NodeId, child: NodeId, reference: NodeId) -> Result<()> {
        if child == reference {
            self.dom.ensure_node(child, "insertBefore")?;
            return Ok(());
        }
        let old_parent = self.dom.insert_before(parent, child, reference)?;
        self.queue_move(old_parent, parent, child);
        Ok(())
    }

    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        self.dom.remove_child(parent, child)?;
        self.queue_mutation(MutationRecord::child_list(parent, Vec::new(), vec![child]));
        Ok(())
    }

    /// Detaches `node` from its parent. Already detached nodes are left alone.
    pub fn remove_node(&mut self, node: NodeId) -> Result<()> {
        self.dom.ensure_node(node, "remove")?;
        if node == self.dom.root {
            return Err(Error::DomOperation("cannot remove document root".into()));
        }
        let Some(parent) = self.dom.parent(node) else {
            return Ok(());
        };
        self.remove_child(parent, node)
    }

    /// `textContent` setter: elements get their children replaced by one text node,
    /// text nodes get their data replaced.
    pub fn set_text_content(&mut self, node: NodeId, text: &str) -> Result<()> {
        self.dom.ensure_node(node, "textContent")?;
        if self.dom.is_text(node) {
            return self.set_character_data(node, text);
        }
        let (removed, added) = self.dom.set_text_content(node, text)?;
        if removed.is_empty() && added.is_none() {
            return Ok(());
        }
        self.queue_mutation(MutationRecord::child_list(
            node,
            added.into_iter().collect(),
            removed,
        ));
        Ok(())
    }

    pub fn set_character_data(&mut self, node: NodeId, text: &str) -> Result<()> {
        self.dom.ensure_node(node, "characterData")?;
        let old = self.dom.set_character_data(node, text)?;
        self.queue_mutation(MutationRecord::character_data(node, old));
        Ok(())
    }

    pub fn set_attr(&mut self, node: NodeId, name: &str, value: &str) -> Result<()> {
        self.dom.ensure_node(node, "setAttribute")?;
        let old = self.dom.set_attr(node, name, value)?;
        self.queue_mutation(MutationRecord::attribute(node, name, old));
        Ok(())
    }

    pub fn remove_attr(&mut self, node: NodeId, name: &str) -> Result<()> {
        self.dom.ensure_node(node, "removeAttribute")?;
        if let Some(old) = self.dom.remove_attr(node, name)? {
            self.queue_mutation(MutationRecord::attribute(node, name, Some(old)));
        }
        Ok(())
    }

    pub fn class_add(&mut self, node: NodeId, class_name: &str) -> Result<()> {
        validate_class_token(class_name)?;
        self.update_classes(node, |classes| {
            if !classes.iter().any(|name| name == class_name) {
                classes.push(class_name.to_string());
            }
        })
    }

    pub fn class_remove(&mut self, node: NodeId, class_name: &str) -> Result<()> {
        validate_class_token(class_name)?;
        self.update_classes(node, |classes| classes.retain(|name| name != class_name))
    }

    /// Returns whether the class is present afterwards.
    pub fn class_toggle(&mut self, node: NodeId, class_name: &str) -> Result<bool> {
        validate_class_token(class_name)?;
        if self.dom.class_contains(node, class_name)? {
            self.class_remove(node, class_name)?;
            Ok(false)
        } else {
            self.class_add(node, class_name)?;
            Ok(true)
        }
    }

    fn update_classes(&mut self, node: NodeId, update: impl FnOnce(&mut Vec<String>)) -> Result<()> {
        self.dom.ensure_node(node, "classList")?;
        let old = self.dom.update_classes(node, update)?;
        // Like classList: no attribute, nothing to write, no record.
        if old.is_none() && self.dom.attr(node, "class").is_none() {
            return Ok(());
        }
        self.queue_mutation(MutationRecord::attribute(node, "class", old));
        Ok(())
    }

    fn queue_move(&mut self, old_parent: Option<NodeId>, parent: NodeId, child: NodeId) {
        if let Some(old_parent) = old_parent {
            self.queue_mutation(MutationRecord::child_list(old_parent, Vec::new(), vec![child]));
        }
        self.queue_mutation(MutationRecord::child_list(parent, vec![child], Vec::new()));
    }
}
