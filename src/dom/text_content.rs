use super::*;

impl Dom {
    pub(crate) fn text_content(&self, node_id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(node_id, &mut out);
        out
    }

    fn collect_text(&self, node_id: NodeId, out: &mut String) {
        stacker::maybe_grow(STACK_RED_ZONE, STACK_GROW_SIZE, || {
            let Some(node) = self.nodes.get(node_id.0) else {
                return;
            };
            match &node.node_type {
                NodeType::Document | NodeType::Element(_) => {
                    for child in &node.children {
                        self.collect_text(*child, out);
                    }
                }
                NodeType::Text(text) => out.push_str(text),
            }
        })
    }

    /// Replaces the children of an element with a single text node.
    ///
    /// Returns the removed children and the inserted text node, if any.
    pub(crate) fn set_text_content(
        &mut self,
        node_id: NodeId,
        value: &str,
    ) -> Result<(Vec<NodeId>, Option<NodeId>)> {
        if self.element(node_id).is_none() {
            return Err(Error::DomOperation(
                "textContent target is not an element".into(),
            ));
        }
        let removed = self.take_children(node_id);
        let added = if value.is_empty() {
            None
        } else {
            Some(self.create_text(node_id, value.to_string()))
        };
        if !removed.is_empty() {
            self.rebuild_id_index();
        }
        Ok((removed, added))
    }

    /// Returns the previous character data.
    pub(crate) fn set_character_data(&mut self, node_id: NodeId, value: &str) -> Result<String> {
        match self.nodes.get_mut(node_id.0).map(|node| &mut node.node_type) {
            Some(NodeType::Text(text)) => Ok(std::mem::replace(text, value.to_string())),
            _ => Err(Error::DomOperation(
                "character data target is not a text node".into(),
            )),
        }
    }
}
