use super::*;

impl Dom {
    pub(crate) fn dump_node(&self, node_id: NodeId) -> String {
        let mut out = String::new();
        self.write_node(node_id, &mut out);
        out
    }

    fn write_node(&self, node_id: NodeId, out: &mut String) {
        stacker::maybe_grow(STACK_RED_ZONE, STACK_GROW_SIZE, || {
            let Some(node) = self.nodes.get(node_id.0) else {
                return;
            };
            match &node.node_type {
                NodeType::Document => {
                    for child in &node.children {
                        self.write_node(*child, out);
                    }
                }
                NodeType::Text(text) => out.push_str(&escape_html_text(text)),
                NodeType::Element(element) => {
                    out.push('<');
                    out.push_str(&element.tag_name);
                    let mut attrs = element.attrs.iter().collect::<Vec<_>>();
                    attrs.sort_by(|(left, _), (right, _)| left.cmp(right));
                    for (name, value) in attrs {
                        out.push(' ');
                        out.push_str(name);
                        out.push_str("=\"");
                        out.push_str(&escape_html_attr(value));
                        out.push('"');
                    }
                    out.push('>');
                    if crate::html::is_void_tag(&element.tag_name) {
                        return;
                    }
                    for child in &node.children {
                        self.write_node(*child, out);
                    }
                    out.push_str("</");
                    out.push_str(&element.tag_name);
                    out.push('>');
                }
            }
        })
    }

    /// Short label used in trace lines, e.g. `p#status`.
    pub(crate) fn node_label(&self, node_id: NodeId) -> String {
        match self.nodes.get(node_id.0).map(|node| &node.node_type) {
            Some(NodeType::Document) => "#document".to_string(),
            Some(NodeType::Text(_)) => format!("#text({})", node_id.0),
            Some(NodeType::Element(element)) => match element.attrs.get("id") {
                Some(id) if !id.is_empty() => format!("{}#{id}", element.tag_name),
                _ => format!("{}({})", element.tag_name, node_id.0),
            },
            None => format!("#invalid({})", node_id.0),
        }
    }
}
