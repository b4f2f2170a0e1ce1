use super::*;

impl Dom {
    pub(crate) fn attr(&self, node_id: NodeId, name: &str) -> Option<String> {
        self.element(node_id)
            .and_then(|e| e.attrs.get(&name.to_ascii_lowercase()).cloned())
    }

    /// Returns the previous value of the attribute.
    pub(crate) fn set_attr(
        &mut self,
        node_id: NodeId,
        name: &str,
        value: &str,
    ) -> Result<Option<String>> {
        let lowered = name.to_ascii_lowercase();
        if lowered.is_empty() || lowered.chars().any(char::is_whitespace) {
            return Err(Error::DomOperation(format!(
                "invalid attribute name: {name:?}"
            )));
        }
        let element = self
            .element_mut(node_id)
            .ok_or_else(|| Error::DomOperation("setAttribute target is not an element".into()))?;
        let old = element.attrs.insert(lowered.clone(), value.to_string());
        if lowered == "id" {
            self.rebuild_id_index();
        }
        Ok(old)
    }

    /// Returns the removed value, or `None` when the attribute was absent.
    pub(crate) fn remove_attr(&mut self, node_id: NodeId, name: &str) -> Result<Option<String>> {
        let lowered = name.to_ascii_lowercase();
        let element = self.element_mut(node_id).ok_or_else(|| {
            Error::DomOperation("removeAttribute target is not an element".into())
        })?;
        let old = element.attrs.remove(&lowered);
        if lowered == "id" && old.is_some() {
            self.rebuild_id_index();
        }
        Ok(old)
    }

    pub(crate) fn class_contains(&self, node_id: NodeId, class_name: &str) -> Result<bool> {
        let element = self
            .element(node_id)
            .ok_or_else(|| Error::DomOperation("classList target is not an element".into()))?;
        Ok(has_class(element, class_name))
    }

    pub(crate) fn class_list(&self, node_id: NodeId) -> Result<Vec<String>> {
        let element = self
            .element(node_id)
            .ok_or_else(|| Error::DomOperation("classList target is not an element".into()))?;
        Ok(class_tokens(element.attrs.get("class").map(String::as_str)))
    }

    /// Rewrites the class attribute and returns its previous value.
    pub(crate) fn update_classes(
        &mut self,
        node_id: NodeId,
        update: impl FnOnce(&mut Vec<String>),
    ) -> Result<Option<String>> {
        let element = self
            .element_mut(node_id)
            .ok_or_else(|| Error::DomOperation("classList target is not an element".into()))?;
        let old = element.attrs.get("class").cloned();
        let mut classes = class_tokens(old.as_deref());
        update(&mut classes);
        set_class_attr(element, &classes);
        Ok(old)
    }
}

pub(crate) fn validate_class_token(class_name: &str) -> Result<()> {
    if class_name.is_empty() {
        return Err(Error::DomOperation("class token must not be empty".into()));
    }
    if class_name.chars().any(char::is_whitespace) {
        return Err(Error::DomOperation(format!(
            "class token must not contain whitespace: {class_name:?}"
        )));
    }
    Ok(())
}
