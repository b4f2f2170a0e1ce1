use super::*;

/// Identifies one observer registration on a [`MutationSource`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObserverId(pub(crate) usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MutationKind {
    ChildList,
    CharacterData,
    Attributes,
}

impl MutationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ChildList => "childList",
            Self::CharacterData => "characterData",
            Self::Attributes => "attributes",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationRecord {
    pub kind: MutationKind,
    pub target: NodeId,
    pub attribute_name: Option<String>,
    /// Only filled when the registration asked for old values.
    pub old_value: Option<String>,
    pub added_nodes: Vec<NodeId>,
    pub removed_nodes: Vec<NodeId>,
}

impl MutationRecord {
    pub(crate) fn child_list(target: NodeId, added: Vec<NodeId>, removed: Vec<NodeId>) -> Self {
        Self {
            kind: MutationKind::ChildList,
            target,
            attribute_name: None,
            old_value: None,
            added_nodes: added,
            removed_nodes: removed,
        }
    }

    pub(crate) fn character_data(target: NodeId, old_value: String) -> Self {
        Self {
            kind: MutationKind::CharacterData,
            target,
            attribute_name: None,
            old_value: Some(old_value),
            added_nodes: Vec::new(),
            removed_nodes: Vec::new(),
        }
    }

    pub(crate) fn attribute(target: NodeId, name: &str, old_value: Option<String>) -> Self {
        Self {
            kind: MutationKind::Attributes,
            target,
            attribute_name: Some(name.to_ascii_lowercase()),
            old_value,
            added_nodes: Vec::new(),
            removed_nodes: Vec::new(),
        }
    }
}

/// What an observer registration is interested in, mirroring `MutationObserverInit`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObserveOptions {
    pub child_list: bool,
    pub character_data: bool,
    pub attributes: bool,
    pub subtree: bool,
    pub attribute_filter: Option<Vec<String>>,
    pub attribute_old_value: bool,
    pub character_data_old_value: bool,
}

impl ObserveOptions {
    /// Text and structure changes anywhere below the target.
    pub fn text_subtree() -> Self {
        Self {
            child_list: true,
            character_data: true,
            subtree: true,
            ..Self::default()
        }
    }

    /// Changes to the given attributes of the target itself.
    pub fn attributes_only<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            attributes: true,
            attribute_filter: Some(names.into_iter().map(Into::into).collect()),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.child_list || self.character_data || self.attributes) {
            return Err(Error::InvalidConfig(
                "observe options must select childList, characterData or attributes".into(),
            ));
        }
        if !self.attributes && (self.attribute_filter.is_some() || self.attribute_old_value) {
            return Err(Error::InvalidConfig(
                "attributeFilter and attributeOldValue require attributes".into(),
            ));
        }
        if !self.character_data && self.character_data_old_value {
            return Err(Error::InvalidConfig(
                "characterDataOldValue requires characterData".into(),
            ));
        }
        Ok(())
    }

    pub(crate) fn wants(&self, record: &MutationRecord) -> bool {
        match record.kind {
            MutationKind::ChildList => self.child_list,
            MutationKind::CharacterData => self.character_data,
            MutationKind::Attributes => {
                self.attributes
                    && match (&self.attribute_filter, &record.attribute_name) {
                        (Some(filter), Some(name)) => {
                            filter.iter().any(|allowed| allowed.eq_ignore_ascii_case(name))
                        }
                        (Some(_), None) => false,
                        (None, _) => true,
                    }
            }
        }
    }

    fn keeps_old_value(&self, kind: MutationKind) -> bool {
        match kind {
            MutationKind::ChildList => false,
            MutationKind::CharacterData => self.character_data_old_value,
            MutationKind::Attributes => self.attribute_old_value,
        }
    }
}

/// Batch callback. It receives the source, the records collected since the last
/// delivery, and its own registration id so it can unsubscribe itself.
pub type MutationCallback<S> = Box<dyn FnMut(&mut S, &[MutationRecord], ObserverId) -> Result<()>>;

/// A host that can deliver batched change notifications for nodes.
///
/// [`Document`] is the in-crate implementation; the watcher only depends on this trait.
pub trait MutationSource: Sized {
    fn subscribe(
        &mut self,
        target: NodeId,
        options: ObserveOptions,
        callback: MutationCallback<Self>,
    ) -> Result<ObserverId>;

    /// Returns `false` when the registration was already gone.
    fn unsubscribe(&mut self, observer: ObserverId) -> bool;

    fn contains_node(&self, node: NodeId) -> bool;

    fn is_element(&self, node: NodeId) -> bool;

    fn is_connected(&self, node: NodeId) -> bool;

    /// Text content of `node` and its descendants.
    fn observed_text(&self, node: NodeId) -> String;

    /// `false` for non-elements.
    fn has_class_token(&self, node: NodeId, class_name: &str) -> bool;

    fn trace_watch(&mut self, _line: String) {}
}

pub(crate) struct ObserverEntry<S> {
    pub(crate) id: ObserverId,
    pub(crate) target: NodeId,
    pub(crate) options: ObserveOptions,
    pub(crate) queue: Vec<MutationRecord>,
    // Taken out while the callback runs.
    pub(crate) callback: Option<MutationCallback<S>>,
}

impl<S> fmt::Debug for ObserverEntry<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObserverEntry")
            .field("id", &self.id)
            .field("target", &self.target)
            .field("options", &self.options)
            .field("queued", &self.queue.len())
            .field("running", &self.callback.is_none())
            .finish()
    }
}

pub(crate) struct ObserverRegistry<S> {
    pub(crate) entries: Vec<ObserverEntry<S>>,
    next_id: usize,
}

impl<S> fmt::Debug for ObserverRegistry<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObserverRegistry")
            .field("entries", &self.entries)
            .field("next_id", &self.next_id)
            .finish()
    }
}

impl<S> Default for ObserverRegistry<S> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            next_id: 1,
        }
    }
}

impl<S> ObserverRegistry<S> {
    pub(crate) fn register(
        &mut self,
        target: NodeId,
        options: ObserveOptions,
        callback: MutationCallback<S>,
    ) -> ObserverId {
        let id = ObserverId(self.next_id);
        self.next_id += 1;
        self.entries.push(ObserverEntry {
            id,
            target,
            options,
            queue: Vec::new(),
            callback: Some(callback),
        });
        id
    }

    pub(crate) fn remove(&mut self, id: ObserverId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.id != id);
        before != self.entries.len()
    }

    pub(crate) fn entry_mut(&mut self, id: ObserverId) -> Option<&mut ObserverEntry<S>> {
        self.entries.iter_mut().find(|entry| entry.id == id)
    }

    /// Appends `record` to every interested registration.
    ///
    /// `is_inclusive_ancestor(a, n)` reports whether `a == n` or `a` is an ancestor of `n`
    /// at the time the mutation happened.
    pub(crate) fn enqueue(
        &mut self,
        record: &MutationRecord,
        is_inclusive_ancestor: impl Fn(NodeId, NodeId) -> bool,
    ) -> usize {
        let mut queued = 0usize;
        for entry in &mut self.entries {
            let in_scope = entry.target == record.target
                || (entry.options.subtree && is_inclusive_ancestor(entry.target, record.target));
            if !in_scope || !entry.options.wants(record) {
                continue;
            }
            let mut record = record.clone();
            if !entry.options.keeps_old_value(record.kind) {
                record.old_value = None;
            }
            entry.queue.push(record);
            queued += 1;
        }
        queued
    }

    pub(crate) fn pending_record_count(&self) -> usize {
        self.entries.iter().map(|entry| entry.queue.len()).sum()
    }

    /// Ids of registrations with queued records, in registration order.
    pub(crate) fn ready_ids(&self) -> Vec<ObserverId> {
        self.entries
            .iter()
            .filter(|entry| !entry.queue.is_empty() && entry.callback.is_some())
            .map(|entry| entry.id)
            .collect()
    }
}
