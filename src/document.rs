use super::*;
use crate::mutation::ObserverRegistry;
use crate::runtime_state::{SchedulerState, TraceState};

mod assertions;
mod dom_actions;
mod trace;

/// Deterministic in-memory document that records and delivers mutation batches.
#[derive(Debug)]
pub struct Document {
    pub(crate) dom: Dom,
    pub(crate) observers: ObserverRegistry<Document>,
    pub(crate) scheduler: SchedulerState,
    pub(crate) trace_state: TraceState,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        Self::from_dom(Dom::new())
    }

    pub fn from_html(html: &str) -> Result<Self> {
        Ok(Self::from_dom(crate::html::parse_html(html)?))
    }

    fn from_dom(dom: Dom) -> Self {
        Self {
            dom,
            observers: ObserverRegistry::default(),
            scheduler: SchedulerState::default(),
            trace_state: TraceState::default(),
        }
    }

    pub fn root(&self) -> NodeId {
        self.dom.root
    }

    pub fn get_element_by_id(&self, id: &str) -> Option<NodeId> {
        self.dom.by_id(id)
    }

    pub fn query_selector(&self, selector: &str) -> Result<Option<NodeId>> {
        Ok(self.dom.query_selector_all(selector)?.into_iter().next())
    }

    pub fn query_selector_all(&self, selector: &str) -> Result<Vec<NodeId>> {
        self.dom.query_selector_all(selector)
    }

    pub fn query_selector_from(&self, root: NodeId, selector: &str) -> Result<Option<NodeId>> {
        self.dom.ensure_node(root, "querySelector")?;
        Ok(self
            .dom
            .query_selector_all_from(root, selector)?
            .into_iter()
            .next())
    }

    pub fn contains_node(&self, node: NodeId) -> bool {
        self.dom.is_valid_node(node)
    }

    pub fn is_connected(&self, node: NodeId) -> bool {
        self.dom.is_valid_node(node) && self.dom.is_connected(node)
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.dom.parent(node)
    }

    pub fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.dom.children(node).to_vec()
    }

    pub fn tag_name(&self, node: NodeId) -> Option<&str> {
        self.dom.tag_name(node)
    }

    pub fn text_content(&self, node: NodeId) -> Result<String> {
        self.dom.ensure_node(node, "textContent")?;
        Ok(self.dom.text_content(node))
    }

    pub fn attr(&self, node: NodeId, name: &str) -> Option<String> {
        self.dom.attr(node, name)
    }

    pub fn class_contains(&self, node: NodeId, class_name: &str) -> Result<bool> {
        self.dom.class_contains(node, class_name)
    }

    pub fn class_list(&self, node: NodeId) -> Result<Vec<String>> {
        self.dom.class_list(node)
    }

    pub fn outer_html(&self, node: NodeId) -> Result<String> {
        if self.dom.element(node).is_none() {
            return Err(Error::DomOperation(
                "outerHTML target is not an element".into(),
            ));
        }
        Ok(self.dom.dump_node(node))
    }

    /// Serializes the whole document.
    pub fn dump(&self) -> String {
        self.dom.dump_node(self.dom.root)
    }

    /// Registers `callback` for mutations of `target` selected by `options`.
    ///
    /// Records are queued as the document changes and handed over in one batch per
    /// registration by [`Document::flush_mutations`].
    pub fn observe(
        &mut self,
        target: NodeId,
        options: ObserveOptions,
        callback: MutationCallback<Document>,
    ) -> Result<ObserverId> {
        self.dom.ensure_node(target, "observe")?;
        options.validate()?;
        let id = self.observers.register(target, options, callback);
        let label = self.dom.node_label(target);
        self.trace_mutation_line(format!("[mutation] observe observer={} target={label}", id.0));
        Ok(id)
    }

    /// Drops the registration and anything still queued for it.
    pub fn disconnect(&mut self, observer: ObserverId) -> bool {
        let removed = self.observers.remove(observer);
        if removed {
            self.trace_mutation_line(format!("[mutation] disconnect observer={}", observer.0));
        }
        removed
    }

    pub fn take_records(&mut self, observer: ObserverId) -> Vec<MutationRecord> {
        self.observers
            .entry_mut(observer)
            .map(|entry| std::mem::take(&mut entry.queue))
            .unwrap_or_default()
    }

    pub fn pending_record_count(&self) -> usize {
        self.observers.pending_record_count()
    }

    pub fn set_mutation_round_limit(&mut self, max_rounds: usize) -> Result<()> {
        if max_rounds == 0 {
            return Err(Error::InvalidConfig(
                "set_mutation_round_limit requires at least 1 round".into(),
            ));
        }
        self.scheduler.mutation_round_limit = max_rounds;
        Ok(())
    }

    /// Delivers queued records, one batch per registration, until no registration has
    /// anything left. Returns the number of batches delivered.
    ///
    /// Calls made from inside a mutation callback return `Ok(0)`; the outer delivery
    /// loop picks up whatever the callback queued.
    pub fn flush_mutations(&mut self) -> Result<usize> {
        if self.scheduler.delivering_mutations {
            return Ok(0);
        }
        self.scheduler.delivering_mutations = true;
        let result = self.deliver_mutation_rounds();
        self.scheduler.delivering_mutations = false;
        result
    }

    fn deliver_mutation_rounds(&mut self) -> Result<usize> {
        let mut delivered = 0usize;
        let mut rounds = 0usize;
        loop {
            let ready = self.observers.ready_ids();
            if ready.is_empty() {
                return Ok(delivered);
            }
            rounds += 1;
            if rounds > self.scheduler.mutation_round_limit {
                return Err(Error::DomOperation(format!(
                    "mutation delivery exceeded {} rounds; a callback keeps mutating what it observes",
                    self.scheduler.mutation_round_limit
                )));
            }

            for id in ready {
                // An earlier callback in this round may have disconnected it.
                let Some(entry) = self.observers.entry_mut(id) else {
                    continue;
                };
                let records = std::mem::take(&mut entry.queue);
                if records.is_empty() {
                    continue;
                }
                let Some(mut callback) = entry.callback.take() else {
                    continue;
                };

                self.trace_mutation_line(format!(
                    "[mutation] deliver observer={} records={}",
                    id.0,
                    records.len()
                ));
                let outcome = callback(self, &records, id);
                if let Some(entry) = self.observers.entry_mut(id) {
                    entry.callback = Some(callback);
                }
                outcome?;
                delivered += 1;
            }
        }
    }

    pub(crate) fn queue_mutation(&mut self, record: MutationRecord) {
        let dom = &self.dom;
        let queued = self.observers.enqueue(&record, |ancestor, node| {
            ancestor == node || dom.is_descendant_of(node, ancestor)
        });
        if queued > 0 {
            let label = self.dom.node_label(record.target);
            self.trace_mutation_line(format!(
                "[mutation] queue {} target={label} observers={queued}",
                record.kind.as_str()
            ));
        }
    }
}

impl MutationSource for Document {
    fn subscribe(
        &mut self,
        target: NodeId,
        options: ObserveOptions,
        callback: MutationCallback<Self>,
    ) -> Result<ObserverId> {
        self.observe(target, options, callback)
    }

    fn unsubscribe(&mut self, observer: ObserverId) -> bool {
        self.disconnect(observer)
    }

    fn contains_node(&self, node: NodeId) -> bool {
        self.dom.is_valid_node(node)
    }

    fn is_element(&self, node: NodeId) -> bool {
        self.dom.element(node).is_some()
    }

    fn is_connected(&self, node: NodeId) -> bool {
        Document::is_connected(self, node)
    }

    fn observed_text(&self, node: NodeId) -> String {
        self.dom.text_content(node)
    }

    fn has_class_token(&self, node: NodeId, class_name: &str) -> bool {
        self.dom.class_contains(node, class_name).unwrap_or(false)
    }

    fn trace_watch(&mut self, line: String) {
        self.trace_watch_line(line);
    }
}
