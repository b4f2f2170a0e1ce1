use super::*;
use std::cell::RefCell;
use std::rc::Rc;
use std::str::FromStr;
use unicode_normalization::UnicodeNormalization;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObservedProperty {
    /// Trimmed text content of the target's subtree.
    Text,
    /// Class token set of the target element.
    Class,
}

impl ObservedProperty {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Class => "class",
        }
    }

    pub fn observe_options(self) -> ObserveOptions {
        match self {
            Self::Text => ObserveOptions::text_subtree(),
            Self::Class => ObserveOptions::attributes_only(["class"]),
        }
    }
}

impl FromStr for ObservedProperty {
    type Err = Error;

    fn from_str(raw: &str) -> Result<Self> {
        match normalize_keyword(raw).as_str() {
            "text" => Ok(Self::Text),
            "class" => Ok(Self::Class),
            _ => Err(Error::InvalidConfig(format!(
                "unrecognized observed property: {raw:?}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TriggerDirection {
    /// Fire once the observed value starts containing the match text.
    ChangedTo,
    /// Fire once the observed value stops containing the match text.
    ChangedFrom,
}

impl TriggerDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ChangedTo => "changed_to",
            Self::ChangedFrom => "changed_from",
        }
    }

    pub fn should_fire(self, matches: bool) -> bool {
        match self {
            Self::ChangedTo => matches,
            Self::ChangedFrom => !matches,
        }
    }
}

impl FromStr for TriggerDirection {
    type Err = Error;

    fn from_str(raw: &str) -> Result<Self> {
        match normalize_keyword(raw).as_str() {
            "changed_to" => Ok(Self::ChangedTo),
            "changed_from" => Ok(Self::ChangedFrom),
            _ => Err(Error::InvalidConfig(format!(
                "unrecognized trigger direction: {raw:?}"
            ))),
        }
    }
}

fn normalize_keyword(raw: &str) -> String {
    raw.trim().to_ascii_lowercase().replace('-', "_")
}

/// Immutable description of what a [`ChangeWatcher`] waits for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchConfig {
    match_text: String,
    observed_property: ObservedProperty,
    trigger_direction: TriggerDirection,
}

impl WatchConfig {
    pub fn new(
        match_text: impl Into<String>,
        observed_property: ObservedProperty,
        trigger_direction: TriggerDirection,
    ) -> Result<Self> {
        let config = Self {
            match_text: match_text.into(),
            observed_property,
            trigger_direction,
        };
        config.validate()?;
        Ok(config)
    }

    /// Builds a config from loosely typed values, e.g. `("Waiting", "text", "changed_from")`.
    pub fn parse(match_text: &str, observed_property: &str, trigger_direction: &str) -> Result<Self> {
        Self::new(
            match_text,
            observed_property.parse()?,
            trigger_direction.parse()?,
        )
    }

    pub fn match_text(&self) -> &str {
        &self.match_text
    }

    pub fn observed_property(&self) -> ObservedProperty {
        self.observed_property
    }

    pub fn trigger_direction(&self) -> TriggerDirection {
        self.trigger_direction
    }

    fn validate(&self) -> Result<()> {
        if self.match_text.is_empty() {
            return Err(Error::InvalidConfig("match text must not be empty".into()));
        }
        if self.observed_property == ObservedProperty::Class
            && self.match_text.chars().any(char::is_whitespace)
        {
            return Err(Error::InvalidConfig(format!(
                "class match text must be a single class token: {:?}",
                self.match_text
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatcherState {
    Active,
    /// Terminal. Reached by firing, by disposal, or when the target left the document.
    Fired,
}

struct WatcherCore {
    state: WatcherState,
    observer: Option<ObserverId>,
    on_fire: Option<Box<dyn FnOnce()>>,
}

impl WatcherCore {
    /// Moves to the terminal state and hands back the subscription to release.
    fn finish(&mut self) -> Option<ObserverId> {
        self.state = WatcherState::Fired;
        self.on_fire = None;
        self.observer.take()
    }
}

/// Watches one node and calls a callback the first time a mutation batch leaves the
/// node in the configured state.
///
/// The initial state is never evaluated: only delivered batches are. Dropping the
/// handle does not stop the watch; call [`ChangeWatcher::dispose`] for that.
///
/// The target must be connected at creation. Leaving the document ends the watch
/// without firing, but only once a batch reaches the watcher: removing an ancestor
/// queues no record for the target, so [`ChangeWatcher::is_active`] stays `true` until
/// a later change inside the target is delivered.
pub struct ChangeWatcher {
    target: NodeId,
    config: WatchConfig,
    core: Rc<RefCell<WatcherCore>>,
}

impl fmt::Debug for ChangeWatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let core = self.core.borrow();
        f.debug_struct("ChangeWatcher")
            .field("target", &self.target)
            .field("config", &self.config)
            .field("state", &core.state)
            .field("observer", &core.observer)
            .finish()
    }
}

impl ChangeWatcher {
    pub fn create<S: MutationSource + 'static>(
        source: &mut S,
        target: Option<NodeId>,
        config: WatchConfig,
        on_fire: impl FnOnce() + 'static,
    ) -> Result<Self> {
        let target =
            target.ok_or_else(|| Error::InvalidTarget("watch target is absent".into()))?;
        if !source.contains_node(target) {
            return Err(Error::InvalidTarget(format!(
                "node {} does not belong to this document",
                target.0
            )));
        }
        if !source.is_connected(target) {
            return Err(Error::InvalidTarget(format!(
                "node {} is not connected to the document",
                target.0
            )));
        }
        if config.observed_property == ObservedProperty::Class && !source.is_element(target) {
            return Err(Error::InvalidTarget(format!(
                "class observation needs an element, node {} is not one",
                target.0
            )));
        }

        let core = Rc::new(RefCell::new(WatcherCore {
            state: WatcherState::Active,
            observer: None,
            on_fire: Some(Box::new(on_fire)),
        }));

        let evaluator = BatchEvaluator {
            target,
            needle: config.match_text.nfc().collect(),
            config: config.clone(),
            core: Rc::clone(&core),
        };
        let callback: MutationCallback<S> =
            Box::new(move |source: &mut S, records: &[MutationRecord], observer: ObserverId| {
                evaluator.evaluate(source, records.len(), observer);
                Ok(())
            });

        let observer =
            source.subscribe(target, config.observed_property.observe_options(), callback)?;
        core.borrow_mut().observer = Some(observer);
        source.trace_watch(format!(
            "[watch] armed observer={} node={} property={} direction={} match={:?}",
            observer.0,
            target.0,
            config.observed_property.as_str(),
            config.trigger_direction.as_str(),
            config.match_text
        ));

        Ok(Self {
            target,
            config,
            core,
        })
    }

    pub fn state(&self) -> WatcherState {
        self.core.borrow().state
    }

    pub fn is_active(&self) -> bool {
        self.state() == WatcherState::Active
    }

    pub fn target(&self) -> NodeId {
        self.target
    }

    pub fn config(&self) -> &WatchConfig {
        &self.config
    }

    /// Stops watching without calling the callback. Calling it again does nothing.
    pub fn dispose<S: MutationSource>(&self, source: &mut S) {
        let observer = self.core.borrow_mut().finish();
        if let Some(observer) = observer {
            source.unsubscribe(observer);
            source.trace_watch(format!(
                "[watch] disposed observer={} node={}",
                observer.0, self.target.0
            ));
        }
    }
}

struct BatchEvaluator {
    target: NodeId,
    config: WatchConfig,
    // NFC form of the match text, compared against NFC text content.
    needle: String,
    core: Rc<RefCell<WatcherCore>>,
}

impl BatchEvaluator {
    fn evaluate<S: MutationSource>(&self, source: &mut S, record_count: usize, observer: ObserverId) {
        if self.core.borrow().state != WatcherState::Active {
            source.unsubscribe(observer);
            return;
        }

        if !source.is_connected(self.target) {
            self.core.borrow_mut().finish();
            source.unsubscribe(observer);
            source.trace_watch(format!(
                "[watch] target detached observer={} node={}",
                observer.0, self.target.0
            ));
            return;
        }

        let (matches, observed) = match self.config.observed_property {
            ObservedProperty::Text => {
                let text = source.observed_text(self.target);
                let observed = text.trim().nfc().collect::<String>();
                (observed.contains(&self.needle), observed)
            }
            ObservedProperty::Class => {
                let present = source.has_class_token(self.target, &self.config.match_text);
                let observed = if present { "present" } else { "absent" };
                (present, format!("class {} {observed}", self.config.match_text))
            }
        };

        if !self.config.trigger_direction.should_fire(matches) {
            source.trace_watch(format!(
                "[watch] evaluate observer={} records={record_count} matches={matches} value={observed:?}",
                observer.0
            ));
            return;
        }

        let on_fire = {
            let mut core = self.core.borrow_mut();
            core.state = WatcherState::Fired;
            core.observer = None;
            core.on_fire.take()
        };
        source.trace_watch(format!(
            "[watch] fired observer={} records={record_count} value={observed:?}",
            observer.0
        ));
        if let Some(on_fire) = on_fire {
            on_fire();
        }
        source.unsubscribe(observer);
    }
}
