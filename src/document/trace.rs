use super::*;

impl Document {
    pub fn enable_trace(&mut self, enabled: bool) {
        self.trace_state.enabled = enabled;
    }

    pub fn set_trace_mutations(&mut self, enabled: bool) {
        self.trace_state.mutations = enabled;
    }

    pub fn set_trace_timers(&mut self, enabled: bool) {
        self.trace_state.timers = enabled;
    }

    pub fn set_trace_watch(&mut self, enabled: bool) {
        self.trace_state.watch = enabled;
    }

    /// Also emit every trace line as a `tracing` debug event.
    pub fn set_trace_forward(&mut self, enabled: bool) {
        self.trace_state.forward = enabled;
    }

    pub fn set_trace_log_limit(&mut self, max_entries: usize) -> Result<()> {
        if max_entries == 0 {
            return Err(Error::DomOperation(
                "set_trace_log_limit requires at least 1 entry".into(),
            ));
        }
        self.trace_state.log_limit = max_entries;
        while self.trace_state.logs.len() > self.trace_state.log_limit {
            self.trace_state.logs.pop_front();
        }
        Ok(())
    }

    pub fn take_trace_logs(&mut self) -> Vec<String> {
        self.trace_state.logs.drain(..).collect()
    }

    pub(crate) fn trace_mutation_line(&mut self, line: String) {
        if self.trace_state.enabled && self.trace_state.mutations {
            self.trace_line(line);
        }
    }

    pub(crate) fn trace_timer_line(&mut self, line: String) {
        if self.trace_state.enabled && self.trace_state.timers {
            self.trace_line(line);
        }
    }

    pub(crate) fn trace_watch_line(&mut self, line: String) {
        if self.trace_state.enabled && self.trace_state.watch {
            self.trace_line(line);
        }
    }

    fn trace_line(&mut self, line: String) {
        if self.trace_state.forward {
            tracing::debug!(target: "dom_change_watcher", "{line}");
        }
        if self.trace_state.logs.len() >= self.trace_state.log_limit {
            self.trace_state.logs.pop_front();
        }
        self.trace_state.logs.push_back(line);
    }
}
