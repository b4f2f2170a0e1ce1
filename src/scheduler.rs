use super::*;
use crate::runtime_state::ScheduledTask;

/// Bounded retry settings for [`Document::poll_until`].
///
/// The defaults (10 attempts, 1000 ms apart) match the usual "wait for a late
/// element" loop in userscripts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    pub max_attempts: u32,
    pub interval_ms: i64,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            interval_ms: 1000,
        }
    }
}

impl PollConfig {
    pub fn new(max_attempts: u32, interval_ms: i64) -> Result<Self> {
        let config = Self {
            max_attempts,
            interval_ms,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(Error::InvalidConfig(
                "poll max_attempts must be at least 1".into(),
            ));
        }
        if self.interval_ms < 0 {
            return Err(Error::InvalidConfig(format!(
                "poll interval_ms must be non-negative, got {}",
                self.interval_ms
            )));
        }
        Ok(())
    }
}

impl Document {
    pub fn now_ms(&self) -> i64 {
        self.scheduler.now_ms
    }

    /// Schedules `callback` to run `delay_ms` after the current virtual time.
    pub fn set_timeout(
        &mut self,
        delay_ms: i64,
        callback: impl FnOnce(&mut Document) -> Result<()> + 'static,
    ) -> Result<i64> {
        if delay_ms < 0 {
            return Err(Error::DomOperation(format!(
                "set_timeout requires non-negative milliseconds, got {delay_ms}"
            )));
        }
        let id = self.scheduler.next_timer_id;
        self.scheduler.next_timer_id += 1;
        let order = self.scheduler.next_task_order;
        self.scheduler.next_task_order += 1;
        let due_at = self.scheduler.now_ms.saturating_add(delay_ms);
        self.scheduler.task_queue.push(ScheduledTask {
            id,
            due_at,
            order,
            callback: Box::new(callback),
        });
        self.trace_timer_line(format!(
            "[timer] schedule id={id} due_at={due_at} delay_ms={delay_ms}"
        ));
        Ok(id)
    }

    pub fn clear_timeout(&mut self, timer_id: i64) -> bool {
        let before = self.scheduler.task_queue.len();
        self.scheduler.task_queue.retain(|task| task.id != timer_id);
        let existed = before != self.scheduler.task_queue.len();
        if existed {
            self.trace_timer_line(format!("[timer] clear id={timer_id}"));
        }
        existed
    }

    pub fn pending_timers(&self) -> Vec<PendingTimer> {
        let mut timers = self
            .scheduler
            .task_queue
            .iter()
            .map(|task| PendingTimer {
                id: task.id,
                due_at: task.due_at,
                order: task.order,
            })
            .collect::<Vec<_>>();
        timers.sort_by_key(|timer| (timer.due_at, timer.order));
        timers
    }

    pub fn set_timer_step_limit(&mut self, max_steps: usize) -> Result<()> {
        if max_steps == 0 {
            return Err(Error::InvalidConfig(
                "set_timer_step_limit requires at least 1 step".into(),
            ));
        }
        self.scheduler.timer_step_limit = max_steps;
        Ok(())
    }

    pub fn advance_time(&mut self, delta_ms: i64) -> Result<()> {
        if delta_ms < 0 {
            return Err(Error::DomOperation(
                "advance_time requires non-negative milliseconds".into(),
            ));
        }
        let from = self.scheduler.now_ms;
        self.scheduler.now_ms = self.scheduler.now_ms.saturating_add(delta_ms);
        let ran = self.run_timer_queue(Some(self.scheduler.now_ms), false)?;
        self.trace_timer_line(format!(
            "[timer] advance delta_ms={} from={} to={} ran_due={}",
            delta_ms, from, self.scheduler.now_ms, ran
        ));
        Ok(())
    }

    pub fn run_due_timers(&mut self) -> Result<usize> {
        let ran = self.run_timer_queue(Some(self.scheduler.now_ms), false)?;
        self.trace_timer_line(format!(
            "[timer] run_due now_ms={} ran={}",
            self.scheduler.now_ms, ran
        ));
        Ok(ran)
    }

    /// Runs every pending timer, moving the clock forward to each due time.
    pub fn flush(&mut self) -> Result<()> {
        let from = self.scheduler.now_ms;
        let ran = self.run_timer_queue(None, true)?;
        self.flush_mutations()?;
        self.trace_timer_line(format!(
            "[timer] flush from={} to={} ran={}",
            from, self.scheduler.now_ms, ran
        ));
        Ok(())
    }

    fn run_timer_queue(&mut self, due_limit: Option<i64>, advance_clock: bool) -> Result<usize> {
        let mut steps = 0usize;
        while let Some(next_idx) = self.scheduler.next_task_index(due_limit) {
            steps += 1;
            if steps > self.scheduler.timer_step_limit {
                return Err(Error::DomOperation(format!(
                    "timer step limit exceeded: limit={}, now_ms={}, pending={}",
                    self.scheduler.timer_step_limit,
                    self.scheduler.now_ms,
                    self.scheduler.task_queue.len()
                )));
            }
            let task = self.scheduler.task_queue.remove(next_idx);
            if advance_clock && task.due_at > self.scheduler.now_ms {
                self.scheduler.now_ms = task.due_at;
            }
            self.trace_timer_line(format!(
                "[timer] run id={} due_at={} now_ms={}",
                task.id, task.due_at, self.scheduler.now_ms
            ));
            (task.callback)(self)?;
            // Mutation checkpoint after each task.
            self.flush_mutations()?;
        }
        Ok(steps)
    }

    /// Calls `probe` up to `config.max_attempts` times, advancing the virtual clock by
    /// `config.interval_ms` between attempts. Running out of attempts yields `Ok(None)`.
    pub fn poll_until<T>(
        &mut self,
        config: &PollConfig,
        mut probe: impl FnMut(&mut Document) -> Result<Option<T>>,
    ) -> Result<Option<T>> {
        config.validate()?;
        for attempt in 1..=config.max_attempts {
            if let Some(found) = probe(self)? {
                self.trace_timer_line(format!("[timer] poll found attempt={attempt}"));
                return Ok(Some(found));
            }
            if attempt < config.max_attempts {
                self.advance_time(config.interval_ms)?;
            }
        }
        self.trace_timer_line(format!(
            "[timer] poll gave up attempts={}",
            config.max_attempts
        ));
        Ok(None)
    }

    pub fn poll_query_selector(
        &mut self,
        selector: &str,
        config: &PollConfig,
    ) -> Result<Option<NodeId>> {
        self.poll_until(config, |doc| doc.query_selector(selector))
    }
}
