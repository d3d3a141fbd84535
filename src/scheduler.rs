use super::*;

#[derive(Debug, Clone)]
pub(crate) struct ScheduledTask {
    pub(crate) id: i64,
    pub(crate) due_at: i64,
    pub(crate) order: i64,
    pub(crate) body: Vec<Stmt>,
    pub(crate) throttle_key: Option<String>,
}

impl Page {
    pub(crate) fn schedule_script_task(
        &mut self,
        body: Vec<Stmt>,
        delay_ms: i64,
        throttle_key: Option<String>,
    ) -> Result<i64> {
        if delay_ms < 0 {
            return Err(Error::ScriptRuntime(
                "timer delay must be non-negative".into(),
            ));
        }
        let id = self.next_timer_id;
        self.next_timer_id += 1;
        let order = self.next_task_order;
        self.next_task_order += 1;
        let due_at = self.now_ms.saturating_add(delay_ms);
        self.trace_timer_line(format!(
            "[timer] set id={id} delay_ms={delay_ms} due_at={due_at}"
        ));
        self.task_queue.push(ScheduledTask {
            id,
            due_at,
            order,
            body,
            throttle_key,
        });
        Ok(id)
    }

    // First call for a key arms the timer; later calls before it fires only
    // replace the body, keeping the original deadline.
    pub fn throttle(&mut self, key: &str, delay_ms: i64, script: &str) -> Result<()> {
        let body = parse_script(script)?;
        if let Some(timer_id) = self.throttle_entries.get(key).copied() {
            if let Some(idx) = self.task_queue.iter().position(|task| task.id == timer_id) {
                self.task_queue[idx].body = body;
                self.trace_timer_line(format!("[throttle] rearm key={key} id={timer_id}"));
                return Ok(());
            }
        }
        let id = self.schedule_script_task(body, delay_ms, Some(key.to_string()))?;
        self.throttle_entries.insert(key.to_string(), id);
        Ok(())
    }

    pub fn advance_time(&mut self, delta_ms: i64) -> Result<()> {
        if delta_ms < 0 {
            return Err(Error::ScriptRuntime(
                "advance_time requires non-negative milliseconds".into(),
            ));
        }
        let from = self.now_ms;
        self.now_ms = self.now_ms.saturating_add(delta_ms);
        let ran = self.run_due_timers_internal()?;
        self.trace_timer_line(format!(
            "[timer] advance delta_ms={} from={} to={} ran_due={}",
            delta_ms, from, self.now_ms, ran
        ));
        Ok(())
    }

    pub fn advance_time_to(&mut self, target_ms: i64) -> Result<()> {
        if target_ms < self.now_ms {
            return Err(Error::ScriptRuntime(format!(
                "advance_time_to requires target >= now_ms (target={target_ms}, now_ms={})",
                self.now_ms
            )));
        }
        let from = self.now_ms;
        self.now_ms = target_ms;
        let ran = self.run_due_timers_internal()?;
        self.trace_timer_line(format!(
            "[timer] advance_to from={} to={} ran_due={}",
            from, self.now_ms, ran
        ));
        Ok(())
    }

    pub fn flush_timers(&mut self) -> Result<()> {
        let from = self.now_ms;
        let ran = self.run_timer_queue(None, true)?;
        self.trace_timer_line(format!(
            "[timer] flush from={} to={} ran={}",
            from, self.now_ms, ran
        ));
        Ok(())
    }

    pub fn pending_timers(&self) -> usize {
        self.task_queue.len()
    }

    fn run_due_timers_internal(&mut self) -> Result<usize> {
        self.run_timer_queue(Some(self.now_ms), false)
    }

    fn run_timer_queue(&mut self, due_limit: Option<i64>, advance_clock: bool) -> Result<usize> {
        let mut steps = 0usize;
        while let Some(next_idx) = self.next_task_index(due_limit) {
            steps += 1;
            if steps > self.timer_step_limit {
                return Err(Error::ScriptRuntime(format!(
                    "timer queue exceeded max task steps: limit={}, now_ms={}, pending_tasks={}",
                    self.timer_step_limit,
                    self.now_ms,
                    self.task_queue.len()
                )));
            }
            let task = self.task_queue.remove(next_idx);
            if advance_clock && task.due_at > self.now_ms {
                self.now_ms = task.due_at;
            }
            self.execute_timer_task(task)?;
        }
        Ok(steps)
    }

    fn next_task_index(&self, due_limit: Option<i64>) -> Option<usize> {
        self.task_queue
            .iter()
            .enumerate()
            .filter(|(_, task)| {
                if let Some(limit) = due_limit {
                    task.due_at <= limit
                } else {
                    true
                }
            })
            .min_by_key(|(_, task)| (task.due_at, task.order))
            .map(|(idx, _)| idx)
    }

    fn execute_timer_task(&mut self, task: ScheduledTask) -> Result<()> {
        self.trace_timer_line(format!(
            "[timer] run id={} due_at={} now_ms={}",
            task.id, task.due_at, self.now_ms
        ));
        if let Some(key) = &task.throttle_key {
            self.throttle_entries.remove(key);
        }
        self.exec_stmts(&task.body)
    }
}
