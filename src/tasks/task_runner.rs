use tokio::task::JoinHandle;

type Spawner = Box<dyn FnOnce() -> JoinHandle<()> + Send>;

/// Collects named background tasks, starts them together and aborts them together.
pub struct TaskRunner {
    tasks: Vec<(&'static str, Spawner)>,
}

impl TaskRunner {
    pub fn new() -> Self {
        Self { tasks: Vec::new() }
    }

    pub fn add_task<F>(&mut self, name: &'static str, task: F)
    where
        F: FnOnce() -> JoinHandle<()> + Send + 'static,
    {
        self.tasks.push((name, Box::new(task)));
    }

    pub fn start_all(self) -> RunningTasks {
        let handles = self
            .tasks
            .into_iter()
            .map(|(name, spawn)| {
                tracing::info!(task = name, "starting background task");
                (name, spawn())
            })
            .collect();
        RunningTasks { handles }
    }
}

impl Default for TaskRunner {
    fn default() -> Self {
        Self::new()
    }
}

pub struct RunningTasks {
    handles: Vec<(&'static str, JoinHandle<()>)>,
}

impl RunningTasks {
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// In-flight sends inside an aborted task are abandoned.
    pub fn abort_all(self) {
        for (name, handle) in self.handles {
            handle.abort();
            tracing::info!(task = name, "background task stopped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn aborted_tasks_finish_as_cancelled() {
        let mut runner = TaskRunner::new();
        runner.add_task("idle", || tokio::spawn(std::future::pending::<()>()));
        let running = runner.start_all();
        assert_eq!(running.len(), 1);

        let RunningTasks { mut handles } = running;
        let (_, handle) = handles.remove(0);
        handle.abort();
        let err = handle.await.expect_err("task was aborted");
        assert!(err.is_cancelled());
    }
}
