use std::future::Future;

use tokio::task::JoinHandle;

/// Owns the background tasks started on behalf of a view. Dropping the scope
/// aborts whatever is still running, so nothing outlives the view it was
/// started for.
#[derive(Debug, Default)]
pub struct TaskScope {
    handles: Vec<JoinHandle<()>>,
}

impl TaskScope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn<F>(&mut self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.handles.retain(|h| !h.is_finished());
        self.handles.push(tokio::spawn(task));
    }

    pub fn cancel_all(&mut self) {
        for handle in self.handles.drain(..) {
            handle.abort();
        }
    }

    pub fn active(&self) -> usize {
        self.handles.iter().filter(|h| !h.is_finished()).count()
    }
}

impl Drop for TaskScope {
    fn drop(&mut self) {
        self.cancel_all();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn dropping_the_scope_aborts_tasks() {
        let finished = Arc::new(AtomicBool::new(false));
        let flag = finished.clone();

        let mut scope = TaskScope::new();
        scope.spawn(async move {
            tokio::time::sleep(Duration::from_secs(10)).await;
            flag.store(true, Ordering::SeqCst);
        });
        assert_eq!(scope.active(), 1);

        drop(scope);
        tokio::time::sleep(Duration::from_secs(20)).await;

        assert!(!finished.load(Ordering::SeqCst));
    }
}
