//! Scripted operations for driving the resilience primitives in tests

// Mocks panic on misuse; that is their failure mode in tests
#![allow(clippy::missing_panics_doc)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

/// One scripted response
#[derive(Debug, Clone, PartialEq)]
pub enum Step<T, E> {
    Succeed(T),
    Fail(E),
    /// Sleep on the tokio clock, then produce the inner step
    Delay(Duration, Box<Step<T, E>>),
}

/// An async operation that replays a script of outcomes
///
/// When the script runs out the last step repeats. Clones share the script
/// and the invocation counter, so one handle can be moved into a closure
/// while the test keeps another for assertions.
///
/// # Examples
///
/// ```
/// use bulwark_common::testing::ScriptedOperation;
///
/// # async fn example() {
/// let operation = ScriptedOperation::<&str, String>::from_pattern("fs", "ok", "503".into());
/// assert_eq!(operation.call().await, Err("503".to_string()));
/// assert_eq!(operation.call().await, Ok("ok"));
/// assert_eq!(operation.call().await, Ok("ok"));
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ScriptedOperation<T, E> {
    script: Arc<Mutex<VecDeque<Step<T, E>>>>,
    last: Arc<Mutex<Option<Step<T, E>>>>,
    invocations: Arc<AtomicU32>,
}

impl<T: Clone, E: Clone> ScriptedOperation<T, E> {
    pub fn new(steps: impl IntoIterator<Item = Step<T, E>>) -> Self {
        Self {
            script: Arc::new(Mutex::new(steps.into_iter().collect())),
            last: Arc::new(Mutex::new(None)),
            invocations: Arc::new(AtomicU32::new(0)),
        }
    }

    /// Build a script from a string of `s` (success) and `f` (failure)
    pub fn from_pattern(pattern: &str, value: T, error: E) -> Self {
        Self::new(pattern.chars().filter_map(|c| match c {
            's' | 'S' => Some(Step::Succeed(value.clone())),
            'f' | 'F' => Some(Step::Fail(error.clone())),
            _ => None,
        }))
    }

    /// Always succeeds with `value`
    pub fn always_ok(value: T) -> Self {
        Self::new([Step::Succeed(value)])
    }

    /// Always fails with `error`
    pub fn always_err(error: E) -> Self {
        Self::new([Step::Fail(error)])
    }

    /// Run the next step
    pub async fn call(&self) -> Result<T, E> {
        self.invocations.fetch_add(1, Ordering::SeqCst);
        let mut step = self.next_step();
        loop {
            match step {
                Some(Step::Succeed(value)) => return Ok(value),
                Some(Step::Fail(error)) => return Err(error),
                Some(Step::Delay(duration, inner)) => {
                    tokio::time::sleep(duration).await;
                    step = Some(*inner);
                }
                None => panic!("ScriptedOperation called with an empty script"),
            }
        }
    }

    /// Times [`call`](Self::call) has been invoked
    pub fn invocations(&self) -> u32 {
        self.invocations.load(Ordering::SeqCst)
    }

    fn next_step(&self) -> Option<Step<T, E>> {
        let mut last = self.last.lock();
        if let Some(step) = self.script.lock().pop_front() {
            *last = Some(step.clone());
            return Some(step);
        }
        last.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_pattern_replays_in_order_then_repeats() {
        let operation = ScriptedOperation::<u8, &str>::from_pattern("ffs", 1, "boom");

        assert_eq!(operation.call().await, Err("boom"));
        assert_eq!(operation.call().await, Err("boom"));
        assert_eq!(operation.call().await, Ok(1));
        assert_eq!(operation.call().await, Ok(1));
        assert_eq!(operation.invocations(), 4);
    }

    #[tokio::test]
    async fn test_clones_share_script_and_counter() {
        let operation = ScriptedOperation::<u8, &str>::from_pattern("fs", 1, "boom");
        let handle = operation.clone();

        assert!(handle.call().await.is_err());
        assert_eq!(operation.call().await, Ok(1));
        assert_eq!(operation.invocations(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delay_step_sleeps_on_tokio_clock() {
        let operation = ScriptedOperation::<u8, &str>::new([Step::Delay(
            Duration::from_secs(5),
            Box::new(Step::Succeed(9)),
        )]);

        let start = tokio::time::Instant::now();
        assert_eq!(operation.call().await, Ok(9));
        assert_eq!(start.elapsed(), Duration::from_secs(5));
    }
}
