//! Startup and teardown state machine.
//!
//! The renderer and everything it owns are created by one fallible
//! initialiser. Resources are RAII values: if initialisation fails at some
//! step, every value created before it is dropped in reverse order as the
//! error propagates, and the lifecycle moves straight to `CleanedUp`. Normal
//! shutdown goes through the same [`Lifecycle::cleanup`], which can be called
//! any number of times.

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Uninitialized,
    Running,
    CleanedUp,
}

#[derive(Debug, Error)]
pub enum LifecycleError<E> {
    #[error("already started")]
    AlreadyStarted,
    #[error("already cleaned up")]
    CleanedUp,
    #[error(transparent)]
    Init(E),
}

enum State<T> {
    Uninitialized,
    Running(T),
    CleanedUp,
}

pub struct Lifecycle<T> {
    state: State<T>,
}

impl<T> Lifecycle<T> {
    pub fn new() -> Self {
        Self {
            state: State::Uninitialized,
        }
    }

    pub fn state(&self) -> LifecycleState {
        match self.state {
            State::Uninitialized => LifecycleState::Uninitialized,
            State::Running(_) => LifecycleState::Running,
            State::CleanedUp => LifecycleState::CleanedUp,
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, State::Running(_))
    }

    /// Runs `init` and keeps its value. On failure the lifecycle is
    /// `CleanedUp`; whatever `init` had created is already released.
    pub fn start<E>(&mut self, init: impl FnOnce() -> Result<T, E>) -> Result<&mut T, LifecycleError<E>> {
        match self.state {
            State::Uninitialized => {}
            State::Running(_) => return Err(LifecycleError::AlreadyStarted),
            State::CleanedUp => return Err(LifecycleError::CleanedUp),
        }

        match init() {
            Ok(value) => {
                log::info!("Initialization complete");
                self.state = State::Running(value);
                match &mut self.state {
                    State::Running(value) => Ok(value),
                    _ => unreachable!(),
                }
            }
            Err(err) => {
                log::debug!("Initialization failed; partially created resources released");
                self.state = State::CleanedUp;
                Err(LifecycleError::Init(err))
            }
        }
    }

    pub fn get(&self) -> Option<&T> {
        match &self.state {
            State::Running(value) => Some(value),
            _ => None,
        }
    }

    pub fn get_mut(&mut self) -> Option<&mut T> {
        match &mut self.state {
            State::Running(value) => Some(value),
            _ => None,
        }
    }

    /// Releases the running value. Returns whether anything was released;
    /// later calls are no-ops.
    pub fn cleanup(&mut self) -> bool {
        match std::mem::replace(&mut self.state, State::CleanedUp) {
            State::Running(value) => {
                drop(value);
                log::info!("Cleaned up");
                true
            }
            State::Uninitialized | State::CleanedUp => false,
        }
    }
}

impl<T> Default for Lifecycle<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{cell::RefCell, rc::Rc};

    type Log = Rc<RefCell<Vec<&'static str>>>;

    struct Tracked {
        name: &'static str,
        log: Log,
    }

    impl Tracked {
        fn new(name: &'static str, log: &Log) -> Self {
            Self {
                name,
                log: Rc::clone(log),
            }
        }
    }

    impl Drop for Tracked {
        fn drop(&mut self) {
            self.log.borrow_mut().push(self.name);
        }
    }

    #[allow(dead_code)]
    struct Resources {
        window: Tracked,
        device: Tracked,
        lights: Tracked,
    }

    #[test]
    fn test_start_and_cleanup() {
        let log = Log::default();
        let mut lifecycle = Lifecycle::new();
        assert_eq!(lifecycle.state(), LifecycleState::Uninitialized);

        lifecycle
            .start(|| {
                Ok::<_, String>(Resources {
                    window: Tracked::new("window", &log),
                    device: Tracked::new("device", &log),
                    lights: Tracked::new("lights", &log),
                })
            })
            .unwrap();
        assert!(lifecycle.is_running());
        assert!(log.borrow().is_empty());

        assert!(lifecycle.cleanup());
        assert_eq!(lifecycle.state(), LifecycleState::CleanedUp);
        assert_eq!(log.borrow().len(), 3);
    }

    #[test]
    fn test_cleanup_twice_is_noop() {
        let log = Log::default();
        let mut lifecycle = Lifecycle::new();
        lifecycle
            .start(|| Ok::<_, String>(Tracked::new("device", &log)))
            .unwrap();

        assert!(lifecycle.cleanup());
        assert!(!lifecycle.cleanup());
        assert_eq!(*log.borrow(), vec!["device"]);
    }

    #[test]
    fn test_failed_start_releases_created_resources_in_reverse() {
        let log = Log::default();
        let mut lifecycle: Lifecycle<Resources> = Lifecycle::new();

        let result = lifecycle.start(|| {
            let window = Tracked::new("window", &log);
            let device = Tracked::new("device", &log);
            let lights: Result<Tracked, String> = Err("cubemap allocation failed".into());
            Ok::<_, String>(Resources {
                window,
                device,
                lights: lights?,
            })
        });

        assert!(matches!(result, Err(LifecycleError::Init(ref msg)) if msg == "cubemap allocation failed"));
        assert_eq!(*log.borrow(), vec!["device", "window"]);
        assert_eq!(lifecycle.state(), LifecycleState::CleanedUp);
        assert!(!lifecycle.cleanup());
        assert_eq!(log.borrow().len(), 2);
    }

    #[test]
    fn test_cannot_start_twice() {
        let mut lifecycle = Lifecycle::new();
        lifecycle.start(|| Ok::<_, String>(1)).unwrap();
        assert!(matches!(
            lifecycle.start(|| Ok::<_, String>(2)),
            Err(LifecycleError::AlreadyStarted)
        ));
        assert_eq!(lifecycle.get(), Some(&1));
    }

    #[test]
    fn test_cleanup_before_start() {
        let mut lifecycle: Lifecycle<u32> = Lifecycle::new();
        assert!(!lifecycle.cleanup());
        assert!(matches!(
            lifecycle.start(|| Ok::<_, String>(1)),
            Err(LifecycleError::CleanedUp)
        ));
    }
}
