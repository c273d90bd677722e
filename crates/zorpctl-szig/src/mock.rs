//! Scriptable in-memory stats channel for tests.
//!
//! The mock is backed by shared state so a test can keep a handle on it
//! after the factory has handed the channel to the code under test, then
//! assert on recorded calls.

use crate::{SzigChannel, SzigChannelFactory, SzigError, SzigResult};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Shared scripted state behind [`MockSzig`].
#[derive(Debug, Default)]
pub struct MockState {
    /// Scalar leaf values by path.
    pub values: HashMap<String, String>,
    /// Ordered child paths per internal node.
    pub children: HashMap<String, Vec<String>>,
    pub log_level: i64,
    pub log_spec: String,
    pub deadlock_check: bool,
    pub reload_ok: bool,
    /// When set, every channel operation fails with this protocol error.
    pub fail: Option<String>,
    /// Recorded operations, in call order.
    pub calls: Vec<String>,
}

impl MockState {
    fn record(&mut self, call: impl Into<String>) -> SzigResult<()> {
        self.calls.push(call.into());
        match &self.fail {
            Some(message) => Err(SzigError::protocol(message.clone())),
            None => Ok(()),
        }
    }

    /// Count of calls whose rendering starts with `prefix`.
    pub fn calls_matching(&self, prefix: &str) -> usize {
        self.calls.iter().filter(|c| c.starts_with(prefix)).count()
    }
}

/// In-memory [`SzigChannel`] over shared [`MockState`].
#[derive(Debug, Clone)]
pub struct MockSzig {
    state: Rc<RefCell<MockState>>,
}

impl MockSzig {
    pub fn new(state: Rc<RefCell<MockState>>) -> Self {
        Self { state }
    }
}

impl SzigChannel for MockSzig {
    fn get_value(&mut self, path: &str) -> SzigResult<Option<String>> {
        let mut state = self.state.borrow_mut();
        state.record(format!("get_value({})", path))?;
        Ok(state.values.get(path).cloned())
    }

    fn get_child(&mut self, path: &str) -> SzigResult<Option<String>> {
        let mut state = self.state.borrow_mut();
        state.record(format!("get_child({})", path))?;
        Ok(state
            .children
            .get(path)
            .and_then(|kids| kids.first())
            .cloned())
    }

    fn get_sibling(&mut self, path: &str) -> SzigResult<Option<String>> {
        let mut state = self.state.borrow_mut();
        state.record(format!("get_sibling({})", path))?;
        for kids in state.children.values() {
            if let Some(index) = kids.iter().position(|k| k == path) {
                return Ok(kids.get(index + 1).cloned());
            }
        }
        Ok(None)
    }

    fn reload(&mut self) -> SzigResult<()> {
        self.state.borrow_mut().record("reload")
    }

    fn reload_result(&mut self) -> SzigResult<bool> {
        let mut state = self.state.borrow_mut();
        state.record("reload_result")?;
        Ok(state.reload_ok)
    }

    fn log_level(&mut self) -> SzigResult<i64> {
        let mut state = self.state.borrow_mut();
        state.record("log_level")?;
        Ok(state.log_level)
    }

    fn set_log_level(&mut self, level: i64) -> SzigResult<()> {
        let mut state = self.state.borrow_mut();
        state.record(format!("set_log_level({})", level))?;
        state.log_level = level;
        Ok(())
    }

    fn log_spec(&mut self) -> SzigResult<String> {
        let mut state = self.state.borrow_mut();
        state.record("log_spec")?;
        Ok(state.log_spec.clone())
    }

    fn deadlock_check(&mut self) -> SzigResult<bool> {
        let mut state = self.state.borrow_mut();
        state.record("deadlock_check")?;
        Ok(state.deadlock_check)
    }

    fn set_deadlock_check(&mut self, enabled: bool) -> SzigResult<()> {
        let mut state = self.state.borrow_mut();
        state.record(format!("set_deadlock_check({})", enabled))?;
        state.deadlock_check = enabled;
        Ok(())
    }

    fn authorize(
        &mut self,
        session_id: &str,
        accept: bool,
        description: &str,
    ) -> SzigResult<String> {
        let mut state = self.state.borrow_mut();
        state.record(format!(
            "authorize({}, {}, {})",
            session_id, accept, description
        ))?;
        Ok(format!(
            "Session {} {}",
            session_id,
            if accept { "accepted" } else { "rejected" }
        ))
    }

    fn stop_session(&mut self, session_id: &str) -> SzigResult<String> {
        let mut state = self.state.borrow_mut();
        state.record(format!("stop_session({})", session_id))?;
        Ok(format!("Session {} stopped", session_id))
    }
}

/// Factory producing [`MockSzig`] channels over one shared state.
#[derive(Debug, Default)]
pub struct MockSzigFactory {
    state: Rc<RefCell<MockState>>,
    /// When set, `open` fails with this reason.
    pub connect_error: Option<String>,
}

impl MockSzigFactory {
    pub fn new(state: MockState) -> Self {
        Self {
            state: Rc::new(RefCell::new(state)),
            connect_error: None,
        }
    }

    /// Handle on the shared state for post-hoc assertions.
    pub fn state(&self) -> Rc<RefCell<MockState>> {
        Rc::clone(&self.state)
    }
}

impl SzigChannelFactory for MockSzigFactory {
    fn open(&self, process_name: &str) -> SzigResult<Box<dyn SzigChannel>> {
        if let Some(reason) = &self.connect_error {
            return Err(SzigError::Connect {
                process: process_name.to_string(),
                reason: reason.clone(),
            });
        }
        Ok(Box::new(MockSzig::new(Rc::clone(&self.state))))
    }
}
