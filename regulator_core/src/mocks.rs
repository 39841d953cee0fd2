//! Test and helper mocks for regulator_core

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;

#[derive(Debug, Clone)]
enum Reply {
    Line(String),
    Timeout,
    Io(String),
}

#[derive(Debug, Default)]
struct FakeState {
    replies: VecDeque<Reply>,
    writes: Vec<Vec<u8>>,
    clears: usize,
    fail_writes: usize,
}

/// Scripted serial endpoint. Clones share state, so a test can keep one
/// handle while the control loop owns the other.
///
/// With no scripted reply left, `read_line` times out.
#[derive(Debug, Clone, Default)]
pub struct FakeTransport {
    state: Rc<RefCell<FakeState>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a raw response line (terminator added).
    pub fn push_line(&self, line: &str) -> &Self {
        self.state
            .borrow_mut()
            .replies
            .push_back(Reply::Line(format!("{line}\r\n")));
        self
    }

    /// Queue a gauge-style response for `value`, echo prefix included.
    pub fn push_reading(&self, value: f64) -> &Self {
        self.push_line(&format!(">  {}", crate::sci::render(value)))
    }

    pub fn push_timeout(&self) -> &Self {
        self.state.borrow_mut().replies.push_back(Reply::Timeout);
        self
    }

    pub fn push_io_error(&self, msg: &str) -> &Self {
        self.state
            .borrow_mut()
            .replies
            .push_back(Reply::Io(msg.to_string()));
        self
    }

    /// Make the next `n` writes fail with an I/O error.
    pub fn fail_next_writes(&self, n: usize) -> &Self {
        self.state.borrow_mut().fail_writes = n;
        self
    }

    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.state.borrow().writes.clone()
    }

    /// Writes decoded as text, for readable assertions.
    pub fn written_text(&self) -> Vec<String> {
        self.state
            .borrow()
            .writes
            .iter()
            .map(|w| String::from_utf8_lossy(w).into_owned())
            .collect()
    }

    pub fn clears(&self) -> usize {
        self.state.borrow().clears
    }

    pub fn pending_replies(&self) -> usize {
        self.state.borrow().replies.len()
    }
}

impl regulator_traits::Transport for FakeTransport {
    fn clear(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.state.borrow_mut().clears += 1;
        Ok(())
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let mut st = self.state.borrow_mut();
        if st.fail_writes > 0 {
            st.fail_writes -= 1;
            return Err(Box::new(std::io::Error::other("fake write failure")));
        }
        st.writes.push(bytes.to_vec());
        Ok(())
    }

    fn read_line(
        &mut self,
        _timeout: Duration,
    ) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
        match self.state.borrow_mut().replies.pop_front() {
            Some(Reply::Line(l)) => Ok(l),
            Some(Reply::Io(msg)) => Err(Box::new(std::io::Error::other(msg))),
            Some(Reply::Timeout) | None => Err(Box::new(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                "fake read timeout",
            ))),
        }
    }
}
