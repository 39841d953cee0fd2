//! Message inbox for the control loop.
//!
//! Collaborators on other threads (a signal handler, a UI) never touch loop
//! state; they send `Command`s that the loop drains between timer firings.

use crossbeam_channel::{Receiver, SendError, Sender, unbounded};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    /// Start a session toward a setpoint, or retarget the active one.
    Start(f64),
    /// Retarget the active session.
    Update(f64),
    /// Close the valve and end the session.
    Stop,
    /// End the session if any, then leave the run loop.
    Shutdown,
}

/// Sending half; cheap to clone and `Send`.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    tx: Sender<Command>,
}

impl SessionHandle {
    pub fn send(&self, cmd: Command) -> Result<(), SendError<Command>> {
        self.tx.send(cmd)
    }

    pub fn start(&self, setpoint: f64) -> Result<(), SendError<Command>> {
        self.send(Command::Start(setpoint))
    }

    pub fn update(&self, setpoint: f64) -> Result<(), SendError<Command>> {
        self.send(Command::Update(setpoint))
    }

    pub fn stop(&self) -> Result<(), SendError<Command>> {
        self.send(Command::Stop)
    }

    pub fn shutdown(&self) -> Result<(), SendError<Command>> {
        self.send(Command::Shutdown)
    }
}

/// Receiving half, owned by the run loop.
#[derive(Debug)]
pub struct Inbox {
    rx: Receiver<Command>,
}

impl Inbox {
    /// Everything queued right now, oldest first. Never blocks.
    pub fn drain(&self) -> Vec<Command> {
        self.rx.try_iter().collect()
    }
}

pub fn channel() -> (SessionHandle, Inbox) {
    let (tx, rx) = unbounded();
    (SessionHandle { tx }, Inbox { rx })
}
