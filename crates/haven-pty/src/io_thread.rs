//! Per-session I/O thread that reads PTY output and publishes it.
//!
//! Each session gets its own dedicated OS thread because PTY reads are
//! blocking. The reader is owned by the thread directly (not behind the
//! session mutex), so a blocked read never stalls writes, resizes, or close.

use std::io::{ErrorKind, Read};
use std::sync::{Arc, Mutex, Weak};

use crate::output::Outlet;
use crate::registry::RegistryInner;
use crate::session::{Session, SessionId, SessionState};

const READ_BUFFER_SIZE: usize = 64 * 1024;

/// Everything the read loop needs, moved onto the thread.
pub(crate) struct IoThread {
    pub(crate) id: SessionId,
    pub(crate) reader: Box<dyn Read + Send>,
    pub(crate) session: Arc<Mutex<Session>>,
    pub(crate) outlet: Arc<Mutex<Outlet>>,
    pub(crate) registry: Weak<RegistryInner>,
}

impl IoThread {
    pub(crate) fn start(self) -> std::io::Result<()> {
        std::thread::Builder::new()
            .name(format!("pty-io-{}", self.id))
            .spawn(move || self.run())?;
        Ok(())
    }

    fn run(mut self) {
        let mut buf = vec![0u8; READ_BUFFER_SIZE];

        loop {
            // Blocks until data is available or the PTY closes.
            let n = match self.reader.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                // EIO once the child side is gone.
                Err(_) => break,
            };

            let Ok(mut outlet) = self.outlet.lock() else {
                return;
            };
            outlet.publish(&buf[..n]);
        }

        self.finish();
    }

    /// The PTY hit EOF. If the session was not closed explicitly the shell
    /// exited on its own: reap it, tell subscribers, and drop the entry.
    fn finish(self) {
        let code = {
            let Ok(mut session) = self.session.lock() else {
                return;
            };
            if session.state() == SessionState::Closed {
                return;
            }
            session.terminate()
        };

        log::info!("session {} exited on its own (code {code:?})", self.id);

        if let Ok(mut outlet) = self.outlet.lock() {
            outlet.finish(code);
        }

        if let Some(registry) = self.registry.upgrade() {
            registry.forget(self.id);
        }
    }
}
