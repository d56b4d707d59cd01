//! Per-session output fan-out.
//!
//! The I/O thread publishes every chunk it reads into the session's
//! [`Outlet`], which forwards it to each [`Subscription`] in read order.
//! Output produced before anyone subscribed is held in a bounded backlog and
//! replayed to the first subscriber.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::session::SessionId;

/// Upper bound on output held for a session nobody has subscribed to yet.
pub const BACKLOG_LIMIT: usize = 256 * 1024;

/// Something a session produced, in production order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// One chunk as returned by a single PTY read.
    Output(Vec<u8>),
    /// The process is gone. Always the last event of a stream.
    Exited { code: Option<u32> },
}

/// Receiving end of a session's output stream.
pub struct Subscription {
    id: SessionId,
    rx: mpsc::UnboundedReceiver<SessionEvent>,
    retired: Arc<AtomicBool>,
}

impl Subscription {
    /// The session this subscription belongs to.
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Wait for the next event.
    ///
    /// Returns `None` when the stream has ended or the session was closed
    /// explicitly; events still buffered at close time are discarded.
    pub async fn recv(&mut self) -> Option<SessionEvent> {
        let event = self.rx.recv().await?;
        self.accept(event)
    }

    /// Blocking variant of [`recv`](Self::recv) for plain threads.
    ///
    /// Panics if called from within an async runtime.
    pub fn blocking_recv(&mut self) -> Option<SessionEvent> {
        let event = self.rx.blocking_recv()?;
        self.accept(event)
    }

    /// Non-blocking poll. `None` means nothing is ready right now or the
    /// stream is over.
    pub fn try_recv(&mut self) -> Option<SessionEvent> {
        let event = self.rx.try_recv().ok()?;
        self.accept(event)
    }

    fn accept(&self, event: SessionEvent) -> Option<SessionEvent> {
        if self.retired.load(Ordering::Acquire) {
            None
        } else {
            Some(event)
        }
    }
}

/// Publishing side shared by the I/O thread and the registry.
pub(crate) struct Outlet {
    id: SessionId,
    subscribers: Vec<mpsc::UnboundedSender<SessionEvent>>,
    backlog: VecDeque<Vec<u8>>,
    backlog_len: usize,
    exited: Option<Option<u32>>,
    retired: Arc<AtomicBool>,
}

impl Outlet {
    pub(crate) fn new(id: SessionId) -> Self {
        Self {
            id,
            subscribers: Vec::new(),
            backlog: VecDeque::new(),
            backlog_len: 0,
            exited: None,
            retired: Arc::new(AtomicBool::new(false)),
        }
    }

    pub(crate) fn subscribe(&mut self) -> Option<Subscription> {
        if self.retired.load(Ordering::Acquire) {
            return None;
        }

        let (tx, rx) = mpsc::unbounded_channel();
        for chunk in self.backlog.drain(..) {
            let _ = tx.send(SessionEvent::Output(chunk));
        }
        self.backlog_len = 0;

        match self.exited {
            Some(code) => {
                let _ = tx.send(SessionEvent::Exited { code });
            }
            None => self.subscribers.push(tx),
        }

        Some(Subscription {
            id: self.id,
            rx,
            retired: Arc::clone(&self.retired),
        })
    }

    /// Forward one chunk to every live subscriber, or park it in the backlog
    /// when there are none.
    pub(crate) fn publish(&mut self, chunk: &[u8]) {
        if self.retired.load(Ordering::Acquire) || self.exited.is_some() {
            return;
        }

        self.subscribers
            .retain(|tx| tx.send(SessionEvent::Output(chunk.to_vec())).is_ok());

        if self.subscribers.is_empty() {
            self.push_backlog(chunk);
        }
    }

    /// The process exited on its own.
    pub(crate) fn finish(&mut self, code: Option<u32>) {
        if self.exited.is_some() {
            return;
        }
        self.exited = Some(code);
        for tx in self.subscribers.drain(..) {
            let _ = tx.send(SessionEvent::Exited { code });
        }
    }

    /// The session was closed explicitly: silence every subscription now,
    /// including events already queued.
    pub(crate) fn retire(&mut self) {
        self.retired.store(true, Ordering::Release);
        self.subscribers.clear();
        self.backlog.clear();
        self.backlog_len = 0;
    }

    fn push_backlog(&mut self, chunk: &[u8]) {
        self.backlog.push_back(chunk.to_vec());
        self.backlog_len += chunk.len();
        while self.backlog_len > BACKLOG_LIMIT {
            match self.backlog.pop_front() {
                Some(old) => self.backlog_len -= old.len(),
                None => break,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output(bytes: &[u8]) -> Option<SessionEvent> {
        Some(SessionEvent::Output(bytes.to_vec()))
    }

    #[test]
    fn test_backlog_replayed_to_first_subscriber() {
        let mut outlet = Outlet::new(3);
        outlet.publish(b"$ ");
        outlet.publish(b"hello");

        let mut sub = outlet.subscribe().unwrap();
        assert_eq!(sub.id(), 3);
        assert_eq!(sub.try_recv(), output(b"$ "));
        assert_eq!(sub.try_recv(), output(b"hello"));
        assert_eq!(sub.try_recv(), None);

        outlet.publish(b"more");
        assert_eq!(sub.try_recv(), output(b"more"));
    }

    #[test]
    fn test_every_subscriber_sees_every_chunk_in_order() {
        let mut outlet = Outlet::new(1);
        let mut first = outlet.subscribe().unwrap();
        let mut second = outlet.subscribe().unwrap();

        for chunk in [&b"a"[..], &b"b"[..], &b"c"[..]] {
            outlet.publish(chunk);
        }

        for sub in [&mut first, &mut second] {
            assert_eq!(sub.try_recv(), output(b"a"));
            assert_eq!(sub.try_recv(), output(b"b"));
            assert_eq!(sub.try_recv(), output(b"c"));
        }
    }

    #[test]
    fn test_backlog_is_bounded() {
        let mut outlet = Outlet::new(1);
        let chunk = vec![b'x'; 64 * 1024];
        for _ in 0..8 {
            outlet.publish(&chunk);
        }
        assert!(outlet.backlog_len <= BACKLOG_LIMIT);
        assert_eq!(outlet.backlog.len(), BACKLOG_LIMIT / chunk.len());
    }

    #[test]
    fn test_finish_ends_stream_with_exit() {
        let mut outlet = Outlet::new(1);
        let mut sub = outlet.subscribe().unwrap();
        outlet.publish(b"bye");
        outlet.finish(Some(0));
        outlet.publish(b"ignored");

        assert_eq!(sub.try_recv(), output(b"bye"));
        assert_eq!(sub.try_recv(), Some(SessionEvent::Exited { code: Some(0) }));
        assert_eq!(sub.try_recv(), None);
    }

    #[test]
    fn test_late_subscriber_after_exit_gets_backlog_and_exit() {
        let mut outlet = Outlet::new(1);
        outlet.publish(b"early");
        outlet.finish(Some(2));

        let mut sub = outlet.subscribe().unwrap();
        assert_eq!(sub.try_recv(), output(b"early"));
        assert_eq!(sub.try_recv(), Some(SessionEvent::Exited { code: Some(2) }));
    }

    #[test]
    fn test_retire_discards_queued_events() {
        let mut outlet = Outlet::new(1);
        let mut sub = outlet.subscribe().unwrap();
        outlet.publish(b"queued");
        outlet.retire();

        assert_eq!(sub.try_recv(), None);
        assert!(outlet.subscribe().is_none());
    }

    #[test]
    fn test_dropped_subscriber_is_pruned() {
        let mut outlet = Outlet::new(1);
        let sub = outlet.subscribe().unwrap();
        drop(sub);

        outlet.publish(b"nobody listening");
        assert!(outlet.subscribers.is_empty());
        assert_eq!(outlet.backlog.len(), 1);
    }
}
