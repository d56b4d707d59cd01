//! Output bridge: session output to display push events.
//!
//! Every attached session gets a forwarder task that turns its byte stream
//! into [`PushEvent`]s. All forwarders feed one outbound channel drained by a
//! single task that hands events to the [`PushSink`], so events of one
//! session reach the display in the order the shell produced them.

use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use haven_pty::{SessionEvent, Subscription};

use crate::messages::{DataNotification, ExitNotification, PushEvent};

/// Where push events end up.
pub trait PushSink: Send + Sync + 'static {
    /// Deliver one event. Returns `false` when no display surface exists;
    /// the event is then dropped, not queued.
    fn deliver(&self, event: &PushEvent) -> bool;
}

/// Incremental UTF-8 decoder for a chunked byte stream.
///
/// A multi-byte character split across two reads is held back until its
/// remaining bytes arrive. Invalid sequences become U+FFFD.
#[derive(Debug, Default)]
pub struct Utf8Stream {
    carry: Vec<u8>,
}

impl Utf8Stream {
    /// Decode the next chunk. `None` when the chunk only extends an
    /// incomplete character.
    pub fn decode(&mut self, bytes: &[u8]) -> Option<String> {
        self.carry.extend_from_slice(bytes);

        let mut out = String::with_capacity(self.carry.len());
        let mut rest: &[u8] = &self.carry;
        loop {
            match std::str::from_utf8(rest) {
                Ok(text) => {
                    out.push_str(text);
                    rest = &[];
                    break;
                }
                Err(e) => {
                    let (valid, after) = rest.split_at(e.valid_up_to());
                    out.push_str(&String::from_utf8_lossy(valid));
                    match e.error_len() {
                        Some(len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            rest = &after[len..];
                        }
                        None => {
                            rest = after;
                            break;
                        }
                    }
                }
            }
        }
        let leftover = rest.to_vec();
        self.carry = leftover;

        if out.is_empty() {
            None
        } else {
            Some(out)
        }
    }

    /// Flush whatever is still held back, lossily.
    pub fn finish(&mut self) -> Option<String> {
        if self.carry.is_empty() {
            return None;
        }
        let tail = std::mem::take(&mut self.carry);
        Some(String::from_utf8_lossy(&tail).into_owned())
    }
}

/// Fans session output into the display's push channel.
#[derive(Clone)]
pub struct OutputBridge {
    runtime: Handle,
    outbound: mpsc::UnboundedSender<PushEvent>,
}

impl OutputBridge {
    /// Start the delivery task on `runtime`.
    pub fn start(runtime: Handle, sink: Arc<dyn PushSink>) -> Self {
        let (outbound, mut rx) = mpsc::unbounded_channel::<PushEvent>();

        runtime.spawn(async move {
            while let Some(event) = rx.recv().await {
                if !sink.deliver(&event) {
                    log::trace!(
                        "no display surface, dropped {} for session {}",
                        event.event_name(),
                        event.session_id()
                    );
                }
            }
        });

        Self { runtime, outbound }
    }

    /// Forward a session's output until it exits or is closed.
    pub fn attach(&self, mut subscription: Subscription) -> JoinHandle<()> {
        let outbound = self.outbound.clone();

        self.runtime.spawn(async move {
            let id = subscription.id();
            let mut text = Utf8Stream::default();

            while let Some(event) = subscription.recv().await {
                match event {
                    SessionEvent::Output(bytes) => {
                        let Some(data) = text.decode(&bytes) else {
                            continue;
                        };
                        if outbound
                            .send(PushEvent::Data(DataNotification { id, data }))
                            .is_err()
                        {
                            return;
                        }
                    }
                    SessionEvent::Exited { code } => {
                        if let Some(data) = text.finish() {
                            let _ = outbound.send(PushEvent::Data(DataNotification { id, data }));
                        }
                        let _ = outbound.send(PushEvent::Exited(ExitNotification { id, code }));
                        log::debug!("session {id} exited ({code:?}), forwarder done");
                        return;
                    }
                }
            }

            log::debug!("output forwarding for session {id} stopped");
        })
    }
}
