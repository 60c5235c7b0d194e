//! Type-keyed dispatch of decoded frames.

use std::collections::HashMap;
use std::io::{ErrorKind, Read};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::framing::{Frame, FrameDecoder, MsgType};
use crate::{Error, Result};

/// Something invocable with a decoded frame.
///
/// A blanket impl covers closures, so a `FnMut(&Frame) -> Result<()>` can be
/// subscribed directly.
pub trait MsgHandler: Send {
    /// Handle one dispatched frame.
    ///
    /// # Errors
    /// A handler error is reported by the dispatcher and isolated to this
    /// handler; see [`Dispatcher::publish`].
    fn handle(&mut self, frame: &Frame) -> Result<()>;
}

impl<F> MsgHandler for F
where
    F: FnMut(&Frame) -> Result<()> + Send,
{
    fn handle(&mut self, frame: &Frame) -> Result<()> {
        self(frame)
    }
}

/// Registry mapping a message type to its subscribers.
///
/// Registration is append-only for the life of a session, and subscribers for
/// a type are invoked in registration order.
#[derive(Default)]
pub struct Dispatcher {
    subscribers: HashMap<MsgType, Vec<Box<dyn MsgHandler>>>,
}

impl Dispatcher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for frames of `msg_type`. Any number of handlers
    /// may be registered for the same type.
    pub fn subscribe<H>(&mut self, msg_type: MsgType, handler: H)
    where
        H: MsgHandler + 'static,
    {
        self.subscribers
            .entry(msg_type)
            .or_default()
            .push(Box::new(handler));
    }

    /// Invoke every subscriber registered for this frame's type,
    /// synchronously and in registration order, on the calling thread.
    ///
    /// A subscriber error is logged and does not stop later subscribers for
    /// this frame, nor dispatch of future frames. A frame whose type has no
    /// subscribers is dropped silently.
    pub fn publish(&mut self, frame: &Frame) {
        let Some(handlers) = self.subscribers.get_mut(&frame.msg_type) else {
            return;
        };
        for handler in handlers {
            if let Err(err) = handler.handle(frame) {
                warn!(msg_type = frame.msg_type, "subscriber failed: {err}");
            }
        }
    }
}

/// Drives the decode loop: reads frames from a transport and fans them out
/// until the stream ends, a fatal transport error occurs, or the running flag
/// is cleared.
pub struct Handler<R>
where
    R: Read + Send,
{
    decoder: FrameDecoder<R>,
    dispatcher: Dispatcher,
    running: Arc<AtomicBool>,
}

impl<R> Handler<R>
where
    R: Read + Send,
{
    pub fn new(reader: R, dispatcher: Dispatcher, running: Arc<AtomicBool>) -> Self {
        Handler {
            decoder: FrameDecoder::new(reader),
            dispatcher,
            running,
        }
    }

    /// Run until end of stream or cancellation.
    ///
    /// Checksum failures are logged and skipped. A read timeout only
    /// re-checks the running flag, so a quiet line never wedges shutdown.
    ///
    /// # Errors
    /// The first fatal transport error; the stream cannot self-heal, so there
    /// is no retry.
    pub fn run(mut self) -> Result<()> {
        while self.running.load(Ordering::SeqCst) {
            match self.decoder.next_frame() {
                Ok(Some(frame)) => self.dispatcher.publish(&frame),
                Ok(None) => {
                    debug!(frames = self.decoder.num_frames, "end of stream");
                    break;
                }
                Err(Error::Io(err))
                    if matches!(
                        err.kind(),
                        ErrorKind::TimedOut | ErrorKind::WouldBlock | ErrorKind::Interrupted
                    ) => {}
                Err(err) if err.is_recoverable() => {
                    warn!("decode error: {err}");
                }
                Err(err) => return Err(err),
            }
        }
        Ok(())
    }
}
