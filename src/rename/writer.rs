//! The intercepting response sink.
//!
//! # Responsibilities
//! - Rename headers exactly once, right before the status is committed
//! - Commit `200 OK` implicitly on the first body write
//! - Forward hijack, flush and push to the wrapped sink when it offers them
//!
//! # State Machine
//! ```text
//! Pending ──set_status / first write──▶ Committed
//!    │
//!    └──────hijack succeeded──────────▶ Hijacked (no renaming from here on)
//! ```

use std::io;

use axum::http::{HeaderMap, StatusCode};

use crate::http::sink::{
    Flush, Hijack, HijackError, Hijacked, Push, PushError, PushOptions, ResponseSink,
};
use crate::rename::rules::RuleSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CommitState {
    Pending,
    Committed,
    Hijacked,
}

/// A [`ResponseSink`] decorator that applies a [`RuleSet`] at the commit point.
///
/// One writer is created per request; it borrows the real sink and the shared
/// rule set for the duration of that request.
pub struct RenameWriter<'a, W: ?Sized> {
    inner: &'a mut W,
    rules: &'a RuleSet,
    state: CommitState,
}

impl<'a, W> RenameWriter<'a, W>
where
    W: ResponseSink + ?Sized,
{
    pub fn new(inner: &'a mut W, rules: &'a RuleSet) -> Self {
        Self {
            inner,
            rules,
            state: CommitState::Pending,
        }
    }

    /// True once the status has been forwarded through the rename path.
    pub fn is_committed(&self) -> bool {
        self.state == CommitState::Committed
    }

    /// True if the connection was taken over before any commit.
    pub fn is_hijacked(&self) -> bool {
        self.state == CommitState::Hijacked
    }
}

impl<W> ResponseSink for RenameWriter<'_, W>
where
    W: ResponseSink + ?Sized,
{
    fn headers_mut(&mut self) -> &mut HeaderMap {
        self.inner.headers_mut()
    }

    fn set_status(&mut self, status: StatusCode) {
        match self.state {
            CommitState::Committed => return,
            CommitState::Hijacked => return self.inner.set_status(status),
            CommitState::Pending => {}
        }

        let renamed = self.rules.apply(self.inner.headers_mut());
        self.state = CommitState::Committed;
        tracing::trace!(status = %status, renamed, "Headers renamed at commit");

        self.inner.set_status(status);
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.state == CommitState::Pending {
            self.set_status(StatusCode::OK);
        }
        self.inner.write(buf)
    }

    fn hijacker(&mut self) -> Option<&mut dyn Hijack> {
        Some(self)
    }

    fn flusher(&mut self) -> Option<&mut dyn Flush> {
        Some(self)
    }

    fn pusher(&mut self) -> Option<&mut dyn Push> {
        Some(self)
    }
}

impl<W> Hijack for RenameWriter<'_, W>
where
    W: ResponseSink + ?Sized,
{
    fn hijack(&mut self) -> Result<Hijacked, HijackError> {
        let sink = self.inner.sink_name();
        let hijacker = match self.inner.hijacker() {
            Some(hijacker) => hijacker,
            None => return Err(HijackError::Unsupported { sink }),
        };

        let hijacked = hijacker.hijack()?;
        if self.state == CommitState::Pending {
            self.state = CommitState::Hijacked;
        }
        tracing::debug!(sink, "Connection hijacked, header renaming bypassed");
        Ok(hijacked)
    }
}

impl<W> Flush for RenameWriter<'_, W>
where
    W: ResponseSink + ?Sized,
{
    fn flush(&mut self) -> io::Result<()> {
        match self.inner.flusher() {
            Some(flusher) => flusher.flush(),
            None => Ok(()),
        }
    }
}

impl<W> Push for RenameWriter<'_, W>
where
    W: ResponseSink + ?Sized,
{
    fn push(&mut self, target: &str, opts: &PushOptions) -> Result<(), PushError> {
        match self.inner.pusher() {
            Some(pusher) => pusher.push(target, opts),
            None => Err(PushError::NotSupported),
        }
    }
}
