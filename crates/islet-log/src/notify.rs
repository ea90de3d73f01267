//! Fire-and-forget notification sink for user-visible diagnostics.
//!
//! Shader compile output and fatal startup errors must reach the user without
//! crashing the render loop. [`Notifier`] is the seam: production code uses
//! [`LogNotifier`], tests and UI overlays use [`ChannelNotifier`] to observe
//! what was reported.

use std::sync::Arc;

/// A sink accepting human-readable diagnostic strings.
///
/// Implementations must never block or fail; a dropped message is acceptable,
/// a stalled render loop is not.
pub trait Notifier: Send + Sync {
    /// Deliver a message. Fire-and-forget.
    fn notify(&self, message: &str);
}

/// Notifier backed by the `tracing` log output.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, message: &str) {
        tracing::warn!(target: "islet::notify", "{message}");
    }
}

/// Notifier backed by an unbounded channel, for tests and overlays.
///
/// Messages are dropped if the receiving side has disconnected.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    sender: crossbeam_channel::Sender<String>,
}

impl ChannelNotifier {
    /// Create a notifier and the receiver observing its messages.
    pub fn new() -> (Self, crossbeam_channel::Receiver<String>) {
        let (sender, receiver) = crossbeam_channel::unbounded();
        (Self { sender }, receiver)
    }
}

impl Notifier for ChannelNotifier {
    fn notify(&self, message: &str) {
        // Receiver gone means nobody is listening; that is fine.
        let _ = self.sender.send(message.to_string());
    }
}

impl<T: Notifier + ?Sized> Notifier for Arc<T> {
    fn notify(&self, message: &str) {
        (**self).notify(message);
    }
}
