//! Delivery collaborator interface.

use crate::message::Message;

/// Error type returned by delivery collaborators.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Something that can send a finished message.
///
/// The message is borrowed; implementations render it with
/// [`Message::to_bytes`] and take the envelope from
/// [`Message::envelope`] and [`Message::recipients`].
pub trait Deliver: Send + Sync {
    /// Sends the message.
    ///
    /// # Errors
    ///
    /// Returns whatever the underlying transport reports.
    fn send(&self, message: &Message) -> Result<(), BoxError>;
}

impl<F> Deliver for F
where
    F: Fn(&Message) -> Result<(), BoxError> + Send + Sync,
{
    fn send(&self, message: &Message) -> Result<(), BoxError> {
        self(message)
    }
}
