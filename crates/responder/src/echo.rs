use std::time::Duration;

use crate::responder::{BoxFuture, Reply, ReplyRequest, Responder, ResponderResult};

/// Round-trip latency applied when none is configured.
pub const DEFAULT_REPLY_DELAY: Duration = Duration::from_millis(1000);

/// Stand-in backend that echoes the prompt back after a fixed delay.
///
/// Swappable for a real service without changing the caller's contract.
#[derive(Debug, Clone)]
pub struct EchoResponder {
    delay: Duration,
}

impl EchoResponder {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }
}

impl Default for EchoResponder {
    fn default() -> Self {
        Self::new(DEFAULT_REPLY_DELAY)
    }
}

impl Responder for EchoResponder {
    fn respond<'a>(&'a self, request: ReplyRequest) -> BoxFuture<'a, ResponderResult<Reply>> {
        let delay = self.delay;
        Box::pin(async move {
            tokio::time::sleep(delay).await;
            tracing::debug!(prompt_chars = request.text.chars().count(), "echo settled");
            Ok(Reply::new(format!(
                "I received your message: \"{}\"",
                request.text
            )))
        })
    }
}
