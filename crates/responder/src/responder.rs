use std::future::Future;
use std::pin::Pin;

use snafu::Snafu;

/// Boxed future type returned by responder implementations.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub type ResponderResult<T> = Result<T, ResponderError>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ResponderError {
    #[snafu(display("responder backend is unavailable: {details}"))]
    Unavailable {
        stage: &'static str,
        details: String,
    },
    #[snafu(display("responder rejected the request: {details}"))]
    Rejected {
        stage: &'static str,
        details: String,
    },
}

/// One prompt handed to the responder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyRequest {
    pub text: String,
}

impl ReplyRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// One settled assistant reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
}

impl Reply {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// Produces assistant replies asynchronously.
///
/// Implementations settle exactly once per request; the caller issues at most
/// one outstanding request at a time and never retries or cancels.
pub trait Responder: Send + Sync {
    fn respond<'a>(&'a self, request: ReplyRequest) -> BoxFuture<'a, ResponderResult<Reply>>;
}
