mod echo;
mod responder;

pub use echo::{DEFAULT_REPLY_DELAY, EchoResponder};
pub use responder::{
    BoxFuture, Reply, ReplyRequest, Responder, ResponderError, ResponderResult,
};
