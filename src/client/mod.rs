//! Client Reader - consumes the chat API.
//!
//! - `decoder` - incremental UTF-8 decoding of chunked bodies
//! - `transcript` - committed turns plus the in-progress reply
//! - `api` - reqwest client for the JSON and streaming endpoints

mod api;
mod decoder;
mod error;
mod transcript;

pub use api::{read_reply, ChatClient};
pub use decoder::Utf8StreamDecoder;
pub use error::ClientError;
pub use transcript::Transcript;
