//! XML Reader Module
//!
//! - Events: the lexical event interface the extraction core consumes
//! - PushReader: chunk-fed front end over the incremental tokenizer

pub mod events;
pub mod push;

pub use events::{EventHandler, XmlEvent};
pub use push::PushReader;
