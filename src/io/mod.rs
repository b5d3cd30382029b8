//! Writing a built tree as a binary payload plus a header.

mod header;
pub mod quantize;
mod sink;
mod writer;

pub use header::{Block, BlockKind, Format, Header};
pub use sink::{PayloadSink, SharedSink, StreamSink};
pub use writer::{payload_path, HeaderFormat, PkdWriter, WriteOptions, TYPE_ATTRIBUTE_NAME};

#[cfg(test)]
mod test;
