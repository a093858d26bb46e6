//! Streaming-event synthesizer: turns a `ProviderEvent` sequence into the
//! full OpenResponses SSE lifecycle (`antwort_protocol::StreamEvent`s) with
//! sequence-number/output-index/content-index bookkeeping, plus the
//! `ResponseWriter` state machine and SSE frame formatting that sit in
//! front of a transport.

mod synthesizer;
mod writer;

pub use synthesizer::Synthesizer;
pub use writer::DONE_FRAME;
pub use writer::ResponseWriter;
pub use writer::WriterError;
pub use writer::WriterState;
pub use writer::format_sse_frame;
