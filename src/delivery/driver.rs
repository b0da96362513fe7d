//! Backpressure Controller
//!
//! Reads blocks from the byte source, slices them into chunks of at most
//! `chunk_size` bytes and feeds each to the tokenizer. Results completed by
//! a chunk are delivered before the next chunk is fed. Between chunks the
//! driver either yields to the scheduler (acknowledgements caught up) or
//! parks on the gate until they are. Only one chunk is ever in flight.

use super::gate::Gate;
use super::sink::Sink;
use crate::error::Result;
use crate::reader::PushReader;
use crate::source::ByteStream;
use crate::strategy::Extractor;
use std::sync::Arc;
use tokio::io::AsyncReadExt;

/// Upper bound on a single read from the source
const READ_BLOCK: usize = 64 * 1024;

pub(crate) struct Driver {
    reader: PushReader,
    extractor: Extractor,
    sink: Sink,
    chunk_size: usize,
}

impl Driver {
    pub(crate) fn new(extractor: Extractor, sink: Sink, chunk_size: usize, strict: bool) -> Self {
        Driver {
            reader: PushReader::new(strict),
            extractor,
            sink,
            chunk_size: chunk_size.max(1),
        }
    }

    /// Run to end of input. Returns the sink so collected results can be
    /// taken out of it.
    pub(crate) async fn run(mut self, mut source: ByteStream) -> Result<Sink> {
        let gate = self.sink.gate().cloned();
        let mut block = vec![0u8; READ_BLOCK.max(self.chunk_size)];
        let mut chunks = 0usize;

        loop {
            let n = source.read(&mut block).await?;
            if n == 0 {
                break;
            }
            for chunk in block[..n].chunks(self.chunk_size) {
                self.reader.feed(chunk, &mut self.extractor);
                self.deliver_ready();
                chunks += 1;
                advance(gate.as_ref()).await;
            }
        }

        self.reader.finish(&mut self.extractor);
        self.extractor.finish();
        self.deliver_ready();

        if let Some(gate) = &gate {
            gate.wait_level().await;
        }

        tracing::debug!(
            chunks,
            bytes = self.reader.consumed(),
            results = self.extractor.reported(),
            recovered_errors = self.extractor.errors(),
            "end of input"
        );
        Ok(self.sink)
    }

    fn deliver_ready(&mut self) {
        while let Some(node) = self.extractor.take_ready() {
            self.sink.deliver(node);
        }
    }
}

/// Wait until the next chunk may be fed
async fn advance(gate: Option<&Arc<Gate>>) {
    match gate {
        Some(gate) if !gate.is_level() => gate.wait_level().await,
        _ => tokio::task::yield_now().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::delivery::sink::Callback;
    use crate::dom::Node;
    use crate::xpath::{PatternSet, Patterns};
    use std::io::Cursor;
    use std::sync::Mutex;
    use std::time::Duration;

    fn driver(callback: Option<Callback>, chunk_size: usize) -> Driver {
        let patterns = PatternSet::compile(&Patterns::from("//item"), false).unwrap().shared();
        let config = Config::default().with_chunk_size(chunk_size);
        Driver::new(
            Extractor::new(patterns, &config),
            Sink::from_callback(callback),
            chunk_size,
            true,
        )
    }

    fn source(xml: &str) -> ByteStream {
        Box::new(Cursor::new(xml.as_bytes().to_vec()))
    }

    #[tokio::test]
    async fn test_collects_in_document_order() {
        let sink = driver(None, 4)
            .run(source("<r><item>1</item><item>2</item><item>3</item></r>"))
            .await
            .unwrap();
        let texts: Vec<_> = sink
            .into_collected()
            .iter()
            .filter_map(Node::as_element)
            .filter_map(|e| e.text().map(str::to_string))
            .collect();
        assert_eq!(texts, vec!["1", "2", "3"]);
    }

    #[tokio::test]
    async fn test_source_error_propagates() {
        struct Broken;
        impl tokio::io::AsyncRead for Broken {
            fn poll_read(
                self: std::pin::Pin<&mut Self>,
                _cx: &mut std::task::Context<'_>,
                _buf: &mut tokio::io::ReadBuf<'_>,
            ) -> std::task::Poll<std::io::Result<()>> {
                std::task::Poll::Ready(Err(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset")))
            }
        }
        let result = driver(None, 8).run(Box::new(Broken)).await;
        assert!(matches!(result, Err(crate::error::Error::Source(_))));
    }

    #[tokio::test]
    async fn test_acks_gate_input() {
        let held = Arc::new(Mutex::new(Vec::new()));
        let held_in_cb = Arc::clone(&held);
        let callback = Callback::with_ack(move |_node, ack| {
            held_in_cb.lock().unwrap().push(ack);
        });

        let xml = "<r><item>1</item><item>2</item></r>";
        let task = tokio::spawn(driver(Some(callback), 2).run(source(xml)));

        // the first item parks the driver until it is acknowledged
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(held.lock().unwrap().len(), 1);
        assert!(!task.is_finished());

        let first = held.lock().unwrap().pop().unwrap();
        first.resume();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(held.lock().unwrap().len(), 1);
        assert!(!task.is_finished());

        let second = held.lock().unwrap().pop().unwrap();
        second.resume();
        let sink = task.await.unwrap().unwrap();
        let gate = sink.gate().unwrap();
        assert_eq!(gate.issued(), 2);
        assert!(gate.is_level());
    }
}
