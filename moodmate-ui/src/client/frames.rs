//! Reassembly of JPEG frames from a chunked MJPEG response
//!
//! The backend's `/video_feed` is a byte stream of concatenated JPEG images.
//! Chunk boundaries have nothing to do with image boundaries, so bytes are
//! buffered and cut at the JPEG start-of-image (`FF D8`) and end-of-image
//! (`FF D9`) markers.

use std::fmt;

use bytes::{Buf, Bytes, BytesMut};
use futures::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::{ClientError, Endpoint};

pub const JPEG_SOI: [u8; 2] = [0xFF, 0xD8];
pub const JPEG_EOI: [u8; 2] = [0xFF, 0xD9];

/// Upper bound on buffered bytes while waiting for an end-of-image marker
pub const DEFAULT_MAX_FRAME_BYTES: usize = 8 * 1024 * 1024;

fn find_marker(haystack: &[u8], marker: [u8; 2]) -> Option<usize> {
    haystack.windows(2).position(|w| w == &marker[..])
}

/// Incremental JPEG frame splitter
///
/// Feed chunks with [`push`](Self::push) and drain complete frames with
/// [`next_frame`](Self::next_frame). Bytes before a start-of-image marker
/// are discarded. [`reset`](Self::reset) makes it reusable for a new feed.
#[derive(Debug)]
pub struct JpegFrameAssembler {
    buffer: BytesMut,
    max_frame_bytes: usize,
}

impl Default for JpegFrameAssembler {
    fn default() -> Self {
        Self::new()
    }
}

impl JpegFrameAssembler {
    pub fn new() -> Self {
        Self::with_max_frame_bytes(DEFAULT_MAX_FRAME_BYTES)
    }

    pub fn with_max_frame_bytes(max_frame_bytes: usize) -> Self {
        Self {
            buffer: BytesMut::new(),
            max_frame_bytes,
        }
    }

    pub fn push(&mut self, chunk: &[u8]) {
        self.buffer.extend_from_slice(chunk);
    }

    /// Bytes held while waiting for the rest of a frame
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    pub fn reset(&mut self) {
        self.buffer.clear();
    }

    /// Cut the next complete frame (SOI through EOI inclusive) off the buffer
    pub fn next_frame(&mut self) -> Option<Bytes> {
        let Some(start) = find_marker(&self.buffer, JPEG_SOI) else {
            // Keep a trailing 0xFF: it may be the first half of a split SOI
            let keep = usize::from(self.buffer.last() == Some(&0xFF));
            let discard = self.buffer.len() - keep;
            self.buffer.advance(discard);
            return None;
        };
        if start > 0 {
            debug!(skipped = start, "Discarding bytes before start-of-image");
            self.buffer.advance(start);
        }

        match find_marker(&self.buffer[JPEG_SOI.len()..], JPEG_EOI) {
            Some(offset) => {
                let end = JPEG_SOI.len() + offset + JPEG_EOI.len();
                Some(self.buffer.split_to(end).freeze())
            }
            None => {
                if self.buffer.len() > self.max_frame_bytes {
                    warn!(
                        buffered = self.buffer.len(),
                        "No end-of-image marker within frame limit; dropping partial frame"
                    );
                    self.buffer.clear();
                }
                None
            }
        }
    }
}

/// Runs a callback if dropped before being disarmed
///
/// Lives inside a frame stream: reaching the end of the feed (or being
/// cancelled) disarms it, so the callback only fires when the consumer
/// abandons the stream mid-flight.
pub struct AbortNotifier<F: FnOnce()> {
    on_abort: Option<F>,
}

impl<F: FnOnce()> AbortNotifier<F> {
    pub fn new(on_abort: F) -> Self {
        Self {
            on_abort: Some(on_abort),
        }
    }

    pub fn disarm(&mut self) {
        self.on_abort = None;
    }

    pub fn is_armed(&self) -> bool {
        self.on_abort.is_some()
    }
}

impl<F: FnOnce()> Drop for AbortNotifier<F> {
    fn drop(&mut self) {
        if let Some(on_abort) = self.on_abort.take() {
            debug!("Frame stream dropped while running");
            on_abort();
        }
    }
}

impl<F: FnOnce()> fmt::Debug for AbortNotifier<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AbortNotifier")
            .field("armed", &self.is_armed())
            .finish()
    }
}

enum Step<E> {
    Cancelled,
    Chunk(Bytes),
    Failed(E),
    Ended,
}

/// Turn a byte-chunk stream into a finite stream of JPEG frames
///
/// Ends when `chunks` ends, after the first chunk error (yielded as
/// [`ClientError::Transport`]), or when `cancel` fires. In all three cases
/// `notifier` is disarmed; dropping the returned stream early fires it.
pub fn frame_stream<S, E, F>(
    chunks: S,
    cancel: CancellationToken,
    mut notifier: AbortNotifier<F>,
) -> impl Stream<Item = Result<Bytes, ClientError>> + Send + 'static
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: fmt::Display + Send + 'static,
    F: FnOnce() + Send + 'static,
{
    async_stream::stream! {
        let mut chunks = Box::pin(chunks);
        let mut assembler = JpegFrameAssembler::new();
        let mut frames_sent: u64 = 0;

        loop {
            let step = tokio::select! {
                biased;
                _ = cancel.cancelled() => Step::Cancelled,
                next = chunks.next() => match next {
                    Some(Ok(chunk)) => Step::Chunk(chunk),
                    Some(Err(e)) => Step::Failed(e),
                    None => Step::Ended,
                },
            };

            match step {
                Step::Chunk(chunk) => {
                    assembler.push(&chunk);
                    while let Some(frame) = assembler.next_frame() {
                        frames_sent += 1;
                        yield Ok(frame);
                    }
                }
                Step::Failed(e) => {
                    notifier.disarm();
                    warn!(error = %e, frames = frames_sent, "Live feed broke");
                    yield Err(ClientError::Transport {
                        endpoint: Endpoint::VideoFeed,
                        message: e.to_string(),
                    });
                    break;
                }
                Step::Cancelled => {
                    notifier.disarm();
                    debug!(frames = frames_sent, "Live feed cancelled");
                    break;
                }
                Step::Ended => {
                    notifier.disarm();
                    debug!(frames = frames_sent, "Live feed ended");
                    break;
                }
            }
        }
    }
}
