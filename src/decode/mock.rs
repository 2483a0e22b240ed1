//! Scripted decode primitive for tests and demonstrations.

use super::primitive::{BufferHandle, ChunkSink, DecodePrimitive, DECODE_OK};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

/// Status reported when the script yields no result.
const NOT_FOUND: i32 = 1;

#[derive(Debug, Default)]
struct Script {
    queue: VecDeque<Option<String>>,
    fallback: Option<String>,
    chunk_len: Option<usize>,
    dims: (u32, u32),
    last_input: Vec<u8>,
    resize_calls: u32,
    decode_calls: u32,
}

/// Decode primitive returning scripted results.
///
/// Each `decode` call pops the next scripted outcome; once the script is
/// exhausted the fallback (if any) is returned. The pixel buffer belongs to
/// each instance, while script and call counters are shared between clones,
/// so a test can keep a handle for inspection after handing one to a scanner.
#[derive(Debug, Clone, Default)]
pub struct MockDecoder {
    buffer: Vec<u8>,
    generation: usize,
    script: Rc<RefCell<Script>>,
}

impl MockDecoder {
    /// Decoder that never finds anything unless scripted.
    pub fn new() -> Self {
        Self::default()
    }

    /// Decoder that finds `text` on every frame.
    pub fn always(text: impl Into<String>) -> Self {
        let decoder = Self::new();
        decoder.set_fallback(Some(text.into()));
        decoder
    }

    /// Splits every result into chunks of at most `len` bytes.
    pub fn with_chunk_len(self, len: usize) -> Self {
        self.script.borrow_mut().chunk_len = Some(len.max(1));
        self
    }

    /// Queues the outcome of a future decode call.
    pub fn push_result(&self, result: Option<&str>) {
        self.script
            .borrow_mut()
            .queue
            .push_back(result.map(str::to_owned));
    }

    /// Result returned once the queue is exhausted.
    pub fn set_fallback(&self, fallback: Option<String>) {
        self.script.borrow_mut().fallback = fallback;
    }

    /// Number of buffer allocations.
    pub fn resize_calls(&self) -> u32 {
        self.script.borrow().resize_calls
    }

    /// Number of decode calls, including failed ones.
    pub fn decode_calls(&self) -> u32 {
        self.script.borrow().decode_calls
    }

    /// Dimensions of the last allocation.
    pub fn buffer_dims(&self) -> (u32, u32) {
        self.script.borrow().dims
    }

    /// The single-channel buffer as seen by the last decode call.
    pub fn buffer_contents(&self) -> Vec<u8> {
        self.script.borrow().last_input.clone()
    }
}

impl DecodePrimitive for MockDecoder {
    fn resize(&mut self, width: u32, height: u32) -> BufferHandle {
        self.buffer = vec![0; (width as usize) * (height as usize)];
        self.generation += 1;

        let mut script = self.script.borrow_mut();
        script.dims = (width, height);
        script.resize_calls += 1;
        BufferHandle(self.generation)
    }

    fn buffer_mut(&mut self, handle: BufferHandle) -> Option<&mut [u8]> {
        (handle.0 == self.generation).then_some(self.buffer.as_mut_slice())
    }

    fn decode(&mut self, handle: BufferHandle, sink: &mut ChunkSink<'_>) -> i32 {
        let (result, chunk_len) = {
            let mut script = self.script.borrow_mut();
            script.decode_calls += 1;
            if handle.0 != self.generation {
                return NOT_FOUND;
            }
            script.last_input.clone_from(&self.buffer);
            let fallback = script.fallback.clone();
            (script.queue.pop_front().unwrap_or(fallback), script.chunk_len)
        };

        let Some(text) = result else {
            return NOT_FOUND;
        };

        let bytes = text.as_bytes();
        match chunk_len {
            Some(len) if !bytes.is_empty() => {
                let total = bytes.len().div_ceil(len);
                for (index, chunk) in bytes.chunks(len).enumerate() {
                    sink(chunk, index, total);
                }
            }
            _ => sink(bytes, 0, 1),
        }
        DECODE_OK
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(decoder: &mut MockDecoder, handle: BufferHandle) -> (i32, Vec<(String, usize, usize)>) {
        let mut chunks = Vec::new();
        let status = decoder.decode(handle, &mut |bytes: &[u8], index: usize, total: usize| {
            chunks.push((String::from_utf8_lossy(bytes).into_owned(), index, total));
        });
        (status, chunks)
    }

    #[test]
    fn test_script_then_fallback() {
        let mut decoder = MockDecoder::always("fallback");
        decoder.push_result(None);
        decoder.push_result(Some("first"));
        let handle = decoder.resize(2, 2);

        assert_eq!(collect(&mut decoder, handle).0, NOT_FOUND);
        assert_eq!(collect(&mut decoder, handle).1, vec![("first".to_string(), 0, 1)]);
        assert_eq!(collect(&mut decoder, handle).1, vec![("fallback".to_string(), 0, 1)]);
        assert_eq!(decoder.decode_calls(), 3);
    }

    #[test]
    fn test_stale_handle_rejected() {
        let mut decoder = MockDecoder::always("x");
        let old = decoder.resize(2, 2);
        let new = decoder.resize(4, 4);

        assert!(decoder.buffer_mut(old).is_none());
        assert_eq!(decoder.buffer_mut(new).map(|b| b.len()), Some(16));
    }

    #[test]
    fn test_chunking() {
        let mut decoder = MockDecoder::always("abcde").with_chunk_len(2);
        let handle = decoder.resize(1, 1);
        let (_, chunks) = collect(&mut decoder, handle);
        assert_eq!(
            chunks,
            vec![
                ("ab".to_string(), 0, 3),
                ("cd".to_string(), 1, 3),
                ("e".to_string(), 2, 3)
            ]
        );
    }
}
