// ABOUTME: Splits decoded text into newline-delimited frames.
// ABOUTME: Keeps the unterminated tail as carry-over between chunks.

use super::ByteDecoder;

/// Splits a growing text stream into `\n`-terminated frames.
///
/// Frames are returned without their terminator. Every flushed frame plus the
/// current carry-over, rejoined with `\n`, equals the text pushed so far.
#[derive(Debug, Default)]
pub struct FrameSplitter {
    carry: String,
}

impl FrameSplitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append text and return every frame it completes.
    pub fn push(&mut self, text: &str) -> Vec<String> {
        self.carry.push_str(text);

        let mut frames = Vec::new();
        let mut start = 0;
        while let Some(pos) = self.carry[start..].find('\n') {
            frames.push(self.carry[start..start + pos].to_string());
            start += pos + 1;
        }
        self.carry.drain(..start);
        frames
    }

    /// The incomplete trailing frame.
    pub fn carry(&self) -> &str {
        &self.carry
    }

    /// Take the unterminated remainder, if any. It is never a frame.
    pub fn finish(&mut self) -> Option<String> {
        if self.carry.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.carry))
        }
    }
}

/// Byte chunks in, complete frames out.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    bytes: ByteDecoder,
    frames: FrameSplitter,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one transport chunk; returns the frames it completes.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        let text = self.bytes.decode(chunk);
        self.frames.push(&text)
    }

    /// Close the decoder, returning the discarded remainder (if any).
    pub fn finish(&mut self) -> Option<String> {
        let tail = self.bytes.finish();
        if !tail.is_empty() {
            self.frames.push(&tail);
        }
        self.frames.finish()
    }
}
