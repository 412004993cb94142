use std::collections::VecDeque;

use bytes::Bytes;

use crate::buffer::ReceiveBuffer;
use crate::codec::DEFAULT_MAX_FRAME;
use crate::error::{FrameError, Result};
use crate::separator::SEPARATOR;

/// Turns chunks arriving at arbitrary boundaries into complete frames.
///
/// Frames come out in arrival order with the separator stripped. A
/// separator is only recognised once all of its bytes are buffered.
#[derive(Debug)]
pub struct FrameSplitter {
    buffer: ReceiveBuffer,
    separator: &'static [u8],
    max_frame_size: usize,
}

impl FrameSplitter {
    /// Create a splitter for [`SEPARATOR`] with the default frame size limit.
    pub fn new() -> Self {
        Self::with_max_frame_size(DEFAULT_MAX_FRAME)
    }

    /// Create a splitter with an explicit frame size limit.
    pub fn with_max_frame_size(max_frame_size: usize) -> Self {
        Self::with_separator(SEPARATOR, max_frame_size)
    }

    /// Create a splitter for a custom separator.
    ///
    /// # Panics
    ///
    /// Panics if `separator` is empty.
    pub fn with_separator(separator: &'static [u8], max_frame_size: usize) -> Self {
        assert!(!separator.is_empty(), "separator must not be empty");
        Self {
            buffer: ReceiveBuffer::new(),
            separator,
            max_frame_size,
        }
    }

    /// Buffer a chunk without extracting frames.
    pub fn append(&mut self, chunk: &[u8]) {
        self.buffer.append(chunk);
    }

    /// Extract the next complete frame, if one is buffered.
    ///
    /// Fails with [`FrameError::FrameTooLarge`] when a frame, complete or
    /// not, exceeds the configured limit.
    pub fn next_frame(&mut self) -> Result<Option<Bytes>> {
        match self.buffer.take_until(self.separator) {
            Some(frame) if frame.len() > self.max_frame_size => Err(FrameError::FrameTooLarge {
                size: frame.len(),
                max: self.max_frame_size,
            }),
            Some(frame) => Ok(Some(frame)),
            None if self.buffer.len() > self.max_frame_size => Err(FrameError::FrameTooLarge {
                size: self.buffer.len(),
                max: self.max_frame_size,
            }),
            None => Ok(None),
        }
    }

    /// Append a chunk and return every frame it completed.
    pub fn push(&mut self, chunk: &[u8]) -> Result<Vec<Bytes>> {
        self.append(chunk);

        let mut frames = Vec::new();
        while let Some(frame) = self.next_frame()? {
            frames.push(frame);
        }
        Ok(frames)
    }

    /// Signal end-of-stream: returns the unterminated remainder, if any, as
    /// one final frame.
    ///
    /// Fails with [`FrameError::FrameTooLarge`] when the remainder exceeds
    /// the configured limit; the remainder is discarded either way.
    pub fn finish(&mut self) -> Result<Option<Bytes>> {
        match self.buffer.take_remaining() {
            Some(rest) if rest.len() > self.max_frame_size => Err(FrameError::FrameTooLarge {
                size: rest.len(),
                max: self.max_frame_size,
            }),
            rest => Ok(rest),
        }
    }

    /// Number of bytes waiting for a separator.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Split a finite sequence of chunks lazily, flushing the remainder at the end.
    pub fn split<I, C>(chunks: I) -> Frames<I::IntoIter>
    where
        I: IntoIterator<Item = C>,
        C: AsRef<[u8]>,
    {
        Frames {
            chunks: chunks.into_iter(),
            splitter: FrameSplitter::new(),
            pending: VecDeque::new(),
            error: None,
            done: false,
        }
    }
}

impl Default for FrameSplitter {
    fn default() -> Self {
        Self::new()
    }
}

/// Lazy iterator of frames over a chunk iterator. See [`FrameSplitter::split`].
#[derive(Debug)]
pub struct Frames<I> {
    chunks: I,
    splitter: FrameSplitter,
    pending: VecDeque<Bytes>,
    error: Option<FrameError>,
    done: bool,
}

impl<I, C> Iterator for Frames<I>
where
    I: Iterator<Item = C>,
    C: AsRef<[u8]>,
{
    type Item = Result<Bytes>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(frame) = self.pending.pop_front() {
                return Some(Ok(frame));
            }
            if let Some(err) = self.error.take() {
                return Some(Err(err));
            }
            if self.done {
                return None;
            }

            match self.chunks.next() {
                Some(chunk) => {
                    self.splitter.append(chunk.as_ref());
                    loop {
                        match self.splitter.next_frame() {
                            Ok(Some(frame)) => self.pending.push_back(frame),
                            Ok(None) => break,
                            Err(err) => {
                                self.done = true;
                                self.error = Some(err);
                                break;
                            }
                        }
                    }
                }
                None => {
                    self.done = true;
                    match self.splitter.finish() {
                        Ok(Some(rest)) => self.pending.push_back(rest),
                        Ok(None) => {}
                        Err(err) => self.error = Some(err),
                    }
                }
            }
        }
    }
}
