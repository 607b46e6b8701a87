//! Size-tracking byte accumulator and the batch unit it drains into

/// Initial capacity for a fresh accumulator buffer
const INITIAL_CAPACITY: usize = 16 * 1024;

/// Largest buffer pre-allocated after a drain; bigger batches grow on demand
const MAX_RESERVED_CAPACITY: usize = 1024 * 1024;

/// Append-only byte buffer with a cumulative size counter.
///
/// Producers append serialized records with [`write`](Accumulator::write) and
/// report [`size`](Accumulator::size) back to the generator, which uses it for
/// byte-ceiling decisions without re-scanning the buffer.
#[derive(Debug)]
pub struct Accumulator {
    buf: Vec<u8>,
    len: u64,
}

impl Accumulator {
    pub fn new() -> Self {
        Self {
            buf: Vec::with_capacity(INITIAL_CAPACITY),
            len: 0,
        }
    }

    /// Append bytes and grow the size counter by `bytes.len()`
    pub fn write(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
        self.len += bytes.len() as u64;
    }

    /// Bytes appended since the last drain
    pub fn size(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Take the accumulated content, leaving the accumulator empty.
    ///
    /// The returned buffer is owned outright, so it can cross into the export
    /// task. The replacement buffer is pre-sized to the drained length, capped
    /// at [`MAX_RESERVED_CAPACITY`], since batches tend to be similar in size.
    pub fn drain_and_reset(&mut self) -> Vec<u8> {
        let next = Vec::with_capacity(self.buf.len().clamp(INITIAL_CAPACITY, MAX_RESERVED_CAPACITY));
        self.len = 0;
        std::mem::replace(&mut self.buf, next)
    }
}

impl Default for Accumulator {
    fn default() -> Self {
        Self::new()
    }
}

/// One flushed unit of generated data, handed from generation to export.
///
/// The payload is opaque to everything but the sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    payload: Vec<u8>,
    records: u64,
}

impl Batch {
    pub fn new(payload: Vec<u8>, records: u64) -> Self {
        Self { payload, records }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.payload
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.payload
    }

    /// Payload size in bytes
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// Number of records generated into this batch
    pub fn records(&self) -> u64 {
        self.records
    }
}
