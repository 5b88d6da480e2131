//! Const-generic, inline ring buffer for PCM bytes.
//!
//! `RingBuffer<N>` holds up to `N` bytes of decoded PCM without heap
//! allocation. The MP3 decoder uses one to carry the tail of a frame across
//! pull requests smaller than the frame.
//!
//! # Constraints
//!
//! - `no_std`, no `heapless` — the backing store lives inline in its owner.
//! - Not interrupt-safe. The owner is reached through the pipeline mutex.

/// A fixed-capacity byte ring buffer.
///
/// Capacity is set at compile time via the const generic `N`.
pub struct RingBuffer<const N: usize> {
    buf: [u8; N],
    /// Index of the next slot to read from.
    read: usize,
    /// Number of valid bytes currently held.
    count: usize,
}

impl<const N: usize> RingBuffer<N> {
    /// Create a new, empty ring buffer.
    ///
    /// This function is `const` so that ring buffers may be stored in
    /// `static` variables without a runtime initialiser.
    pub const fn new() -> Self {
        Self {
            buf: [0u8; N],
            read: 0,
            count: 0,
        }
    }

    /// Write a slice of bytes into the buffer.
    ///
    /// # Errors
    ///
    /// Returns `Err(())` if the slice would not fit in the remaining capacity.
    /// The buffer is left unchanged on error (the write is all-or-nothing).
    #[allow(clippy::result_unit_err)] // overflow is the only error; () is sufficient
    #[allow(clippy::arithmetic_side_effects)] // Safety: read < N, count <= N; sums stay below 2N
    pub fn write_slice(&mut self, data: &[u8]) -> Result<(), ()> {
        if data.len() > N - self.count {
            return Err(());
        }
        let mut write = (self.read + self.count) % N.max(1);
        let mut rest = data;
        while !rest.is_empty() {
            let run = rest.len().min(N - write);
            let (head, tail) = rest.split_at(run);
            if let Some(dst) = self.buf.get_mut(write..write + run) {
                dst.copy_from_slice(head);
            }
            write = (write + run) % N;
            rest = tail;
        }
        self.count += data.len();
        Ok(())
    }

    /// Read up to `out.len()` bytes from the buffer into `out`.
    ///
    /// Returns the number of bytes actually read (may be less than
    /// `out.len()` if the buffer holds fewer bytes than requested).
    #[allow(clippy::arithmetic_side_effects)] // Safety: n <= count; read < N; run <= N - read
    pub fn read_slice(&mut self, out: &mut [u8]) -> usize {
        let n = out.len().min(self.count);
        let mut done = 0;
        while done < n {
            let run = (n - done).min(N - self.read);
            if let (Some(dst), Some(src)) =
                (out.get_mut(done..done + run), self.buf.get(self.read..self.read + run))
            {
                dst.copy_from_slice(src);
            }
            self.read = (self.read + run) % N;
            done += run;
        }
        self.count -= n;
        n
    }

    /// Drop every buffered byte.
    pub fn clear(&mut self) {
        self.read = 0;
        self.count = 0;
    }

    /// Number of bytes currently available to read.
    pub fn available(&self) -> usize {
        self.count
    }

    /// Maximum number of bytes the buffer can hold.
    pub const fn capacity(&self) -> usize {
        N
    }

    /// `true` when no bytes are present.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// `true` when the buffer is completely full.
    pub fn is_full(&self) -> bool {
        self.count == N
    }
}

impl<const N: usize> Default for RingBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}
