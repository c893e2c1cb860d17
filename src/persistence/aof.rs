use crate::connection::Context;
use crate::error::{StoreError, StoreResult};
use crate::persistence::rdb;
use crate::protocol::Answer;
use crate::store::Store;
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::Path;

/// The durability engine.
///
/// Write commands append length-framed answers to an in-memory AOF buffer.
/// Once a second the server asks `is_writable`; the call stages either a full
/// snapshot (when a rotation threshold fires) or the pending AOF buffer into
/// the write buffer, and `write_out` pushes that staged payload to the file —
/// truncating first when the payload is a snapshot. At most one payload is in
/// flight at a time; new records keep accumulating in the AOF buffer
/// meanwhile.
pub struct AofLog {
    file: Mutex<File>,
    state: Mutex<AofState>,
}

#[derive(Default)]
struct AofState {
    aof_buffer: Vec<u8>,
    write_buffer: Vec<u8>,
    elapsed: u64,
    write_count: u64,
}

impl AofLog {
    /// Open or create the persistence file, bootstrap an empty image into a
    /// fresh file, and rebuild the store: the leading snapshot frames first,
    /// then every framed answer replayed through the dispatcher with
    /// recording disabled. A malformed file refuses to load.
    pub fn open(path: impl AsRef<Path>, databases: usize) -> StoreResult<(AofLog, Store, usize)> {
        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(path)?;

        let mut contents = Vec::new();
        file.read_to_end(&mut contents)?;

        let log = AofLog {
            file: Mutex::new(file),
            state: Mutex::new(AofState::default()),
        };

        if contents.is_empty() {
            log.file.lock().write_all(&rdb::empty_image(databases))?;
            return Ok((log, Store::new(databases), 0));
        }

        let (store, mut tail) = rdb::parse(&contents, databases)?;

        let mut ctx = Context::new();
        let mut replayed = 0;
        while !tail.is_empty() {
            if tail.len() < 8 {
                return Err(StoreError::Malformed("truncated record frame"));
            }
            let len = u64::from_le_bytes(tail[..8].try_into().expect("slice is exactly 8 bytes"))
                as usize;
            tail = &tail[8..];
            if tail.len() < len {
                return Err(StoreError::Malformed("truncated record frame"));
            }

            crate::command::dispatch(&mut ctx, Answer::from_bytes(&tail[..len]), &store, None);
            replayed += 1;
            tail = &tail[len..];
        }

        Ok((log, store, replayed))
    }

    /// Append one answer to the AOF buffer: `u64 length ∥ answer bytes`.
    pub fn record(&self, answer: &[u8]) {
        let mut state = self.state.lock();
        state
            .aof_buffer
            .extend_from_slice(&(answer.len() as u64).to_le_bytes());
        state.aof_buffer.extend_from_slice(answer);
        state.write_count += 1;
    }

    /// One-second tick. True when a payload got staged for writing.
    ///
    /// Rotation thresholds (latest matching fires): 900s with any write,
    /// 300s with 10 writes, 60s with 10 000 writes. A firing threshold resets
    /// the counters, drops the pending AOF buffer and stages a full snapshot;
    /// otherwise a non-empty AOF buffer is staged as an append.
    pub fn is_writable(&self, store: &Store) -> bool {
        let mut state = self.state.lock();
        state.elapsed += 1;

        if !state.write_buffer.is_empty() {
            return false;
        }

        if (state.elapsed >= 900 && state.write_count >= 1)
            || (state.elapsed >= 300 && state.write_count >= 10)
            || (state.elapsed >= 60 && state.write_count >= 10_000)
        {
            state.elapsed = 0;
            state.write_count = 0;
            state.aof_buffer.clear();
            state.write_buffer = rdb::snapshot(store);
            return true;
        }

        if !state.aof_buffer.is_empty() {
            state.write_buffer = std::mem::take(&mut state.aof_buffer);
            return true;
        }

        false
    }

    /// True exactly when the staged payload is a snapshot, which must be
    /// preceded by truncation.
    pub fn is_can_truncate(&self) -> bool {
        let state = self.state.lock();
        state.elapsed == 0 && !state.write_buffer.is_empty()
    }

    /// Push the staged payload to the file; the write buffer is cleared only
    /// after the bytes are durably down.
    pub fn write_out(&self) -> io::Result<()> {
        let (bytes, truncate) = {
            let state = self.state.lock();
            (
                state.write_buffer.clone(),
                state.elapsed == 0 && !state.write_buffer.is_empty(),
            )
        };
        if bytes.is_empty() {
            return Ok(());
        }

        {
            let mut file = self.file.lock();
            if truncate {
                file.set_len(0)?;
            }
            file.write_all(&bytes)?;
            file.sync_data()?;
        }

        self.state.lock().write_buffer.clear();
        Ok(())
    }
}
