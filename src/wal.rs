use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use crate::model::Event;

/// Encode one record as `[len][bincode][crc32]`.
fn encode_record(writer: &mut impl Write, event: &Event) -> io::Result<()> {
    let payload =
        bincode::serialize(event).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    let len = u32::try_from(payload.len())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "record too large"))?;
    writer.write_all(&len.to_le_bytes())?;
    writer.write_all(&payload)?;
    writer.write_all(&crc32fast::hash(&payload).to_le_bytes())?;
    Ok(())
}

/// Read exactly `buf.len()` bytes. `Ok(false)` means the log ended mid-record.
fn read_or_eof(reader: &mut impl Read, buf: &mut [u8]) -> io::Result<bool> {
    match reader.read_exact(buf) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(false),
        Err(e) => Err(e),
    }
}

/// Read until `buf` is full or the reader is exhausted. Returns bytes read.
fn fill(reader: &mut impl Read, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Result of reading a log back from disk.
#[derive(Debug, Default)]
pub struct Replay {
    pub events: Vec<Event>,
    /// True if trailing bytes were dropped (torn write or corruption).
    pub discarded_tail: bool,
}

/// Append-only reservation log.
///
/// Format per entry: `[u32: len][bincode: Event][u32: crc32]`
/// - `len` is the byte length of the bincode payload (not including the CRC).
/// - A torn last entry (crash mid-write) is discarded on replay.
pub struct Wal {
    writer: BufWriter<File>,
    path: PathBuf,
    appends_since_compact: u64,
    #[cfg(test)]
    fail_next_sync: bool,
}

impl Wal {
    /// Open (or create) the log at `path`.
    pub fn open(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            writer: BufWriter::new(file),
            path: path.to_path_buf(),
            appends_since_compact: 0,
            #[cfg(test)]
            fail_next_sync: false,
        })
    }

    /// Append and fsync a single record. Tests only; the store batches.
    #[cfg(test)]
    pub fn append(&mut self, event: &Event) -> io::Result<()> {
        self.append_buffered(event)?;
        self.flush_sync()
    }

    /// Buffer a record. Nothing is durable until `flush_sync`.
    pub fn append_buffered(&mut self, event: &Event) -> io::Result<()> {
        encode_record(&mut self.writer, event)?;
        self.appends_since_compact += 1;
        Ok(())
    }

    pub fn flush_sync(&mut self) -> io::Result<()> {
        self.writer.flush()?;
        self.injected_sync_failure()?;
        self.writer.get_ref().sync_all()
    }

    /// Length of the log on disk. Only meaningful with nothing buffered.
    pub fn synced_len(&self) -> io::Result<u64> {
        debug_assert!(self.writer.buffer().is_empty());
        Ok(self.writer.get_ref().metadata()?.len())
    }

    /// Drop everything after byte `len`: buffered bytes are discarded unwritten
    /// and the file is truncated and synced. Used to undo a batch whose sync failed.
    pub fn rollback_to(&mut self, len: u64) -> io::Result<()> {
        let file = OpenOptions::new().append(true).open(&self.path)?;
        let stale = std::mem::replace(&mut self.writer, BufWriter::new(file));
        // into_parts does not flush
        let _ = stale.into_parts();
        let file = self.writer.get_ref();
        file.set_len(len)?;
        file.sync_all()
    }

    /// Make the next `flush_sync` fail after its bytes reached the file.
    #[cfg(test)]
    pub fn fail_next_sync(&mut self) {
        self.fail_next_sync = true;
    }

    #[cfg(test)]
    fn injected_sync_failure(&mut self) -> io::Result<()> {
        if std::mem::take(&mut self.fail_next_sync) {
            return Err(io::Error::other("injected sync failure"));
        }
        Ok(())
    }

    #[cfg(not(test))]
    fn injected_sync_failure(&mut self) -> io::Result<()> {
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn appends_since_compact(&self) -> u64 {
        self.appends_since_compact
    }

    /// Write a full snapshot to `<path>.tmp` and fsync it.
    pub fn write_compact_file(path: &Path, events: &[Event]) -> io::Result<()> {
        let mut writer = BufWriter::new(File::create(path.with_extension("wal.tmp"))?);
        for event in events {
            encode_record(&mut writer, event)?;
        }
        writer.flush()?;
        writer.get_ref().sync_all()
    }

    /// Rename the snapshot over the live log and reopen it for appending.
    pub fn swap_compact_file(&mut self) -> io::Result<()> {
        fs::rename(self.path.with_extension("wal.tmp"), &self.path)?;
        let file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        self.writer = BufWriter::new(file);
        self.appends_since_compact = 0;
        Ok(())
    }

    #[cfg(test)]
    pub fn compact(&mut self, events: &[Event]) -> io::Result<()> {
        Self::write_compact_file(&self.path, events)?;
        self.swap_compact_file()
    }

    /// Read every valid record. Stops at the first truncated or corrupt one.
    pub fn replay(path: &Path) -> io::Result<Replay> {
        let file = match File::open(path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Replay::default()),
            Err(e) => return Err(e),
        };
        let mut reader = BufReader::new(file);
        let mut replay = Replay::default();

        loop {
            let mut len_buf = [0u8; 4];
            match fill(&mut reader, &mut len_buf)? {
                0 => break,
                4 => {}
                _ => {
                    replay.discarded_tail = true;
                    break;
                }
            }
            let len = u32::from_le_bytes(len_buf) as usize;

            let mut payload = vec![0u8; len];
            let mut crc_buf = [0u8; 4];
            if !read_or_eof(&mut reader, &mut payload)?
                || !read_or_eof(&mut reader, &mut crc_buf)?
            {
                replay.discarded_tail = true;
                break;
            }
            if u32::from_le_bytes(crc_buf) != crc32fast::hash(&payload) {
                replay.discarded_tail = true;
                break;
            }
            match bincode::deserialize::<Event>(&payload) {
                Ok(event) => replay.events.push(event),
                Err(_) => {
                    replay.discarded_tail = true;
                    break;
                }
            }
        }

        Ok(replay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::*;
    use ulid::Ulid;

    fn tmp_path(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join("innkeep_test_wal");
        fs::create_dir_all(&dir).unwrap();
        dir.join(name)
    }

    fn created(check_in: Ms) -> Event {
        Event::ReservationCreated {
            reservation: Reservation {
                id: Ulid::new(),
                user_id: "u1".into(),
                room_id: Ulid::new(),
                check_in,
                check_out: check_in + DAY_MS,
                guests: 1,
                total_price: 89,
                status: ReservationStatus::Confirmed,
                created_at: 0,
                version: 1,
            },
        }
    }

    #[test]
    fn append_and_replay() {
        let path = tmp_path("append_and_replay.wal");
        let _ = fs::remove_file(&path);

        let first = created(0);
        let Event::ReservationCreated { reservation } = &first else { unreachable!() };
        let events = vec![
            first.clone(),
            Event::ReservationStatusChanged {
                id: reservation.id,
                room_id: reservation.room_id,
                status: ReservationStatus::Cancelled,
                version: 2,
            },
        ];

        {
            let mut wal = Wal::open(&path).unwrap();
            for e in &events {
                wal.append(e).unwrap();
            }
        }

        let replayed = Wal::replay(&path).unwrap();
        assert_eq!(replayed.events, events);
        assert!(!replayed.discarded_tail);

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn replay_handles_truncation() {
        let path = tmp_path("truncation.wal");
        let _ = fs::remove_file(&path);

        let event = created(0);
        {
            let mut wal = Wal::open(&path).unwrap();
            wal.append(&event).unwrap();
        }
        // Partial second entry
        {
            let mut f = OpenOptions::new().append(true).open(&path).unwrap();
            f.write_all(&[0u8; 6]).unwrap();
        }

        let replayed = Wal::replay(&path).unwrap();
        assert_eq!(replayed.events, vec![event]);
        assert!(replayed.discarded_tail);

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn replay_nonexistent_file() {
        let path = tmp_path("nonexistent.wal");
        let _ = fs::remove_file(&path);
        let replayed = Wal::replay(&path).unwrap();
        assert!(replayed.events.is_empty());
        assert!(!replayed.discarded_tail);
    }

    #[test]
    fn replay_corrupt_crc() {
        let path = tmp_path("corrupt_crc.wal");
        let _ = fs::remove_file(&path);

        {
            let payload = bincode::serialize(&created(0)).unwrap();
            let mut f = File::create(&path).unwrap();
            f.write_all(&(payload.len() as u32).to_le_bytes()).unwrap();
            f.write_all(&payload).unwrap();
            f.write_all(&0xDEAD_BEEFu32.to_le_bytes()).unwrap();
        }

        let replayed = Wal::replay(&path).unwrap();
        assert!(replayed.events.is_empty());
        assert!(replayed.discarded_tail);

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn compact_then_append() {
        let path = tmp_path("compact_append.wal");
        let _ = fs::remove_file(&path);

        let churn: Vec<Event> = (0..20).map(|i| created(i * DAY_MS)).collect();
        let kept = vec![churn[3].clone()];
        let later = created(100 * DAY_MS);

        {
            let mut wal = Wal::open(&path).unwrap();
            for e in &churn {
                wal.append_buffered(e).unwrap();
            }
            wal.flush_sync().unwrap();
            assert_eq!(wal.appends_since_compact(), 20);
            let before = fs::metadata(&path).unwrap().len();

            wal.compact(&kept).unwrap();
            assert_eq!(wal.appends_since_compact(), 0);
            let after = fs::metadata(&path).unwrap().len();
            assert!(after < before, "compacted log should be smaller: {after} < {before}");

            wal.append(&later).unwrap();
        }

        let replayed = Wal::replay(&path).unwrap();
        assert_eq!(replayed.events, vec![kept[0].clone(), later]);

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn rollback_drops_unsynced_batch() {
        let path = tmp_path("rollback.wal");
        let _ = fs::remove_file(&path);

        let kept = created(0);
        let dropped = created(DAY_MS);
        let later = created(2 * DAY_MS);
        {
            let mut wal = Wal::open(&path).unwrap();
            wal.append(&kept).unwrap();
            let start = wal.synced_len().unwrap();

            wal.fail_next_sync();
            wal.append_buffered(&dropped).unwrap();
            assert!(wal.flush_sync().is_err());
            // The bytes did reach the file before the sync failed.
            assert!(fs::metadata(&path).unwrap().len() > start);

            wal.rollback_to(start).unwrap();
            assert_eq!(wal.synced_len().unwrap(), start);
            wal.append(&later).unwrap();
        }

        let replayed = Wal::replay(&path).unwrap();
        assert_eq!(replayed.events, vec![kept, later]);
        assert!(!replayed.discarded_tail);

        let _ = fs::remove_file(&path);
    }
}
