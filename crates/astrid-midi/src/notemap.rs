//! Note trigger maps.
//!
//! A notemap is an append-only file of fixed-width message records for one
//! `(device, note)` pair. Removal overwrites a slot with a tombstone in
//! place, never truncating, so record offsets stay `index * WIRE_SIZE`
//! forever and trigger order always equals file order.

use std::fs::OpenOptions;
use std::io::{Read, Seek, SeekFrom, Write};

use astrid_core::{Message, MessageKind};
use astrid_ipc::{queue, IpcError, Paths, Result};

/// Trigger map for one `(device, note)` pair.
#[derive(Debug, Clone)]
pub struct Notemap {
    paths: Paths,
    device_id: u32,
    note: u32,
}

impl Notemap {
    pub fn new(paths: Paths, device_id: u32, note: u32) -> Self {
        Self {
            paths,
            device_id,
            note,
        }
    }

    fn path(&self) -> std::path::PathBuf {
        self.paths.notemap(self.device_id, self.note)
    }

    /// Append one message record.
    pub fn append(&self, msg: &Message) -> Result<()> {
        let rec = msg.encode()?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.path())?;
        file.write_all(&rec)?;
        Ok(())
    }

    /// Overwrite the record at `index` with a tombstone, in place.
    pub fn remove(&self, index: usize) -> Result<()> {
        let path = self.path();
        let mut file = match OpenOptions::new().read(true).write(true).open(&path) {
            Ok(file) => file,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(IpcError::NotFound(path))
            }
            Err(err) => return Err(err.into()),
        };

        let offset = (index * Message::WIRE_SIZE) as u64;
        if offset >= file.metadata()?.len() {
            return Err(IpcError::NotFound(path));
        }

        // The kind discriminant is the record's first byte; zeroing it
        // makes the slot an Empty tombstone without touching its payload.
        file.seek(SeekFrom::Start(offset))?;
        file.write_all(&[MessageKind::Empty as u8])?;
        Ok(())
    }

    /// All live (non-tombstone) messages, in file order. A missing map
    /// file is an empty map; undecodable records are skipped with a
    /// warning.
    pub fn messages(&self) -> Result<Vec<Message>> {
        let path = self.path();
        let mut file = match OpenOptions::new().read(true).open(&path) {
            Ok(file) => file,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        let mut out = Vec::new();
        let mut rec = [0u8; Message::WIRE_SIZE];
        let mut index = 0usize;
        loop {
            let mut filled = 0;
            while filled < rec.len() {
                match file.read(&mut rec[filled..]) {
                    Ok(0) => break,
                    Ok(n) => filled += n,
                    Err(err) if err.kind() == std::io::ErrorKind::Interrupted => continue,
                    Err(err) => return Err(err.into()),
                }
            }
            if filled == 0 {
                break;
            }
            if filled < rec.len() {
                tracing::warn!(
                    "notemap {} has a short trailing record ({filled} bytes), ignoring",
                    path.display()
                );
                break;
            }

            match Message::decode(&rec) {
                Ok(msg) if msg.kind == MessageKind::Empty => {}
                Ok(msg) => out.push(msg),
                Err(err) => {
                    tracing::warn!("notemap {} record {index} undecodable: {err}", path.display());
                }
            }
            index += 1;
        }

        Ok(out)
    }

    /// Replay every live record into the broker queue, in file order.
    pub fn trigger(&self) -> Result<()> {
        for msg in self.messages()? {
            queue::send(&self.paths, &msg)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use astrid_ipc::MessageQueue;

    fn msg(params: &str) -> Message {
        let mut msg = Message::new(MessageKind::Play, "keys").unwrap();
        msg.params = params.to_string();
        msg
    }

    #[test]
    fn test_append_and_list() {
        let dir = tempfile::tempdir().unwrap();
        let map = Notemap::new(Paths::new(dir.path()), 0, 60);

        map.append(&msg("one")).unwrap();
        map.append(&msg("two")).unwrap();

        let live = map.messages().unwrap();
        assert_eq!(live.len(), 2);
        assert_eq!(live[0].params, "one");
        assert_eq!(live[1].params, "two");
    }

    #[test]
    fn test_missing_map_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let map = Notemap::new(Paths::new(dir.path()), 0, 61);
        assert!(map.messages().unwrap().is_empty());
        // Triggering an empty map is a no-op, not an error.
        map.trigger().unwrap();
    }

    #[test]
    fn test_remove_tombstones_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let map = Notemap::new(Paths::new(dir.path()), 0, 60);

        map.append(&msg("one")).unwrap();
        map.append(&msg("two")).unwrap();
        map.append(&msg("three")).unwrap();

        map.remove(1).unwrap();

        // File keeps all three slots; only the middle is dead.
        let len = std::fs::metadata(map.path()).unwrap().len();
        assert_eq!(len as usize, 3 * Message::WIRE_SIZE);

        let live = map.messages().unwrap();
        assert_eq!(live.len(), 2);
        assert_eq!(live[0].params, "one");
        assert_eq!(live[1].params, "three");
    }

    #[test]
    fn test_remove_out_of_range() {
        let dir = tempfile::tempdir().unwrap();
        let map = Notemap::new(Paths::new(dir.path()), 0, 60);
        map.append(&msg("one")).unwrap();
        assert!(map.remove(5).is_err());
    }

    #[test]
    fn test_trigger_sends_live_records_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let paths = Paths::new(dir.path());
        let map = Notemap::new(paths.clone(), 0, 60);

        map.append(&msg("m1")).unwrap();
        map.append(&msg("m2")).unwrap();
        map.append(&msg("m3")).unwrap();
        map.remove(1).unwrap();

        let mut broker = MessageQueue::open_broker(&paths).unwrap();
        map.trigger().unwrap();

        assert_eq!(broker.recv().unwrap().params, "m1");
        assert_eq!(broker.recv().unwrap().params, "m3");
        assert!(broker
            .recv_timeout(std::time::Duration::from_millis(50))
            .unwrap()
            .is_none());
    }
}
