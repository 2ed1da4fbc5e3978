//! Control messages and their fixed-layout wire codec.
//!
//! A [`Message`] is the unit of the control plane: play/stop/load commands
//! flowing from producers (CLI, MIDI bridge, user code) through the broker
//! queue and on to per-instrument play queues. Every transport carries the
//! same fixed-size record so a single complete message is never split
//! across reads, and every process on the machine agrees on the layout.

use crate::error::{Error, Result};

/// Maximum instrument name length on the wire, including the NUL terminator.
pub const MAX_NAME: usize = 64;

/// Maximum message parameter length on the wire, including the NUL terminator.
pub const MAX_MSG: usize = 256;

/// Control message discriminants.
///
/// `Empty` is the zero value so an all-zero record reads back as a
/// tombstone, which is what notemap removal relies on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MessageKind {
    Empty = 0,
    Play = 1,
    Trigger = 2,
    Load = 3,
    StopVoice = 4,
    StopInstrument = 5,
    Shutdown = 6,
}

impl MessageKind {
    /// Decode a wire discriminant.
    pub fn from_wire(raw: u8) -> Result<Self> {
        Ok(match raw {
            0 => MessageKind::Empty,
            1 => MessageKind::Play,
            2 => MessageKind::Trigger,
            3 => MessageKind::Load,
            4 => MessageKind::StopVoice,
            5 => MessageKind::StopInstrument,
            6 => MessageKind::Shutdown,
            other => return Err(Error::BadDiscriminant(other)),
        })
    }

    /// Map a single-character CLI message type to a kind.
    ///
    /// `p` play, `t` trigger, `l` load, `s` stop voice, `k` shutdown.
    pub fn from_type_char(c: char) -> Result<Self> {
        Ok(match c {
            'p' => MessageKind::Play,
            't' => MessageKind::Trigger,
            'l' => MessageKind::Load,
            's' => MessageKind::StopVoice,
            'k' => MessageKind::Shutdown,
            other => return Err(Error::BadTypeChar(other)),
        })
    }
}

/// Validate an instrument name for use in messages and queue paths.
///
/// Names are bounded ASCII with no path separators, so interpolating them
/// into filesystem paths is safe by construction.
pub fn validate_instrument_name(name: &str) -> Result<()> {
    if name.is_empty() || name.len() >= MAX_NAME {
        return Err(Error::BadInstrumentName(name.to_string()));
    }

    let ok = name
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_' || b == b'.');
    if !ok {
        return Err(Error::BadInstrumentName(name.to_string()));
    }

    Ok(())
}

/// A control message.
///
/// `timestamp` is seconds on the shared monotonic clock (see
/// [`crate::clock::now_seconds`]); a timestamp of zero dispatches
/// immediately. `voice_id` is drawn from the shared voice counter and is
/// never reused within a process lifetime; every message carrying a given
/// voice id refers to the same instrument.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub kind: MessageKind,
    pub timestamp: f64,
    pub voice_id: u64,
    pub count: u64,
    pub instrument_name: String,
    pub params: String,
}

impl Message {
    /// Size of one encoded record: kind + timestamp + voice_id + count +
    /// the two NUL-padded string fields.
    pub const WIRE_SIZE: usize = 1 + 8 + 8 + 8 + MAX_NAME + MAX_MSG;

    pub fn new(kind: MessageKind, instrument_name: &str) -> Result<Self> {
        validate_instrument_name(instrument_name)?;
        Ok(Self {
            kind,
            timestamp: 0.0,
            voice_id: 0,
            count: 0,
            instrument_name: instrument_name.to_string(),
            params: String::new(),
        })
    }

    /// Build a message from injector-style CLI arguments.
    ///
    /// For stop messages the first argument is the target voice id; for
    /// everything else the caller is expected to fill `voice_id` from the
    /// shared counter afterwards. Remaining arguments become the
    /// space-joined parameter string.
    pub fn from_cli(msgtype: char, instrument_name: &str, args: &[String]) -> Result<Self> {
        let kind = MessageKind::from_type_char(msgtype)?;
        let mut msg = Message::new(kind, instrument_name)?;

        if kind == MessageKind::StopVoice {
            let raw = args.first().ok_or(Error::MissingVoiceId)?;
            msg.voice_id = raw
                .parse::<u64>()
                .map_err(|_| Error::BadVoiceId(raw.clone()))?;
            msg.params = args[1..].join(" ");
        } else {
            msg.params = args.join(" ");
        }

        if msg.params.len() >= MAX_MSG {
            return Err(Error::FieldTooLong {
                field: "params",
                len: msg.params.len(),
                max: MAX_MSG - 1,
            });
        }

        Ok(msg)
    }

    /// Encode into the fixed wire layout. Host endianness; every process
    /// on the machine shares it.
    pub fn encode(&self) -> Result<[u8; Self::WIRE_SIZE]> {
        // Tombstones and shutdowns may carry an empty name, same as on
        // decode.
        if self.kind != MessageKind::Empty && self.kind != MessageKind::Shutdown {
            validate_instrument_name(&self.instrument_name)?;
        } else if self.instrument_name.len() >= MAX_NAME {
            return Err(Error::FieldTooLong {
                field: "instrument_name",
                len: self.instrument_name.len(),
                max: MAX_NAME - 1,
            });
        }
        if self.params.len() >= MAX_MSG {
            return Err(Error::FieldTooLong {
                field: "params",
                len: self.params.len(),
                max: MAX_MSG - 1,
            });
        }
        if !self.params.is_ascii() {
            return Err(Error::NonAsciiField("params"));
        }

        let mut rec = [0u8; Self::WIRE_SIZE];
        rec[0] = self.kind as u8;
        rec[1..9].copy_from_slice(&self.timestamp.to_ne_bytes());
        rec[9..17].copy_from_slice(&self.voice_id.to_ne_bytes());
        rec[17..25].copy_from_slice(&self.count.to_ne_bytes());

        let name = self.instrument_name.as_bytes();
        rec[25..25 + name.len()].copy_from_slice(name);

        let params = self.params.as_bytes();
        let off = 25 + MAX_NAME;
        rec[off..off + params.len()].copy_from_slice(params);

        Ok(rec)
    }

    /// Decode one wire record.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < Self::WIRE_SIZE {
            return Err(Error::ShortRecord {
                expected: Self::WIRE_SIZE,
                got: bytes.len(),
            });
        }

        let kind = MessageKind::from_wire(bytes[0])?;

        let mut f = [0u8; 8];
        f.copy_from_slice(&bytes[1..9]);
        let timestamp = f64::from_ne_bytes(f);

        let mut w = [0u8; 8];
        w.copy_from_slice(&bytes[9..17]);
        let voice_id = u64::from_ne_bytes(w);
        w.copy_from_slice(&bytes[17..25]);
        let count = u64::from_ne_bytes(w);

        let instrument_name = read_field(&bytes[25..25 + MAX_NAME], "instrument_name")?;
        let off = 25 + MAX_NAME;
        let params = read_field(&bytes[off..off + MAX_MSG], "params")?;

        // A tombstone may carry any leftover name bytes; everything else
        // must name a real instrument.
        if kind != MessageKind::Empty && kind != MessageKind::Shutdown {
            validate_instrument_name(&instrument_name)?;
        }

        Ok(Self {
            kind,
            timestamp,
            voice_id,
            count,
            instrument_name,
            params,
        })
    }
}

fn read_field(field: &[u8], name: &'static str) -> Result<String> {
    let end = field
        .iter()
        .position(|&b| b == 0)
        .ok_or(Error::UnterminatedField(name))?;
    let s = &field[..end];
    if !s.is_ascii() {
        return Err(Error::NonAsciiField(name));
    }
    Ok(String::from_utf8_lossy(s).into_owned())
}
