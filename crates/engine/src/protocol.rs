//! Wire protocol shared by the command socket and the log socket (§6.1,
//! §6.2): a `u32` magic, a `u32` little-endian payload length, then that many
//! bytes of JSON. Framing is transport-agnostic — it works over any
//! `Read`/`Write`, which is what lets the engine's own tests exercise it
//! over an in-memory buffer instead of a real socket.

use std::io::{self, Read, Write};

use serde::{Deserialize, Serialize};

/// Frame magic number (§6.1), little-endian on the wire.
pub const FRAME_MAGIC: u32 = 0x3754_9260;

/// One positional/named operation argument (§6.1).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OperationArg {
    pub index: u32,
    pub name: String,
    pub value: String,
}

/// A command-socket request: an operation name plus its argument list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OperationRequest {
    pub name: String,
    pub args: Vec<OperationArg>,
}

impl OperationRequest {
    /// Looks up an argument by name first, falling back to its positional
    /// index — the same two-way lookup `op.getArg("name", index)` performs
    /// in every operation implementation.
    #[must_use]
    pub fn get_arg(&self, name: &str, index: u32) -> Option<&str> {
        self.args
            .iter()
            .find(|a| a.name == name)
            .or_else(|| self.args.iter().find(|a| a.index == index))
            .map(|a| a.value.as_str())
    }
}

/// A command-socket response (§6.1). `code == 0` is success.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct OperationResponse {
    pub code: u32,
    pub msg: String,
    pub results: std::collections::HashMap<String, String>,
    pub list_results: std::collections::HashMap<String, Vec<String>>,
}

/// Log bus severity (§4.8.4).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

/// Log bus category (§4.8.4), matching the three `SimulationManager` stages
/// plus a catch-all.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub enum LogCategory {
    General,
    Generation,
    Compilation,
    Simulation,
}

/// A single log-socket frame payload (§6.2).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LogRecord {
    pub timestamp_us: u64,
    pub level: LogLevel,
    pub category: LogCategory,
    pub message: String,
}

/// Writes one frame: magic, length, JSON payload.
pub fn write_frame<W: Write, T: Serialize>(writer: &mut W, value: &T) -> io::Result<()> {
    let payload = serde_json::to_vec(value).map_err(io::Error::other)?;
    let len = u32::try_from(payload.len()).map_err(io::Error::other)?;
    writer.write_all(&FRAME_MAGIC.to_le_bytes())?;
    writer.write_all(&len.to_le_bytes())?;
    writer.write_all(&payload)?;
    writer.flush()
}

/// Reads one frame, validating the magic number before parsing JSON.
pub fn read_frame<R: Read, T: for<'de> Deserialize<'de>>(reader: &mut R) -> io::Result<T> {
    let mut magic_bytes = [0u8; 4];
    reader.read_exact(&mut magic_bytes)?;
    let magic = u32::from_le_bytes(magic_bytes);
    if magic != FRAME_MAGIC {
        return Err(io::Error::new(io::ErrorKind::InvalidData, format!("bad frame magic: {magic:#x}")));
    }
    let mut len_bytes = [0u8; 4];
    reader.read_exact(&mut len_bytes)?;
    let len = u32::from_le_bytes(len_bytes) as usize;
    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload)?;
    serde_json::from_slice(&payload).map_err(io::Error::other)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn round_trips_operation_request() {
        let req = OperationRequest {
            name: "configlib.add".into(),
            args: vec![
                OperationArg { index: 0, name: "name".into(), value: "WIDTH".into() },
                OperationArg { index: 1, name: "value".into(), value: "8".into() },
            ],
        };
        let mut buf = Vec::new();
        write_frame(&mut buf, &req).unwrap();
        let mut cursor = Cursor::new(buf);
        let decoded: OperationRequest = read_frame(&mut cursor).unwrap();
        assert_eq!(decoded, req);
    }

    #[test]
    fn rejects_bad_magic() {
        let mut buf = vec![0u8; 8];
        buf[0] = 0xff;
        let mut cursor = Cursor::new(buf);
        let result: io::Result<OperationResponse> = read_frame(&mut cursor);
        assert!(result.is_err());
    }

    #[test]
    fn get_arg_falls_back_to_index() {
        let req = OperationRequest {
            name: "x".into(),
            args: vec![OperationArg { index: 0, name: String::new(), value: "v".into() }],
        };
        assert_eq!(req.get_arg("missing", 0), Some("v"));
    }
}
