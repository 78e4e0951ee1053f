use std::{borrow::Cow, io};

use crate::{Deserialize, Serialize, specs::ExecutorSpec};

type Kind = u32;
const KIND_SIZE: usize = size_of::<Kind>();

/// Fixed-size fields that precede a chunk's elements on the wire: the kind,
/// the matrix index, rows and columns, and the element offset. The total is
/// a multiple of 8 so the element area stays aligned inside an aligned
/// receive buffer.
pub const CHUNK_HEADER_SIZE: usize = KIND_SIZE + 3 * size_of::<u32>() + size_of::<u64>();

/// Position of one chunk inside a multi-matrix payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkHeader {
    pub matrix: u32,
    pub rows: u32,
    pub cols: u32,
    pub offset: u64,
}

/// The payload data for the `Data` variant of the `Msg` enum.
#[derive(Debug)]
pub enum Payload<'a> {
    Weights(ChunkHeader, &'a [f64]),
    Gradient(ChunkHeader, &'a [f64]),
}

/// The command for the `Control` variant of the `Msg` enum.
#[derive(Debug, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    Bootstrap(Box<ExecutorSpec>),
    WeightsDone { round: u64 },
    GradientDone { round: u64, loss: f64 },
    Abort,
    Disconnect,
}

/// The application layer message for the entire system.
#[derive(Debug)]
pub enum Msg<'a> {
    Control(Command),
    Data(Payload<'a>),
    Err(Cow<'a, str>),
}

impl Msg<'_> {
    fn buf_is_too_small<T>(size: usize, needed: usize) -> io::Result<T> {
        Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("The given buffer is too small {size}, must at least be {needed} bytes"),
        ))
    }

    fn invalid_kind<T>(kind: Kind) -> io::Result<T> {
        Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("Received an invalid kind value {kind}"),
        ))
    }
}

impl<'a> Serialize<'a> for Msg<'a> {
    fn serialize(&'a self, buf: &mut Vec<u8>) -> Option<&'a [u8]> {
        match self {
            Msg::Err(e) => {
                let header = (0 as Kind).to_be_bytes();
                buf.extend_from_slice(&header);
                Some(e.as_bytes())
            }
            Msg::Control(cmd) => {
                let header = (1 as Kind).to_be_bytes();
                buf.extend_from_slice(&header);

                // SAFETY: Serialize impl for `Command` is derived and not implemented
                //         by hand. Nor has a non string-key map inside.
                serde_json::to_writer(buf, &cmd).unwrap();
                None
            }
            Msg::Data(payload) => {
                let (kind, header, values) = match payload {
                    Payload::Weights(header, values) => (2, header, *values),
                    Payload::Gradient(header, values) => (3, header, *values),
                };

                buf.extend_from_slice(&(kind as Kind).to_be_bytes());
                buf.extend_from_slice(&header.matrix.to_be_bytes());
                buf.extend_from_slice(&header.rows.to_be_bytes());
                buf.extend_from_slice(&header.cols.to_be_bytes());
                buf.extend_from_slice(&header.offset.to_be_bytes());
                Some(bytemuck::cast_slice(values))
            }
        }
    }
}

impl<'a> Deserialize<'a> for Msg<'a> {
    fn deserialize(buf: &'a [u8]) -> io::Result<Self> {
        if buf.len() < KIND_SIZE {
            return Self::buf_is_too_small(buf.len(), KIND_SIZE);
        }

        let (kind_buf, rest) = buf.split_at(KIND_SIZE);

        // SAFETY: We splitted the buffer to be of size `KIND_SIZE` just above.
        let kind = Kind::from_be_bytes(kind_buf.try_into().unwrap());

        match kind {
            0 => {
                let string = str::from_utf8(rest)
                    .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;

                Ok(Self::Err(Cow::Borrowed(string)))
            }
            1 => {
                let cmd = serde_json::from_slice(rest)?;
                Ok(Self::Control(cmd))
            }
            2..4 => {
                if buf.len() < CHUNK_HEADER_SIZE {
                    return Self::buf_is_too_small(buf.len(), CHUNK_HEADER_SIZE);
                }

                let (head, data) = rest.split_at(CHUNK_HEADER_SIZE - KIND_SIZE);
                let header = ChunkHeader {
                    matrix: u32::from_be_bytes(head[0..4].try_into().unwrap()),
                    rows: u32::from_be_bytes(head[4..8].try_into().unwrap()),
                    cols: u32::from_be_bytes(head[8..12].try_into().unwrap()),
                    offset: u64::from_be_bytes(head[12..20].try_into().unwrap()),
                };

                let values: &[f64] = bytemuck::try_cast_slice(data).map_err(|err| {
                    io::Error::new(
                        io::ErrorKind::InvalidData,
                        format!("chunk data cannot be read as f64 elements: {err}"),
                    )
                })?;

                let payload = match kind {
                    2 => Payload::Weights(header, values),
                    _ => Payload::Gradient(header, values),
                };

                Ok(Self::Data(payload))
            }
            kind => Self::invalid_kind(kind),
        }
    }
}
