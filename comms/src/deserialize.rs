use std::io;

/// Wire deserialization borrowing from the receive buffer.
pub trait Deserialize<'a>: Sized {
    fn deserialize(buf: &'a [u8]) -> io::Result<Self>;
}
