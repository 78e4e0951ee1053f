use std::io;

use bytemuck::Zeroable;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::{Align8, Deserialize, LEN_TYPE_SIZE, LenType};

/// The receiving end handle of the communication.
pub struct WireReceiver<R: AsyncRead + Unpin> {
    rx: R,
}

impl<R: AsyncRead + Unpin> WireReceiver<R> {
    /// Creates a new `WireReceiver` instance.
    ///
    /// # Arguments
    /// * `rx` - The underlying reader.
    pub(super) fn new(rx: R) -> Self {
        Self { rx }
    }

    /// Waits to receive a new message from the inner receiver.
    ///
    /// # Arguments
    /// * `buf` - The buffer to use for deserialization, the returned
    ///           `T`'s lifetimes will be tied to this buffer.
    ///
    /// # Returns
    /// A result object that returns `T` on success or `io::Error` on failure.
    pub async fn recv_into<'buf, T, B>(&mut self, buf: &'buf mut Vec<B>) -> io::Result<T>
    where
        T: Deserialize<'buf>,
        B: Align8,
    {
        let mut size_buf = [0; LEN_TYPE_SIZE];
        self.rx.read_exact(&mut size_buf).await?;
        let len = LenType::from_be_bytes(size_buf) as usize;

        let needed = len.div_ceil(size_of::<B>());
        buf.resize(needed, B::zeroed());

        let view = bytemuck::cast_slice_mut::<B, u8>(buf.as_mut_slice());
        self.rx.read_exact(&mut view[..len]).await?;

        T::deserialize(&view[..len])
    }
}
