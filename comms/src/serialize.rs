/// Wire serialization with a zero-copy tail.
///
/// `serialize` appends the buffered part of the message into `buf` and may
/// return a borrowed slice that the sender writes directly after it, so
/// numeric payloads never get copied into the scratch buffer.
pub trait Serialize<'a> {
    fn serialize(&'a self, buf: &mut Vec<u8>) -> Option<&'a [u8]>;
}
