// Trait to generalize over primitive number types with at least 8 byte
// alignment. Receive buffers are built from these so their contents can be
// reinterpreted as `f64` payloads.
pub trait Align8: bytemuck::Pod {}

impl Align8 for u64 {}
impl Align8 for i64 {}
impl Align8 for f64 {}
impl Align8 for u128 {}
impl Align8 for i128 {}
