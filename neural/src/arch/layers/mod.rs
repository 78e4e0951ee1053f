mod conv;
mod layer;

pub use conv::Conv;
pub use layer::Layer;
