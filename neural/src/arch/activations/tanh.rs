#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Tanh;

impl Tanh {
    pub fn f(&self, z: f64) -> f64 {
        z.tanh()
    }

    pub fn df(&self, z: f64) -> f64 {
        1. - z.tanh().powi(2)
    }
}
