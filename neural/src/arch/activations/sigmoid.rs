#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Sigmoid {
    amp: f64,
}

impl Sigmoid {
    pub fn new(amp: f64) -> Self {
        Self { amp }
    }

    pub fn amp(&self) -> f64 {
        self.amp
    }

    pub fn f(&self, z: f64) -> f64 {
        self.amp / (1. + (-z).exp())
    }

    pub fn df(&self, z: f64) -> f64 {
        let amp = self.amp;

        (amp * (-z).exp()) / ((-z).exp() + 1.).powi(2)
    }
}
