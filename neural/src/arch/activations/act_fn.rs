use super::{Relu, Sigmoid, Tanh};

/// An elementwise nonlinearity paired with its derivative.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ActFn {
    Sigmoid(Sigmoid),
    Relu(Relu),
    Tanh(Tanh),
    Identity,
}

impl ActFn {
    pub fn sigmoid(amp: f64) -> Self {
        Self::Sigmoid(Sigmoid::new(amp))
    }

    pub fn relu() -> Self {
        Self::Relu(Relu)
    }

    pub fn tanh() -> Self {
        Self::Tanh(Tanh)
    }

    pub fn f(&self, z: f64) -> f64 {
        match self {
            Self::Sigmoid(a) => a.f(z),
            Self::Relu(a) => a.f(z),
            Self::Tanh(a) => a.f(z),
            Self::Identity => z,
        }
    }

    pub fn df(&self, z: f64) -> f64 {
        match self {
            Self::Sigmoid(a) => a.df(z),
            Self::Relu(a) => a.df(z),
            Self::Tanh(a) => a.df(z),
            Self::Identity => 1.,
        }
    }
}
