use crate::{NetError, Result, arch::activations::ActFn};

/// A convolution layer: a bank of `filters` receptive fields slid over a
/// `(width, height, depth)` input volume.
///
/// Geometry is checked at construction. Both padded spans must be
/// non-negative and divisible by the stride, a violating combination never
/// produces a `Conv` value.
#[derive(Clone, Debug, PartialEq)]
pub struct Conv {
    dim_in: (usize, usize, usize),
    field: (usize, usize),
    filters: usize,
    stride: usize,
    padding: usize,
    act_fn: ActFn,
}

impl Conv {
    /// Creates a new `Conv` after checking its geometry.
    ///
    /// # Arguments
    /// * `dim_in` - The `(width, height, depth)` input volume.
    /// * `field` - The `(width, height)` receptive field.
    /// * `filters` - The amount of filters, also the output depth.
    /// * `stride` - The sliding step, must divide both padded spans evenly.
    /// * `padding` - Symmetric zero padding on every side.
    /// * `act_fn` - The activation applied to the output volume.
    ///
    /// # Returns
    /// The layer, or the geometric rule the parameters violate.
    pub fn new(
        dim_in: (usize, usize, usize),
        field: (usize, usize),
        filters: usize,
        stride: usize,
        padding: usize,
        act_fn: ActFn,
    ) -> Result<Self> {
        let (w, h, depth) = dim_in;
        let (fw, fh) = field;

        if stride == 0 {
            return Err(NetError::ConvZeroParam { what: "stride" });
        }
        if filters == 0 {
            return Err(NetError::ConvZeroParam { what: "filter count" });
        }
        if w == 0 || h == 0 || depth == 0 {
            return Err(NetError::ConvZeroParam { what: "input volume" });
        }
        if fw == 0 || fh == 0 {
            return Err(NetError::ConvZeroParam { what: "receptive field" });
        }

        for (axis, dim, field) in [("width", w, fw), ("height", h, fh)] {
            let padded = dim + 2 * padding;

            if field > padded {
                return Err(NetError::ConvFieldTooLarge {
                    axis,
                    dim,
                    field,
                    padding,
                });
            }

            if (padded - field) % stride != 0 {
                return Err(NetError::ConvStrideMismatch {
                    axis,
                    span: padded - field,
                    stride,
                });
            }
        }

        Ok(Self {
            dim_in,
            field,
            filters,
            stride,
            padding,
            act_fn,
        })
    }

    pub fn dim_in(&self) -> (usize, usize, usize) {
        self.dim_in
    }

    pub fn field(&self) -> (usize, usize) {
        self.field
    }

    pub fn filters(&self) -> usize {
        self.filters
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn padding(&self) -> usize {
        self.padding
    }

    pub fn act_fn(&self) -> ActFn {
        self.act_fn
    }

    /// Output width: `(w + 2 * padding - fw) / stride + 1`.
    pub fn out_w(&self) -> usize {
        (self.dim_in.0 + 2 * self.padding - self.field.0) / self.stride + 1
    }

    /// Output height: `(h + 2 * padding - fh) / stride + 1`.
    pub fn out_h(&self) -> usize {
        (self.dim_in.1 + 2 * self.padding - self.field.1) / self.stride + 1
    }

    /// Output depth, one feature map per filter.
    pub fn out_depth(&self) -> usize {
        self.filters
    }

    /// Neuron count of the derived output volume.
    pub fn neurons(&self) -> usize {
        self.out_w() * self.out_h() * self.out_depth()
    }

    /// Neuron count the input volume must expose.
    pub fn in_neurons(&self) -> usize {
        self.dim_in.0 * self.dim_in.1 * self.dim_in.2
    }

    /// Shape of the filter bank: one row per filter, each row a flattened
    /// `(depth, fh, fw)` kernel.
    pub fn bank_dim(&self) -> (usize, usize) {
        (self.filters, self.dim_in.2 * self.field.1 * self.field.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conv(
        dim_in: (usize, usize, usize),
        field: (usize, usize),
        stride: usize,
        padding: usize,
    ) -> Result<Conv> {
        Conv::new(dim_in, field, 2, stride, padding, ActFn::relu())
    }

    #[test]
    fn derives_the_output_volume() {
        let conv = conv((5, 5, 1), (3, 3), 1, 0).unwrap();
        assert_eq!(conv.out_w(), 3);
        assert_eq!(conv.out_h(), 3);
        assert_eq!(conv.out_depth(), 2);
        assert_eq!(conv.neurons(), 18);
        assert_eq!(conv.bank_dim(), (2, 9));
    }

    #[test]
    fn padding_widens_the_output() {
        let conv = conv((5, 5, 3), (3, 3), 1, 1).unwrap();
        assert_eq!(conv.out_w(), 5);
        assert_eq!(conv.out_h(), 5);
        assert_eq!(conv.in_neurons(), 75);
    }

    #[test]
    fn rejects_a_field_larger_than_the_padded_input() {
        let err = conv((4, 4, 1), (6, 6), 1, 0).unwrap_err();
        assert!(matches!(err, NetError::ConvFieldTooLarge { axis: "width", .. }));
    }

    #[test]
    fn rejects_a_stride_that_does_not_divide_evenly() {
        // span = 5 - 3 = 2, stride 3 leaves a remainder
        let err = conv((5, 5, 1), (3, 3), 3, 0).unwrap_err();
        assert!(matches!(err, NetError::ConvStrideMismatch { stride: 3, .. }));
    }

    #[test]
    fn rejects_zero_parameters() {
        let err = conv((5, 5, 1), (3, 3), 0, 0).unwrap_err();
        assert!(matches!(err, NetError::ConvZeroParam { what: "stride" }));

        let err = Conv::new((5, 5, 1), (3, 3), 0, 1, 0, ActFn::relu()).unwrap_err();
        assert!(matches!(err, NetError::ConvZeroParam { what: "filter count" }));
    }
}
