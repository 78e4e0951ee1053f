//! Splits a multi-matrix payload into bounded-size chunks and reassembles it.
//!
//! A payload is an ordered sequence of row-major matrices. Each chunk covers
//! a contiguous element range of a single matrix and carries its absolute
//! offset, so reassembly does not depend on arrival order.

use crate::{
    LEN_TYPE_SIZE, ProtocolError,
    msg::{CHUNK_HEADER_SIZE, ChunkHeader},
};

/// Per-message overhead on the wire: the length prefix plus the chunk header.
const CHUNK_OVERHEAD: usize = LEN_TYPE_SIZE + CHUNK_HEADER_SIZE;

/// One planned chunk: a contiguous element range of a single matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkPlan {
    pub matrix: usize,
    pub offset: usize,
    pub len: usize,
}

/// Computes the element capacity of one chunk under both transport limits.
///
/// # Arguments
/// * `group_size` - The maximum amount of weight elements per message.
/// * `frame_size` - The maximum encoded message size in bytes.
///
/// # Returns
/// The usable element count, or an error when `frame_size` cannot carry a
/// single element next to the headers.
pub fn max_chunk_elems(group_size: usize, frame_size: usize) -> Result<usize, ProtocolError> {
    let by_frame = frame_size.saturating_sub(CHUNK_OVERHEAD) / size_of::<f64>();
    let cap = group_size.min(by_frame);

    if cap == 0 {
        return Err(ProtocolError::FrameTooSmall {
            frame_size,
            needed: CHUNK_OVERHEAD + size_of::<f64>(),
        });
    }

    Ok(cap)
}

/// Tiles every matrix of a payload into chunks respecting the transport
/// limits.
///
/// # Arguments
/// * `dims` - The `(rows, cols)` dimensions of each matrix, in payload order.
/// * `group_size` - The maximum amount of weight elements per message.
/// * `frame_size` - The maximum encoded message size in bytes.
///
/// # Returns
/// The chunk sequence covering every element exactly once.
pub fn plan_chunks(
    dims: &[(usize, usize)],
    group_size: usize,
    frame_size: usize,
) -> Result<Vec<ChunkPlan>, ProtocolError> {
    let cap = max_chunk_elems(group_size, frame_size)?;
    let mut plans = Vec::new();

    for (matrix, &(rows, cols)) in dims.iter().enumerate() {
        let size = rows * cols;
        let mut offset = 0;

        while offset < size {
            let len = cap.min(size - offset);
            plans.push(ChunkPlan {
                matrix,
                offset,
                len,
            });
            offset += len;
        }
    }

    Ok(plans)
}

/// Rebuilds an ordered sequence of matrices from chunks received in any
/// order.
pub struct WeightAssembler {
    dims: Vec<(usize, usize)>,
    data: Vec<Vec<f64>>,
    seen: Vec<Vec<bool>>,
}

impl WeightAssembler {
    /// Creates an empty assembler for a payload of the given matrix shapes.
    ///
    /// # Arguments
    /// * `dims` - The `(rows, cols)` dimensions of each matrix, in payload order.
    pub fn new(dims: Vec<(usize, usize)>) -> Self {
        let data = dims.iter().map(|&(r, c)| vec![0.0; r * c]).collect();
        let seen = dims.iter().map(|&(r, c)| vec![false; r * c]).collect();

        Self { dims, data, seen }
    }

    /// Copies one received chunk into place.
    ///
    /// # Arguments
    /// * `header` - The chunk's position inside the payload.
    /// * `values` - The chunk's elements.
    ///
    /// # Returns
    /// An error naming the violated bound when the chunk does not fit the
    /// expected payload.
    pub fn accept(&mut self, header: ChunkHeader, values: &[f64]) -> Result<(), ProtocolError> {
        let matrix = header.matrix as usize;
        let Some(&(rows, cols)) = self.dims.get(matrix) else {
            return Err(ProtocolError::MatrixOutOfRange {
                matrix,
                matrices: self.dims.len(),
            });
        };

        let got = (header.rows as usize, header.cols as usize);
        if got != (rows, cols) {
            return Err(ProtocolError::DimMismatch {
                matrix,
                got,
                expected: (rows, cols),
            });
        }

        let offset = header.offset as usize;
        let size = rows * cols;
        if offset + values.len() > size {
            return Err(ProtocolError::ChunkOutOfBounds {
                matrix,
                offset,
                len: values.len(),
                size,
            });
        }

        let seen = &mut self.seen[matrix][offset..offset + values.len()];
        if seen.iter().any(|&s| s) {
            return Err(ProtocolError::OverlappingChunk { matrix, offset });
        }
        seen.fill(true);

        self.data[matrix][offset..offset + values.len()].copy_from_slice(values);
        Ok(())
    }

    /// Whether every element of every matrix has been received.
    pub fn is_complete(&self) -> bool {
        self.seen.iter().all(|m| m.iter().all(|&s| s))
    }

    /// Consumes the assembler, yielding `(dims, row-major buffer)` pairs in
    /// payload order.
    ///
    /// # Returns
    /// The assembled matrices, or the first hole found.
    pub fn into_parts(self) -> Result<Vec<((usize, usize), Vec<f64>)>, ProtocolError> {
        for (matrix, seen) in self.seen.iter().enumerate() {
            let missing = seen.iter().filter(|&&s| !s).count();
            if missing > 0 {
                return Err(ProtocolError::IncompletePayload { matrix, missing });
            }
        }

        Ok(self.dims.into_iter().zip(self.data).collect())
    }
}
