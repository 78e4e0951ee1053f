/// Counters an executor accumulates over its lifetime.
#[derive(Debug, Default, Clone)]
pub struct ExecutorMetrics {
    pub rounds: u64,
    pub aborted_rounds: u64,
    pub chunks_in: u64,
    pub chunks_out: u64,
}

impl ExecutorMetrics {
    #[inline]
    pub fn bump_round(&mut self) {
        self.rounds += 1;
    }

    #[inline]
    pub fn bump_aborted(&mut self) {
        self.aborted_rounds += 1;
    }

    #[inline]
    pub fn add_chunks_in(&mut self, n: usize) {
        self.chunks_in += n as u64;
    }

    #[inline]
    pub fn add_chunks_out(&mut self, n: usize) {
        self.chunks_out += n as u64;
    }
}
