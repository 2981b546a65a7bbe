/// Host frame metadata.
///
/// One frame is one turn of the host's render loop: queued layout work runs
/// first, then paint.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct Frame {
    /// 0-based frame index.
    pub index: u64,
}

impl Frame {
    pub fn new(index: u64) -> Self {
        Self { index }
    }

    pub fn next(self) -> Self {
        Self::new(self.index + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::Frame;

    #[test]
    fn next_advances_index() {
        let f0 = Frame::new(0);
        assert_eq!(f0.next(), Frame::new(1));
        assert_eq!(f0.next().next().index, 2);
    }
}
