use crate::comparison::ChangeSink;
use tardiff_common::{ChangeKind, CompareConfig, TarDiffError};
use std::io::Write;

/// Prints one line per difference, labels right-aligned to a fixed column
///
/// Lines are written as they arrive, so whatever was reported before a
/// failure stays in the output.
pub struct Reporter<W: Write> {
    out: W,
    label_width: usize,
}

impl<W: Write> Reporter<W> {
    pub fn new(out: W, config: &CompareConfig) -> Self {
        Self {
            out,
            label_width: config.label_width,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> ChangeSink for Reporter<W> {
    fn record(&mut self, kind: ChangeKind, path: &[u8]) -> Result<(), TarDiffError> {
        // Names go out as stored, without re-encoding
        write!(self.out, "{:>width$}: ", kind, width = self.label_width)?;
        self.out.write_all(path)?;
        self.out.write_all(b"\n")?;
        Ok(())
    }
}
