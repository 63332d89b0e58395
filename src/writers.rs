use std::io::{BufWriter, Write};

use anyhow::Result as AnyhowResult;

use crate::annotate::GeneScoreReport;

pub trait OutWriter<T> {
    fn write(&mut self, item: T) -> AnyhowResult<u64>;
}

/// Appends one per-gene best-score CSV record per query.
pub struct BestGeneProbsWriter<T: Write> {
    buf_writer: BufWriter<T>,
}

impl<T: Write> BestGeneProbsWriter<T> {
    pub fn new(writer: T) -> Self {
        Self { buf_writer: BufWriter::new(writer) }
    }
}

impl<'a, T: Write> OutWriter<GeneScoreReport<'a>> for BestGeneProbsWriter<T> {
    fn write(&mut self, item: GeneScoreReport<'a>) -> AnyhowResult<u64> {
        self.buf_writer.write_all(item.to_record().as_bytes())?;
        self.buf_writer.flush()?;
        Ok(1)
    }
}
