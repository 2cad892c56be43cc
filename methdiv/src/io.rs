//! Coverage file reading and result table writing.
//!
//! Input is gzip-compressed, tab-separated, headerless Bismark coverage:
//! `chr  start  end  percentage|coverage  methylated  unmethylated`.

use crate::error::{PipelineError, Result};
use crate::metadata::FileMetadata;
use divergence_engine::{AggregateDivergence, CoverageRow, ResultTable, RowResult};
use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::Serialize;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

/// Columns in a coverage line
pub const COVERAGE_COLUMNS: usize = 6;

/// Header of the per-locus output table
pub const ROW_HEADER: [&str; 13] = [
    "chr",
    "start",
    "end",
    "percentage",
    "methylated",
    "unmethylated",
    "entropy",
    "relative_entropy",
    "jsd",
    "geometric_jsd",
    "ks_stat",
    "ks_pvalue",
    "time",
];

/// Header of the whole-file summary table
pub const AGGREGATE_HEADER: [&str; 9] = [
    "Sample",
    "Chromosome",
    "Context",
    "JS Divergence",
    "KL Divergence",
    "GJS Divergence",
    "SGJS Divergence",
    "KS Statistic",
    "KS P-value",
];

/// Read every line of a gzip-compressed coverage file.
pub fn read_coverage(path: &Path) -> Result<Vec<CoverageRow>> {
    let file = File::open(path)?;
    read_coverage_from(MultiGzDecoder::new(BufReader::new(file)))
}

/// Parse uncompressed coverage lines from any reader.
pub fn read_coverage_from<R: Read>(reader: R) -> Result<Vec<CoverageRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let mut rows = Vec::new();
    let mut record = csv::StringRecord::new();
    while reader.read_record(&mut record)? {
        if record.len() != COVERAGE_COLUMNS {
            let line = record.position().map_or(0, |p| p.line());
            return Err(PipelineError::MalformedRow {
                line,
                found: record.len(),
            });
        }
        let row: CoverageRow = record.deserialize(None)?;
        if row.percentage.trim().parse::<f64>().is_err() {
            return Err(PipelineError::NonNumeric {
                line: record.position().map_or(0, |p| p.line()),
                value: row.percentage,
            });
        }
        rows.push(row);
    }
    Ok(rows)
}

#[derive(Serialize)]
struct RowRecord<'a> {
    chr: &'a str,
    start: u64,
    end: u64,
    percentage: &'a str,
    methylated: u64,
    unmethylated: u64,
    entropy: f64,
    relative_entropy: f64,
    jsd: f64,
    geometric_jsd: f64,
    ks_stat: f64,
    ks_pvalue: f64,
    time: f64,
}

impl<'a> From<&'a RowResult> for RowRecord<'a> {
    fn from(row: &'a RowResult) -> Self {
        let (locus, d) = (&row.locus, &row.divergence);
        Self {
            chr: &locus.chr,
            start: locus.start,
            end: locus.end,
            percentage: &locus.percentage,
            methylated: locus.methylated,
            unmethylated: locus.unmethylated,
            entropy: d.entropy,
            relative_entropy: d.relative_entropy,
            jsd: d.jsd,
            geometric_jsd: d.geometric_jsd,
            ks_stat: d.ks_stat,
            ks_pvalue: d.ks_pvalue,
            time: d.elapsed.as_secs_f64(),
        }
    }
}

/// Write a per-locus table as gzip-compressed CSV.
pub fn write_row_table(path: &Path, table: &ResultTable) -> Result<()> {
    let encoder = GzEncoder::new(BufWriter::new(File::create(path)?), Compression::default());
    let encoder = write_row_table_to(encoder, table)?;
    encoder.finish()?.flush()?;
    Ok(())
}

/// Write a per-locus table as CSV into `writer`, returning it flushed.
pub fn write_row_table_to<W: Write>(writer: W, table: &ResultTable) -> Result<W> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    writer.write_record(ROW_HEADER)?;
    for row in table {
        writer.serialize(RowRecord::from(row))?;
    }
    writer
        .into_inner()
        .map_err(|e| PipelineError::Io(e.into_error()))
}

/// One line of the whole-file summary table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateRecord {
    #[serde(rename = "Sample")]
    pub sample: String,
    #[serde(rename = "Chromosome")]
    pub chromosome: String,
    #[serde(rename = "Context")]
    pub context: String,
    #[serde(rename = "JS Divergence")]
    pub js_divergence: Option<f64>,
    #[serde(rename = "KL Divergence")]
    pub kl_divergence: Option<f64>,
    #[serde(rename = "GJS Divergence")]
    pub gjs_divergence: Option<f64>,
    #[serde(rename = "SGJS Divergence")]
    pub sgjs_divergence: Option<f64>,
    #[serde(rename = "KS Statistic")]
    pub ks_statistic: Option<f64>,
    #[serde(rename = "KS P-value")]
    pub ks_pvalue: Option<f64>,
}

impl AggregateRecord {
    pub fn new(meta: FileMetadata, summary: &AggregateDivergence) -> Self {
        Self {
            sample: meta.sample,
            chromosome: meta.chromosome,
            context: meta.context,
            js_divergence: summary.js_divergence,
            kl_divergence: summary.kl_divergence,
            gjs_divergence: summary.gjs_divergence,
            sgjs_divergence: summary.sgjs_divergence,
            ks_statistic: summary.ks_statistic,
            ks_pvalue: summary.ks_pvalue,
        }
    }
}

/// Write the summary table as plain CSV. Missing values become empty cells.
pub fn write_aggregate_table(path: &Path, records: &[AggregateRecord]) -> Result<()> {
    let writer = write_aggregate_table_to(BufWriter::new(File::create(path)?), records)?;
    writer.into_inner().map_err(|e| PipelineError::Io(e.into_error()))?;
    Ok(())
}

pub fn write_aggregate_table_to<W: Write>(writer: W, records: &[AggregateRecord]) -> Result<W> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    writer.write_record(AGGREGATE_HEADER)?;
    for record in records {
        writer.serialize(record)?;
    }
    writer
        .into_inner()
        .map_err(|e| PipelineError::Io(e.into_error()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use divergence_engine::RowProcessor;

    const SAMPLE: &str = "chr1\t100\t200\t50.0\t5\t5\nchr1\t300\t400\t100.0\t10\t0\n";

    #[test]
    fn test_parse_coverage_lines() {
        let rows = read_coverage_from(SAMPLE.as_bytes()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].chr, "chr1");
        assert_eq!(rows[0].start, 100);
        assert_eq!(rows[1].percentage, "100.0");
        assert_eq!(rows[1].methylated, 10);
        assert_eq!(rows[1].unmethylated, 0);
    }

    #[test]
    fn test_wrong_column_count() {
        let err = read_coverage_from("chr1\t100\t200\t5\t5\n".as_bytes()).unwrap_err();
        assert!(matches!(err, PipelineError::MalformedRow { line: 1, found: 5 }));
    }

    #[test]
    fn test_non_numeric_count() {
        let err = read_coverage_from("chr1\t100\t200\t50.0\tfive\t5\n".as_bytes()).unwrap_err();
        assert!(matches!(err, PipelineError::Csv(_)));

        let err = read_coverage_from("chr1\t100\t200\tNA\t5\t5\n".as_bytes()).unwrap_err();
        assert!(matches!(err, PipelineError::NonNumeric { line: 1, ref value } if value == "NA"));
    }

    #[test]
    fn test_row_table_layout() {
        let rows = read_coverage_from(SAMPLE.as_bytes()).unwrap();
        let table = RowProcessor::default().process(rows).unwrap();
        let bytes = write_row_table_to(Vec::new(), &table).unwrap();
        let text = String::from_utf8(bytes).unwrap();

        let mut lines = text.lines();
        assert_eq!(lines.next().unwrap(), ROW_HEADER.join(","));
        let first: Vec<&str> = lines.next().unwrap().split(',').collect();
        assert_eq!(first.len(), ROW_HEADER.len());
        assert_eq!(&first[..6], &["chr1", "100", "200", "50.0", "5", "5"]);
        assert!(lines.next().unwrap().starts_with("chr1,300,400,100.0,10,0,"));
        assert!(lines.next().is_none());
    }

    #[test]
    fn test_fourth_column_written_verbatim() {
        let input = "chr2\t5\t6\t50\t1\t1\nchr2\t7\t8\t33.3333\t1\t2\n";
        let rows = read_coverage_from(input.as_bytes()).unwrap();
        let table = RowProcessor::default().process(rows).unwrap();
        let text = String::from_utf8(write_row_table_to(Vec::new(), &table).unwrap()).unwrap();

        let mut lines = text.lines().skip(1);
        assert!(lines.next().unwrap().starts_with("chr2,5,6,50,1,1,"));
        assert!(lines.next().unwrap().starts_with("chr2,7,8,33.3333,1,2,"));
    }

    #[test]
    fn test_aggregate_table_blank_for_missing() {
        let meta = FileMetadata::from_file_name("CpG_SampleA_1_chr_5.cov.gz").unwrap();
        let record = AggregateRecord::new(meta, &AggregateDivergence::no_data());
        let bytes = write_aggregate_table_to(Vec::new(), &[record]).unwrap();
        let text = String::from_utf8(bytes).unwrap();

        let mut lines = text.lines();
        assert_eq!(lines.next().unwrap(), AGGREGATE_HEADER.join(","));
        assert_eq!(lines.next().unwrap(), "SampleA_1,5,CpG,,,,,,");
    }

    #[test]
    fn test_empty_aggregate_table_keeps_header() {
        let bytes = write_aggregate_table_to(Vec::new(), &[]).unwrap();
        assert_eq!(String::from_utf8(bytes).unwrap().trim_end(), AGGREGATE_HEADER.join(","));
    }
}
