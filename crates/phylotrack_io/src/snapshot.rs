//! Tabular snapshots of a forest.
//!
//! A snapshot is a CSV file with one row per stored taxon. The fixed columns
//! are followed by the encoded info column and any registered extra columns:
//!
//! ```text
//! id,ancestor_list,origin_time,destruction_time,num_orgs,tot_orgs,num_offspring,total_offspring,depth,info
//! 1,[NONE],0,inf,1,3,2,4,0,AAB
//! ```
//!
//! Paths ending in `.gz` are gzip-compressed on write and decompressed on load.

use crate::codec::InfoCodec;
use crate::error::{IoError, Result};
use csv::{ReaderBuilder, StringRecord, Writer};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use phylotrack_core::Systematics;
use phylotrack_data::{Taxon, TaxonId, TaxonRecord};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

/// Fixed snapshot columns, in file order.
pub const SNAPSHOT_COLUMNS: [&str; 9] = [
    "id",
    "ancestor_list",
    "origin_time",
    "destruction_time",
    "num_orgs",
    "tot_orgs",
    "num_offspring",
    "total_offspring",
    "depth",
];

/// Name of the info column written by [`write_snapshot`].
pub const INFO_COLUMN: &str = "info";

/// How a loaded snapshot is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadOptions {
    /// Treat taxa without children as still alive.
    pub assume_leaves_extant: bool,
    /// Recompute `total_offspring` from the loaded tree instead of trusting the column.
    pub adjust_total_offspring: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            assume_leaves_extant: true,
            adjust_total_offspring: true,
        }
    }
}

fn is_gzip(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "gz")
}

fn format_ancestors(parent: Option<TaxonId>) -> String {
    match parent {
        Some(id) => format!("[{id}]"),
        None => "[NONE]".to_string(),
    }
}

fn parse_ancestors(cell: &str) -> std::result::Result<Vec<TaxonId>, String> {
    let inner = cell
        .trim()
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
        .ok_or_else(|| format!("ancestor list {cell:?} is not bracketed"))?;
    inner
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty() && *s != "NONE")
        .map(|s| {
            s.parse::<u64>()
                .map(TaxonId)
                .map_err(|e| format!("bad ancestor id {s:?}: {e}"))
        })
        .collect()
}

/// Writes every stored taxon of `sys`, ordered by id. Returns the row count.
pub fn write_snapshot<O, I, W: Write>(
    sys: &Systematics<O, I>,
    codec: &impl InfoCodec<I>,
    writer: W,
) -> Result<usize>
where
    I: PartialEq,
{
    let mut out = Writer::from_writer(writer);

    let mut header: Vec<&str> = SNAPSHOT_COLUMNS.to_vec();
    header.push(INFO_COLUMN);
    header.extend(sys.snapshot_funs().map(|(key, _)| key));
    out.write_record(&header)?;

    let mut taxa: Vec<&Taxon<I>> = sys.iter().collect();
    taxa.sort_by_key(|t| t.id());

    for taxon in taxa.iter().copied() {
        let id = taxon.id();
        let mut row = vec![
            id.to_string(),
            format_ancestors(sys.parent(id)),
            taxon.origination_time().to_string(),
            taxon.destruction_time().to_string(),
            taxon.num_orgs().to_string(),
            taxon.tot_orgs().to_string(),
            taxon.num_offspring().to_string(),
            taxon.total_offspring().to_string(),
            sys.depth(id).to_string(),
            codec.encode(taxon.info()),
        ];
        row.extend(sys.snapshot_funs().map(|(_, fun)| fun(taxon)));
        out.write_record(&row)?;
    }
    out.flush()?;
    Ok(taxa.len())
}

/// Writes a snapshot to `path`, compressing when it ends in `.gz`.
pub fn snapshot_to_file<O, I>(
    sys: &Systematics<O, I>,
    codec: &impl InfoCodec<I>,
    path: impl AsRef<Path>,
) -> Result<usize>
where
    I: PartialEq,
{
    let path = path.as_ref();
    let context = || format!("writing snapshot {}", path.display());
    let file = File::create(path).map_err(|e| IoError::from(e).with_context(context()))?;

    let rows = if is_gzip(path) {
        let mut encoder = GzEncoder::new(BufWriter::new(file), Compression::default());
        let rows = write_snapshot(sys, codec, &mut encoder)?;
        encoder.finish()?.flush()?;
        rows
    } else {
        let mut writer = BufWriter::new(file);
        let rows = write_snapshot(sys, codec, &mut writer)?;
        writer.flush()?;
        rows
    };

    tracing::info!(path = %path.display(), rows, "Snapshot written");
    Ok(rows)
}

struct Columns {
    id: usize,
    ancestors: usize,
    info: usize,
    origin: Option<usize>,
    destruction: Option<usize>,
    num_orgs: Option<usize>,
    tot_orgs: Option<usize>,
    total_offspring: Option<usize>,
}

impl Columns {
    fn locate(headers: &StringRecord, info_col: &str) -> Result<Self> {
        let find = |name: &str| headers.iter().position(|h| h.trim() == name);
        let require = |name: &str| find(name).ok_or_else(|| IoError::missing_column(name));
        Ok(Self {
            id: require("id")?,
            ancestors: require("ancestor_list")?,
            info: require(info_col)?,
            origin: find("origin_time"),
            destruction: find("destruction_time"),
            num_orgs: find("num_orgs"),
            tot_orgs: find("tot_orgs"),
            total_offspring: find("total_offspring"),
        })
    }
}

fn optional_cell<T: std::str::FromStr>(
    record: &StringRecord,
    column: Option<usize>,
    row: usize,
) -> Result<Option<T>>
where
    T::Err: std::fmt::Display,
{
    let Some(cell) = column.and_then(|c| record.get(c)).map(str::trim) else {
        return Ok(None);
    };
    if cell.is_empty() {
        return Ok(None);
    }
    cell.parse::<T>()
        .map(Some)
        .map_err(|e| IoError::malformed(row, format!("bad value {cell:?}: {e}")))
}

/// Parses snapshot rows. `info_col` names the column holding encoded info.
pub fn read_records<I, R: Read>(
    reader: R,
    info_col: &str,
    codec: &impl InfoCodec<I>,
) -> Result<Vec<TaxonRecord<I>>> {
    let mut rdr = ReaderBuilder::new().has_headers(true).from_reader(reader);
    let columns = Columns::locate(rdr.headers()?, info_col)?;

    let mut records = Vec::new();
    for (idx, result) in rdr.records().enumerate() {
        let row = idx + 1;
        let record = result?;
        let cell = |col: usize| record.get(col).unwrap_or("").trim();

        let id = cell(columns.id)
            .parse::<u64>()
            .map(TaxonId)
            .map_err(|e| IoError::malformed(row, format!("bad id: {e}")))?;
        let parents =
            parse_ancestors(cell(columns.ancestors)).map_err(|e| IoError::malformed(row, e))?;
        let info = codec
            .decode(cell(columns.info))
            .map_err(|e| IoError::malformed(row, format!("cannot decode {info_col}: {e}")))?;

        let mut taxon = TaxonRecord::new(id, parents, info);
        taxon.origination_time = optional_cell(&record, columns.origin, row)?;
        taxon.destruction_time = optional_cell(&record, columns.destruction, row)?;
        taxon.num_orgs = optional_cell(&record, columns.num_orgs, row)?;
        taxon.tot_orgs = optional_cell(&record, columns.tot_orgs, row)?;
        taxon.total_offspring = optional_cell(&record, columns.total_offspring, row)?;
        records.push(taxon);
    }
    Ok(records)
}

/// Replaces the forest of `sys` with the snapshot read from `reader`.
pub fn load_from_reader<O, I: PartialEq, R: Read>(
    sys: &mut Systematics<O, I>,
    reader: R,
    info_col: &str,
    codec: &impl InfoCodec<I>,
    options: LoadOptions,
) -> Result<()> {
    let records = read_records(reader, info_col, codec)?;
    sys.restore(
        records,
        options.assume_leaves_extant,
        options.adjust_total_offspring,
    )?;
    Ok(())
}

/// Replaces the forest of `sys` with the snapshot stored at `path`.
///
/// On any error `sys` is left as it was.
pub fn load_from_file<O, I: PartialEq>(
    sys: &mut Systematics<O, I>,
    path: impl AsRef<Path>,
    info_col: &str,
    codec: &impl InfoCodec<I>,
    options: LoadOptions,
) -> Result<()> {
    let path = path.as_ref();
    let context = || format!("loading snapshot {}", path.display());

    let result = File::open(path).map_err(IoError::from).and_then(|file| {
        let reader = BufReader::new(file);
        if is_gzip(path) {
            load_from_reader(sys, GzDecoder::new(reader), info_col, codec, options)
        } else {
            load_from_reader(sys, reader, info_col, codec, options)
        }
    });
    result.map_err(|e| e.with_context(context()))?;

    tracing::info!(
        path = %path.display(),
        taxa = sys.num_taxa(),
        active = sys.num_active(),
        "Snapshot loaded"
    );
    Ok(())
}
