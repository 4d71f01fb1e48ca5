//! CSV persistence for [`EmbeddingStore`].
//!
//! The file has a header row and one row per passage:
//!
//! ```text
//! title,heading,0,1,2,...,D-1
//! Curling,Summary,0.0123,-0.0456,...
//! ```
//!
//! Row order carries no meaning. On load, `D` is the number of vector
//! columns and their indices must be exactly `0..D`. Values must be
//! finite. Any malformed header, row or value fails the whole load.

use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use super::EmbeddingStore;
use crate::error::{Error, Result};
use crate::models::PassageKey;

const TITLE: &str = "title";
const HEADING: &str = "heading";

impl EmbeddingStore {
    /// Write the store to `path`.
    ///
    /// The file is written next to its destination and renamed into place,
    /// so an interrupted save never leaves a truncated store behind.
    pub fn save(&self, path: &Path) -> Result<()> {
        let tmp = path.with_extension("csv.tmp");
        {
            let file = File::create(&tmp)?;
            write_to(self, BufWriter::new(file))?;
        }
        fs::rename(&tmp, path)?;
        Ok(())
    }

    /// Read a store previously written by [`save`](EmbeddingStore::save).
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        read_from(BufReader::new(file))
    }
}

/// Serialize `store` as CSV into `writer`.
pub fn write_to<W: Write>(store: &EmbeddingStore, writer: W) -> Result<()> {
    let dims = store.dims().unwrap_or(0);
    let mut wtr = csv::Writer::from_writer(writer);

    let mut header = Vec::with_capacity(dims + 2);
    header.push(TITLE.to_string());
    header.push(HEADING.to_string());
    header.extend((0..dims).map(|i| i.to_string()));
    wtr.write_record(&header)?;

    let mut record: Vec<String> = Vec::with_capacity(dims + 2);
    for (key, vector) in store.iter() {
        record.clear();
        record.push(key.title.clone());
        record.push(key.heading.clone());
        // `Display` for f32 prints the shortest string that parses back to
        // the same value.
        record.extend(vector.iter().map(|x| x.to_string()));
        wtr.write_record(&record)?;
    }

    wtr.flush()?;
    Ok(())
}

/// Parse CSV produced by [`write_to`].
pub fn read_from<R: Read>(reader: R) -> Result<EmbeddingStore> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(reader);

    let layout = Layout::from_headers(rdr.headers()?)?;
    let dims = layout.components.len();

    let mut keys = Vec::new();
    let mut vectors = Vec::new();
    let mut seen = HashSet::new();

    for (i, record) in rdr.records().enumerate() {
        let record = record?;
        // Header is line 1.
        let line = i + 2;

        if dims == 0 {
            return Err(Error::Format(format!(
                "line {}: file has rows but no vector columns",
                line
            )));
        }

        let field = |pos: usize| {
            record
                .get(pos)
                .ok_or_else(|| Error::Format(format!("line {}: row is too short", line)))
        };

        let key = PassageKey::new(field(layout.title)?, field(layout.heading)?);

        let mut vector = Vec::with_capacity(dims);
        for (component, &pos) in layout.components.iter().enumerate() {
            let raw = field(pos)?;
            let value = raw.trim().parse::<f32>().map_err(|_| {
                Error::Format(format!(
                    "line {}: column {} is not a number: {:?}",
                    line, component, raw
                ))
            })?;
            if !value.is_finite() {
                return Err(Error::Format(format!(
                    "line {}: column {} is not finite: {:?}",
                    line, component, raw
                )));
            }
            vector.push(value);
        }

        if !seen.insert(key.clone()) {
            return Err(Error::Format(format!(
                "line {}: duplicate passage {}",
                line, key
            )));
        }
        keys.push(key);
        vectors.push(vector);
    }

    let mut store = EmbeddingStore::with_dims(dims);
    store.put_all(keys, vectors)?;
    Ok(store)
}

/// Column positions resolved from the header row.
struct Layout {
    title: usize,
    heading: usize,
    /// `components[i]` is the column position of vector component `i`.
    components: Vec<usize>,
}

impl Layout {
    fn from_headers(headers: &csv::StringRecord) -> Result<Self> {
        let mut title = None;
        let mut heading = None;
        let mut numbered: Vec<(usize, usize)> = Vec::new();

        for (pos, name) in headers.iter().enumerate() {
            let name = name.trim();
            match name {
                TITLE => set_once(&mut title, pos, TITLE)?,
                HEADING => set_once(&mut heading, pos, HEADING)?,
                other => {
                    let index: usize = other.parse().map_err(|_| {
                        Error::Format(format!("unexpected column {:?}", other))
                    })?;
                    numbered.push((index, pos));
                }
            }
        }

        let title =
            title.ok_or_else(|| Error::Format(format!("missing required column {:?}", TITLE)))?;
        let heading = heading
            .ok_or_else(|| Error::Format(format!("missing required column {:?}", HEADING)))?;

        // Without duplicates, `k` numbered columns can only cover `0..k`.
        let dims = numbered.len();
        if let Some(&(index, _)) = numbered.iter().find(|(i, _)| *i >= dims) {
            return Err(Error::Format(format!(
                "missing vector column: index {} with only {} vector columns",
                index, dims
            )));
        }
        let mut slots: Vec<Option<usize>> = vec![None; dims];
        for (index, pos) in numbered {
            if slots[index].replace(pos).is_some() {
                return Err(Error::Format(format!("duplicate column \"{}\"", index)));
            }
        }
        let components = slots
            .into_iter()
            .enumerate()
            .map(|(i, slot)| {
                slot.ok_or_else(|| Error::Format(format!("missing vector column \"{}\"", i)))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            title,
            heading,
            components,
        })
    }
}

fn set_once(slot: &mut Option<usize>, pos: usize, name: &str) -> Result<()> {
    if slot.replace(pos).is_some() {
        return Err(Error::Format(format!("duplicate column {:?}", name)));
    }
    Ok(())
}
