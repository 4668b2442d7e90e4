//! Reference target import from delimited text

use super::region::RegionSample;
use photomon_core::{Error, Result};
use std::io::BufRead;
use tracing::debug;

/// Read reference targets, one region per row: `label, r, g, b`.
///
/// Fields are comma-separated; a double-quoted field may contain commas,
/// with `""` standing for a literal quote. Rows without exactly four fields
/// are skipped. A non-numeric target value is an error. The regions
/// returned have no observation yet.
pub fn import_reference_targets<R: BufRead>(reader: R) -> Result<Vec<RegionSample>> {
    let mut regions = Vec::new();

    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        let fields = split_record(&line);
        if fields.len() != 4 {
            debug!("Skipping line {}: {} field(s)", line_no + 1, fields.len());
            continue;
        }

        let target = fields[1..]
            .iter()
            .map(|f| {
                f.trim().parse::<f64>().map_err(|_| Error::InvalidParameter {
                    name: "target",
                    value: f.to_string(),
                    reason: format!("line {} is not a number", line_no + 1),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        regions.push(RegionSample::new(fields[0].trim(), target));
    }

    Ok(regions)
}

/// Split one delimited row into its fields, honouring double quotes
fn split_record(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut quoted = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if quoted => {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    field.push('"');
                } else {
                    quoted = false;
                }
            }
            '"' if field.trim().is_empty() => {
                field.clear();
                quoted = true;
            }
            ',' if !quoted => fields.push(std::mem::take(&mut field)),
            _ => field.push(c),
        }
    }
    fields.push(field);
    fields
}
