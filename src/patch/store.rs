//! Two-column CSV persistence: `Source_Channel,Target_Channel` header, one
//! pair per row.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::Path;

use crate::constants::PATCH_CSV_HEADER;
use crate::error::{GatewayError, Result};

pub fn save(patches: &BTreeMap<u16, u16>, path: &Path) -> Result<()> {
    let mut out = String::with_capacity(PATCH_CSV_HEADER.len() + patches.len() * 10);
    out.push_str(PATCH_CSV_HEADER);
    out.push('\n');
    for (source, target) in patches {
        // writing into a String cannot fail
        let _ = writeln!(out, "{source},{target}");
    }
    std::fs::write(path, out)?;
    Ok(())
}

pub fn load(path: &Path) -> Result<BTreeMap<u16, u16>> {
    let text = std::fs::read_to_string(path)?;
    parse(&text)
}

pub(crate) fn parse(text: &str) -> Result<BTreeMap<u16, u16>> {
    let mut patches = BTreeMap::new();
    let mut lines = text.lines().enumerate();

    match lines.next() {
        Some((_, header)) if header.trim().trim_start_matches('\u{feff}') == PATCH_CSV_HEADER => {}
        Some((_, other)) => {
            return Err(GatewayError::InvalidPatchFile {
                line: 1,
                reason: format!("expected header {PATCH_CSV_HEADER:?}, found {other:?}"),
            });
        }
        None => return Ok(patches),
    }

    for (idx, line) in lines {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let lineno = idx + 1;
        let mut cols = line.split(',').map(str::trim);
        let (Some(src), Some(dst)) = (cols.next(), cols.next()) else {
            return Err(GatewayError::InvalidPatchFile {
                line: lineno,
                reason: "expected two columns".into(),
            });
        };
        let num = |s: &str| {
            s.parse::<u16>().map_err(|e| GatewayError::InvalidPatchFile {
                line: lineno,
                reason: format!("{s:?}: {e}"),
            })
        };
        patches.insert(num(src)?, num(dst)?);
    }
    Ok(patches)
}
