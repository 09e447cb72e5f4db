//! Per-session CSV serialization
//!
//! One CSV file per session, named after the source container, the
//! zero-padded session ordinal and the session start timestamp. The header
//! row is `Timestamp` followed by one `Name [unit]` column per channel;
//! unknown channel codes get a generic `Channel NNN` column and no scaling
//! was applied to their values upstream.

use ae3_decoder::{ChannelTable, Session};
use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Write one CSV file per session; returns the paths written
pub fn write_sessions(
    sessions: &[Session],
    table: &ChannelTable,
    source: &Path,
    output_dir: &Path,
) -> Result<Vec<PathBuf>> {
    let stem = source
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("dump");

    let mut written = Vec::with_capacity(sessions.len());
    for session in sessions {
        let path = output_dir.join(csv_name(stem, session));
        write_session(session, table, &path)
            .with_context(|| format!("Failed to write {:?}", path))?;
        log::info!("Session {:02}: {:?}", session.index, path.file_name());
        written.push(path);
    }
    Ok(written)
}

/// `{stem}_session{NN}_{YYYYMMDD_HHMMSS}.csv`
fn csv_name(stem: &str, session: &Session) -> String {
    format!(
        "{}_session{:02}_{}.csv",
        stem,
        session.index,
        session.start_time.format("%Y%m%d_%H%M%S")
    )
}

fn write_session(session: &Session, table: &ChannelTable, path: &Path) -> Result<()> {
    let file = File::create(path)?;
    let mut out = BufWriter::new(file);

    writeln!(out, "{}", header_row(&session.channels, table))?;

    for record in &session.records {
        write!(out, "{}", record.timestamp.format("%Y-%m-%d %H:%M:%S"))?;
        for (column, &code) in session.channels.iter().enumerate() {
            let decimals = table.class_of(code).map(|c| c.decimals).unwrap_or(0);
            write!(out, ",{:.*}", decimals, record.values[column])?;
        }
        writeln!(out)?;
    }

    out.flush()?;
    Ok(())
}

/// Fixed column header: `Timestamp` plus one column per channel
fn header_row(channels: &[u16], table: &ChannelTable) -> String {
    let mut header = String::from("Timestamp");
    for &code in channels {
        match table.channel(code) {
            Some(def) => {
                let unit = table.class_of(code).map(|c| c.unit).unwrap_or("-");
                header.push_str(&format!(",{} [{}]", def.name, unit));
            }
            None => header.push_str(&format!(",Channel {}", code)),
        }
    }
    header
}
