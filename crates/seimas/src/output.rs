use std::io::Write;

use crate::types::MemberRecord;

#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    #[error("No member records to write")]
    NoRecords,
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Writes a header taken from the first record's keys, then one line per
/// record. Absent values are written as empty fields.
pub fn write_csv<W: Write>(members: &[MemberRecord], writer: W) -> Result<(), OutputError> {
    let first = members.first().ok_or(OutputError::NoRecords)?;
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(first.keys())?;
    for member in members {
        wtr.write_record(
            member
                .values()
                .iter()
                .map(|value| value.as_deref().unwrap_or_default()),
        )?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn to_csv_string(members: &[MemberRecord]) -> Result<String, OutputError> {
    let mut buf = Vec::new();
    write_csv(members, &mut buf)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

pub fn to_json_string(members: &[MemberRecord]) -> Result<String, OutputError> {
    if members.is_empty() {
        return Err(OutputError::NoRecords);
    }
    Ok(serde_json::to_string_pretty(members)?)
}

/// One numbered line per member, as printed by the text output mode.
pub fn to_text_string(members: &[MemberRecord]) -> Result<String, OutputError> {
    if members.is_empty() {
        return Err(OutputError::NoRecords);
    }
    let mut text = String::new();
    for (i, member) in members.iter().enumerate() {
        text.push_str(&format!("{:>3}. {}\n", i + 1, member));
    }
    Ok(text)
}
