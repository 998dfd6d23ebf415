//! Parsing of ServerQuery reply lines.

use std::collections::HashMap;

use crate::{QueryError, escape::unescape};

/// One `|`-separated entry of a reply, as unescaped key/value pairs.
pub type Record = HashMap<String, String>;

/// The `error id=.. msg=..` line terminating every reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    pub id: u32,
    pub message: String,
}

impl Status {
    pub fn is_ok(&self) -> bool {
        self.id == 0
    }
}

/// Parse a data line into its records.
///
/// Properties without `=` are kept with an empty value.
pub fn parse_records(line: &str) -> Vec<Record> {
    line.split('|').map(parse_record).collect()
}

fn parse_record(entry: &str) -> Record {
    entry
        .split(' ')
        .filter(|property| !property.is_empty())
        .map(|property| match property.split_once('=') {
            Some((key, value)) => (key.to_string(), unescape(value)),
            None => (property.to_string(), String::new()),
        })
        .collect()
}

/// Parse the status line, returning `None` if the line is not one.
pub fn parse_status(line: &str) -> Option<Result<Status, QueryError>> {
    let rest = line.strip_prefix("error ")?;
    let record = parse_record(rest);

    let status = record
        .get("id")
        .ok_or_else(|| QueryError::Protocol(format!("status line without id: {line}")))
        .and_then(|id| {
            id.parse::<u32>()
                .map_err(|_| QueryError::Protocol(format!("status line with invalid id: {line}")))
        })
        .map(|id| Status {
            id,
            message: record.get("msg").cloned().unwrap_or_default(),
        });

    Some(status)
}
