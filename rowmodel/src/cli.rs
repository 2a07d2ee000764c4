//! The `rowmodel` command: load a backend payload through a table schema and print the dumps.

use anyhow::Context;
use serde_json::Value as JsonValue;
use std::fs::File;
use std::io::{self, BufReader, Read, Write};
use tracing::{debug, info};

use crate::config::{Args, Config};
use crate::db::load::{Loaded, Payload, Response};
use crate::db::models::{self, ENTITIES};
use crate::db::record::Row;

/// Open the payload named on the command line; `-` is standard input.
pub fn open_input(path: &str) -> anyhow::Result<Box<dyn Read>> {
    if path == "-" {
        return Ok(Box::new(io::stdin().lock()));
    }
    let file = File::open(path).with_context(|| format!("Failed to open input file {path}"))?;
    Ok(Box::new(BufReader::new(file)))
}

pub fn run(args: &Args, config: &Config, input: impl Read, mut out: impl Write) -> anyhow::Result<()> {
    if args.list_tables {
        return list_tables(&mut out);
    }

    let table = args.table.as_deref().context("No table given; pass --table or --list-tables")?;
    let schema = models::schema_for_table(table).with_context(|| format!("Unknown table '{table}'"))?;

    let raw: JsonValue = serde_json::from_reader(input).context("Failed to parse input as JSON")?;
    let payload = if args.envelope {
        let response: Response = serde_json::from_value(raw).context("Input is not a response envelope")?;
        Payload::Envelope(response)
    } else {
        Payload::Raw(raw)
    };

    let loaded = Row::load(schema, payload, &config.load_options())?;
    info!(table, rows = loaded.len(), "Payload is valid");

    if args.validate_only {
        return Ok(());
    }

    let dumped = match loaded {
        Loaded::One(row) => JsonValue::Object(row.dump()),
        Loaded::Many(rows) => JsonValue::Array(rows.iter().map(|row| JsonValue::Object(row.dump())).collect()),
    };
    if config.pretty {
        serde_json::to_writer_pretty(&mut out, &dumped)?;
    } else {
        serde_json::to_writer(&mut out, &dumped)?;
    }
    writeln!(out)?;
    debug!("Wrote dump");
    Ok(())
}

fn list_tables(out: &mut impl Write) -> anyhow::Result<()> {
    for schema in ENTITIES {
        let fields: Vec<_> = schema
            .fields
            .iter()
            .map(|f| {
                if schema.is_required(f.name) {
                    format!("{}*", f.name)
                } else {
                    f.name.to_string()
                }
            })
            .collect();
        writeln!(out, "{}\t{}\t{}", schema.table_name, schema.entity, fields.join(","))?;
    }
    Ok(())
}
