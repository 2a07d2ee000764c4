//! Configuration for the `rowmodel` binary.
//!
//! Settings come from a YAML file named on the command line, overridden by environment
//! variables prefixed with `ROWMODEL_`. Nested keys use a double underscore, so
//! `ROWMODEL_LOAD__UNKNOWN_FIELDS=reject` sets `load.unknown_fields`.
//!
//! ```yaml
//! log_filter: debug
//! pretty: false
//! load:
//!   unknown_fields: reject
//! ```
//!
//! A missing file is not an error; every option has a default.

use clap::Parser;
use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::{Deserialize, Serialize};

use crate::db::load::{LoadOptions, UnknownFields};

/// Validate backend payloads against a table schema and print their dumps
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file
    #[arg(short = 'f', long, env = "ROWMODEL_CONFIG", default_value = "rowmodel.yaml")]
    pub config: String,

    /// Table whose schema the payload is loaded with
    #[arg(short, long, required_unless_present = "list_tables")]
    pub table: Option<String>,

    /// Payload file; `-` reads standard input
    #[arg(default_value = "-")]
    pub input: String,

    /// Treat the payload as a response envelope (`{"data": ..., "count": ...}`)
    #[arg(short, long)]
    pub envelope: bool,

    /// Load the payload and exit without printing the dumps
    #[arg(long)]
    pub validate_only: bool,

    /// Print the registered tables and exit
    #[arg(long)]
    pub list_tables: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Default tracing filter, used when `RUST_LOG` is unset
    pub log_filter: String,
    /// Pretty-print JSON output
    pub pretty: bool,
    pub load: LoadConfig,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoadConfig {
    /// Columns in a payload that the table does not declare
    pub unknown_fields: UnknownFields,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_filter: "info".to_string(),
            pretty: true,
            load: LoadConfig::default(),
        }
    }
}

impl Config {
    #[allow(clippy::result_large_err)]
    pub fn load(args: &Args) -> Result<Self, figment::Error> {
        Self::figment(args).extract()
    }

    pub fn figment(args: &Args) -> Figment {
        Figment::new()
            .merge(Yaml::file(&args.config))
            // ROWMODEL_CONFIG selects the file and is not itself a setting
            .merge(Env::prefixed("ROWMODEL_").ignore(&["config"]).split("__"))
    }

    pub fn load_options(&self) -> LoadOptions {
        LoadOptions {
            unknown_fields: self.load.unknown_fields,
        }
    }
}
