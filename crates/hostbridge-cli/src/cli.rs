//! Command-line argument definitions for the `hostbridge` binary.

use clap::{Args, Parser, Subcommand};
use hostbridge_dispatch::{Credentials, GroupAssignment, ServiceConfig};

/// Bridge between the command line and the image-host upload worker.
#[derive(Parser, Debug)]
#[command(name = "hostbridge", version, disable_help_subcommand = true)]
pub(crate) struct Cli {
    #[command(subcommand)]
    pub(crate) command: CliCommand,
}

/// Worker-backed operations.
#[derive(Subcommand, Debug, Clone)]
pub(crate) enum CliCommand {
    /// Checks that the credentials are accepted by a service.
    Verify(ServiceArgs),
    /// Lists the galleries of the account behind the credentials.
    Galleries(ServiceArgs),
    /// Uploads files as one group and prints one JSON line per file.
    Upload(UploadArgs),
}

/// A service and the credentials used against it.
#[derive(Args, Debug, Clone)]
pub(crate) struct ServiceArgs {
    /// Destination identifier, for example `imx.to`.
    #[arg(value_name = "SERVICE")]
    pub(crate) service: String,
    /// Credential entry; repeat for each key.
    #[arg(long = "cred", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    pub(crate) creds: Vec<(String, String)>,
}

impl ServiceArgs {
    pub(crate) fn credentials(&self) -> Credentials {
        self.creds.iter().cloned().collect()
    }
}

/// Arguments of the `upload` subcommand.
#[derive(Args, Debug, Clone)]
pub(crate) struct UploadArgs {
    #[command(flatten)]
    pub(crate) target: ServiceArgs,
    /// Title of the group; galleries created for it are named after it.
    #[arg(long, value_name = "TITLE")]
    pub(crate) group: String,
    /// Number of leading files uploaded with cover thumbnails.
    #[arg(long, value_name = "N")]
    pub(crate) cover_count: Option<usize>,
    /// Service setting; repeat for each key.
    #[arg(long = "set", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    pub(crate) settings: Vec<(String, String)>,
    /// Files to upload, in group order.
    #[arg(value_name = "FILE", required = true, num_args = 1..)]
    pub(crate) files: Vec<String>,
}

impl UploadArgs {
    pub(crate) fn service_config(&self) -> ServiceConfig {
        self.settings.iter().cloned().collect()
    }

    pub(crate) fn group(&self) -> GroupAssignment {
        let group = GroupAssignment::new(self.group.as_str(), self.files.iter().cloned());
        match self.cover_count {
            Some(count) => group.with_cover_count(count),
            None => group,
        }
    }
}

/// Splits `KEY=VALUE` at the first `=`. Values may be empty; keys may not.
pub(crate) fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    let Some((key, value)) = raw.split_once('=') else {
        return Err(format!("expected KEY=VALUE, got '{raw}'"));
    };
    let trimmed = key.trim();
    if trimmed.is_empty() {
        return Err(format!("missing key in '{raw}'"));
    }
    Ok((trimmed.to_owned(), value.to_owned()))
}
