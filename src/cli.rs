use std::path::PathBuf;

use clap::Parser;

use crate::{command::upload::UploadArgs, upload::UPLOAD_URL};

#[derive(Parser, Debug)]
#[command(version, about = "Upload a file to Monarch in 5 MiB chunks", long_about = None)]
pub struct Cli {
    /// The JSON file holding the upload secret. Created with an empty secret if missing.
    #[arg(long, value_name = "PATH", env = "MONARCH_CONFIG")]
    pub config: Option<PathBuf>,
    /// The upload endpoint.
    #[arg(long, value_name = "URL", default_value = UPLOAD_URL)]
    pub endpoint: String,
    #[command(flatten)]
    pub upload: UploadArgs,
}

/// Exit status for a failed parse. `--help` and `--version` are not failures.
pub fn parse_error_code(err: &clap::Error) -> u8 {
    if err.use_stderr() {
        1
    } else {
        0
    }
}
