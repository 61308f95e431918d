//! `taller` binary

use std::process::ExitCode;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    taller::cli::main(taller::demo::resolver(), taller::demo::models()).await
}
