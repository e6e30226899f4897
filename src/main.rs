use anyhow::Result;
use clap::Parser;
use patient_intake::cli;

fn main() -> Result<()> {
    let args = cli::Args::parse();
    if let Err(err) = cli::dispatch(args) {
        eprintln!("{err:#}");
        std::process::exit(1);
    }
    Ok(())
}
