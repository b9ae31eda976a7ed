//! Command-line runner: loads a parameter file, runs one simulation and writes its report.

use clap::{Parser, ValueEnum};
use ctns::{
    info,
    log::{enable_logging, LevelFilter},
    report::write_report,
    Context, ContextSimulationExt, CtnsError, DumpType, Parameters,
};
use std::{path::PathBuf, process::ExitCode};

#[derive(Copy, Clone, Debug, ValueEnum)]
enum DumpArg {
    Full,
    Light,
}

impl From<DumpArg> for DumpType {
    fn from(value: DumpArg) -> Self {
        match value {
            DumpArg::Full => DumpType::Full,
            DumpArg::Light => DumpType::Light,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "ctns")]
#[command(about = "Simulate an epidemic over a daily contact network", long_about = None)]
struct Args {
    /// JSON parameter file; missing fields take their defaults
    #[arg(short, long)]
    parameters: Option<PathBuf>,

    /// Output path prefix
    #[arg(short, long, default_value = "ctns")]
    output: PathBuf,

    /// Base seed, overriding the parameter file
    #[arg(short, long)]
    seed: Option<u64>,

    /// What to record, overriding the parameter file
    #[arg(short, long, value_enum)]
    dump_type: Option<DumpArg>,

    #[arg(short, long, default_value = "info")]
    log_level: LevelFilter,
}

fn run(args: Args) -> Result<(), CtnsError> {
    enable_logging(args.log_level)?;

    let mut parameters = match &args.parameters {
        Some(path) => Parameters::load(path)?,
        None => Parameters::default(),
    };
    if let Some(seed) = args.seed {
        parameters.seed = Some(seed);
    }
    if let Some(dump_type) = args.dump_type {
        parameters.dump_type = dump_type.into();
    }

    let mut context = Context::new();
    context.init_simulation(parameters)?;
    let report = context.execute()?;
    let files = write_report(&args.output, &report)?;
    info!(
        "wrote {} and {}",
        files.report.display(),
        files.parameters.display()
    );
    Ok(())
}

fn main() -> ExitCode {
    match run(Args::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("ctns: {err}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_parameter_file_is_returned_to_main() {
        let dir = tempfile::tempdir().unwrap();
        let args = Args::try_parse_from([
            "ctns",
            "--parameters",
            dir.path().join("absent.json").to_str().unwrap(),
            "--log-level",
            "off",
        ])
        .unwrap();
        assert!(matches!(run(args), Err(CtnsError::Io(_))));
    }
}
