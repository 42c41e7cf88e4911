//! The command-line runner behind the `airborne-sim` binary.

use std::fmt::Write as _;
use std::path::PathBuf;

use clap::{Args, Command, FromArgMatches as _, ValueEnum};
use serde::Serialize;

use crate::error::SimulationError;
use crate::history::StateCounts;
use crate::log::{enable_logging, info, parse_level_filter, set_log_level, LevelFilter};
use crate::parameters::Parameters;
use crate::people::DiseaseState;
use crate::simulation::Simulation;

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// A table of daily counts.
    #[default]
    Summary,
    /// `{"history": [...], "final": {...}}`
    Json,
}

/// Command line arguments of the runner.
#[derive(Args, Debug, Clone, PartialEq)]
pub struct RunnerArgs {
    /// Optional path to a JSON parameters file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Number of days to simulate
    #[arg(short, long, default_value_t = 30)]
    pub days: u32,

    /// Random seed, overriding the one in the parameters file
    #[arg(short, long)]
    pub random_seed: Option<u64>,

    /// Diagnostic log level: off, error, warn, info, debug or trace
    #[arg(short, long, default_value = "off")]
    pub log_level: String,

    /// Print the simulation's event log after the results
    #[arg(short, long)]
    pub print_log: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Summary)]
    pub format: OutputFormat,
}

fn create_cli() -> Command {
    let cli = Command::new("airborne-sim")
        .about("Simulates airborne disease spread through a synthetic city");
    RunnerArgs::augment_args(cli)
}

/// Parses runner arguments from an explicit argument list (the first item is the program name).
pub fn parse_args_from<I, T>(args: I) -> Result<RunnerArgs, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let matches = create_cli().try_get_matches_from(args)?;
    RunnerArgs::from_arg_matches(&matches)
}

/// Results of a run, as printed by the runner.
#[derive(Debug, Clone, Serialize)]
pub struct RunOutput {
    pub history: Vec<StateCounts>,
    #[serde(rename = "final")]
    pub final_counts: StateCounts,
    #[serde(skip)]
    pub log: Vec<String>,
}

/// Loads parameters, applies the command line overrides and runs the simulation.
pub fn run_with_args(args: &RunnerArgs) -> Result<RunOutput, SimulationError> {
    let level = parse_level_filter(&args.log_level).ok_or_else(|| {
        SimulationError::InvalidParameter(format!("unknown log level '{}'", args.log_level))
    })?;
    if level != LevelFilter::Off {
        enable_logging();
        set_log_level(level);
    }

    let mut parameters = match &args.config {
        Some(path) => {
            info!("loading parameters from {}", path.display());
            Parameters::load_from_file(path)?
        }
        None => Parameters::default(),
    };
    if let Some(seed) = args.random_seed {
        parameters.seed = seed;
    }

    let mut simulation = Simulation::new(parameters)?;
    simulation.run(args.days)?;
    Ok(RunOutput {
        history: simulation.history().to_vec(),
        final_counts: simulation.get_results(),
        log: simulation.log().to_vec(),
    })
}

/// Formats `output` for the terminal.
pub fn render(
    output: &RunOutput,
    format: OutputFormat,
    print_log: bool,
) -> Result<String, SimulationError> {
    let mut rendered = match format {
        OutputFormat::Json => serde_json::to_string_pretty(output)?,
        OutputFormat::Summary => {
            let mut table = String::new();
            let _ = write!(table, "{:>5}", "day");
            for state in DiseaseState::ALL {
                let _ = write!(table, " {:>12}", state.name());
            }
            table.push('\n');
            for (day, counts) in output.history.iter().enumerate() {
                let _ = write!(table, "{:>5}", day + 1);
                for state in DiseaseState::ALL {
                    let _ = write!(table, " {:>12}", counts.get(state));
                }
                table.push('\n');
            }
            table
        }
    };
    if print_log {
        rendered.push('\n');
        rendered.push_str(&output.log.join("\n"));
        rendered.push('\n');
    }
    Ok(rendered)
}

/// Parses the process arguments, runs the simulation and prints the results.
pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let matches = create_cli().get_matches();
    let args = RunnerArgs::from_arg_matches(&matches)?;
    let output = run_with_args(&args)?;
    print!("{}", render(&output, args.format, args.print_log)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn defaults() {
        let args = parse_args_from(["airborne-sim"]).unwrap();
        assert_eq!(args.days, 30);
        assert_eq!(args.config, None);
        assert_eq!(args.random_seed, None);
        assert_eq!(args.format, OutputFormat::Summary);
        assert!(!args.print_log);
    }

    #[test]
    fn bad_arguments_are_rejected() {
        assert!(parse_args_from(["airborne-sim", "--days", "many"]).is_err());
        assert!(parse_args_from(["airborne-sim", "--format", "xml"]).is_err());
    }

    #[test]
    fn runs_from_a_config_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, r#"{{ "total_population": 250, "seed": 1 }}"#).unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let args = parse_args_from([
            "airborne-sim",
            "--config",
            path.as_str(),
            "--days",
            "3",
            "--random-seed",
            "8",
            "--format",
            "json",
        ])
        .unwrap();
        let output = run_with_args(&args).unwrap();
        assert_eq!(output.history.len(), 3);
        assert_eq!(output.final_counts.total(), 250);

        let json: serde_json::Value =
            serde_json::from_str(&render(&output, args.format, false).unwrap()).unwrap();
        assert_eq!(json["history"].as_array().unwrap().len(), 3);
        assert_eq!(json["final"]["dead"], output.final_counts.get(DiseaseState::Dead));
    }

    #[test]
    fn summary_has_one_row_per_day() {
        let args = RunnerArgs {
            config: None,
            days: 2,
            random_seed: Some(3),
            log_level: "off".to_string(),
            print_log: true,
            format: OutputFormat::Summary,
        };
        let output = run_with_args(&args).unwrap();
        let rendered = render(&output, args.format, args.print_log).unwrap();
        assert!(rendered.starts_with("  day  susceptible"));
        assert!(rendered.contains("\n    2 "));
        assert!(rendered.contains("--- Turn: Social ---"));
    }

    #[test]
    fn unknown_log_level_is_an_error() {
        let args = parse_args_from(["airborne-sim", "--log-level", "loud"]).unwrap();
        assert!(matches!(
            run_with_args(&args),
            Err(SimulationError::InvalidParameter(_))
        ));
    }
}
