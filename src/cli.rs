//! CLI argument parsing

use crate::programmers;
use clap::Parser;
use std::path::PathBuf;

/// Generate dynamic help text for the programmer argument
fn programmer_help() -> String {
    format!(
        "Programmer to use, with options after a colon [available: {}]",
        programmers::programmer_names_short()
    )
}

fn programmer_long_help() -> String {
    format!(
        "Programmer to use: name[:key=value,...]\n\nAvailable programmers:\n{}",
        programmers::programmer_descriptions()
    )
}

#[derive(Parser)]
#[command(name = "gbcom")]
#[command(author, version, about = "Replay bus command scripts over an FT4222H bridge", long_about = None)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[arg(short, long, default_value = "ft4222", help = programmer_help(), long_help = programmer_long_help())]
    pub programmer: String,

    /// Parse the script and print its commands without opening hardware
    #[arg(long)]
    pub check: bool,

    /// List FT4222H interfaces and exit
    #[arg(long)]
    pub list_devices: bool,

    /// Command script (whitespace separated rows under an `op addr data` header)
    #[arg(required_unless_present = "list_devices")]
    pub script: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_debug_assert() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_script_required() {
        assert!(Cli::try_parse_from(["gbcom"]).is_err());

        let cli = Cli::try_parse_from(["gbcom", "--list-devices"]).unwrap();
        assert!(cli.list_devices);
        assert!(cli.script.is_none());
    }

    #[test]
    fn test_programmer_default() {
        let cli = Cli::try_parse_from(["gbcom", "-vv", "run.txt"]).unwrap();
        assert_eq!(cli.programmer, "ft4222");
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.script, Some(PathBuf::from("run.txt")));

        let cli = Cli::try_parse_from(["gbcom", "-p", "dummy:fill=0", "--check", "run.txt"])
            .unwrap();
        assert_eq!(cli.programmer, "dummy:fill=0");
        assert!(cli.check);
    }
}
