use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "bv",
    author,
    version,
    about = "Store, list and serve versioned build artifacts",
    disable_help_subcommand = true
)]
pub struct BvCli {
    #[arg(
        long,
        value_name = "DIR",
        help = "Store root holding versions/ and changelogs/ (overrides BV_HOME)",
        global = true
    )]
    pub root: Option<PathBuf>,
    #[arg(
        short,
        long,
        help = "Suppress human output (errors still print to stderr)",
        global = true
    )]
    pub quiet: bool,
    #[arg(
        short,
        long,
        action = ArgAction::Count,
        help = "Increase logging (-vv reaches trace)",
        global = true
    )]
    pub verbose: u8,
    #[arg(long, help = "Force trace logging regardless of -v/-q", global = true)]
    pub trace: bool,
    #[arg(
        long,
        help = "Emit {status,message,details} JSON envelopes",
        global = true
    )]
    pub json: bool,
    #[command(subcommand)]
    pub command: BvCommand,
}

#[derive(Subcommand, Debug)]
pub enum BvCommand {
    #[command(about = "List stored versions, lowest first")]
    List,
    #[command(about = "Show the highest stored version")]
    Latest,
    #[command(about = "Show the record for one version")]
    Show(VersionArgs),
    #[command(
        about = "Store an artifact under a version, replacing any earlier upload",
        override_usage = "bv ingest <VERSION> <FILE|->"
    )]
    Ingest(IngestArgs),
    #[command(about = "Write a stored artifact to a file or stdout")]
    Fetch(FetchArgs),
    #[command(about = "Compute hashes for records stored before hashing existed")]
    Backfill,
    #[command(about = "Recompute artifact digests and compare with the index")]
    Verify(VerifyArgs),
    #[command(about = "Print the release notes for a version")]
    Changelog(VersionArgs),
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    #[arg(value_name = "VERSION")]
    pub version: String,
}

#[derive(Args, Debug)]
pub struct IngestArgs {
    #[arg(value_name = "VERSION")]
    pub version: String,
    #[arg(value_name = "FILE", help = "Artifact to upload, or - to read stdin")]
    pub input: PathBuf,
}

#[derive(Args, Debug)]
pub struct FetchArgs {
    #[arg(value_name = "VERSION")]
    pub version: String,
    #[arg(
        short,
        long,
        value_name = "PATH",
        help = "Write to PATH instead of stdout"
    )]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct VerifyArgs {
    #[arg(value_name = "VERSION", help = "Verify one version (default: all)")]
    pub version: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_definition_is_consistent() {
        BvCli::command().debug_assert();
    }

    #[test]
    fn global_flags_follow_subcommands() {
        let cli = BvCli::try_parse_from(["bv", "fetch", "v1.0", "-o", "out.jar", "--json"])
            .expect("parse");
        assert!(cli.json);
        match cli.command {
            BvCommand::Fetch(args) => {
                assert_eq!(args.version, "v1.0");
                assert_eq!(args.output, Some(PathBuf::from("out.jar")));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
