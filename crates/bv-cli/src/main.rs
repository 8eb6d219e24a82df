use clap::Parser;
use color_eyre::Result;

mod cli;
mod dispatch;
mod outcome;
mod output;

use cli::BvCli;

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = BvCli::parse();
    init_tracing(cli.trace, cli.verbose, cli.quiet);

    let outcome = dispatch::execute(&cli);
    let code = output::emit(&cli, &outcome)?;

    if code == 0 {
        Ok(())
    } else {
        std::process::exit(code);
    }
}

// Logs go to stderr so `bv fetch` can stream artifact bytes on stdout.
fn init_tracing(trace: bool, verbose: u8, quiet: bool) {
    let level = if trace {
        "trace"
    } else if quiet {
        "error"
    } else {
        match verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = format!("bv={level},bv_cli={level},bv_store={level},bv_domain={level}");
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(true)
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
}
