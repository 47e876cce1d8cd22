//! framecap helper executable.
//!
//! Two jobs: launching applications with the capture library loaded, and
//! serving as the 32-bit injection delegate a 64-bit controller spawns for
//! WoW64 targets. In the delegate role the process exit code carries the
//! control identifier back to the controller (zero meaning failure), so this
//! binary must exist in both bitnesses, with the 32-bit build living in an
//! `x86/` subdirectory next to the native one.

mod cli;
#[cfg(windows)]
mod error;

#[cfg(windows)]
fn main() {
    use clap::Parser;

    use crate::cli::{Cli, Command};

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Launch(args) => match run_launch(args) {
            Ok(ident) => println!("capture started, control identifier {ident}"),
            Err(e) => {
                tracing::error!("{e}");
                std::process::exit(1);
            }
        },
        Command::Cap32For64(args) => {
            // Exit code contract: the control identifier, zero on failure.
            let ident = run_delegate(args).unwrap_or_else(|e| {
                tracing::error!("{e}");
                0
            });
            std::process::exit(ident as i32);
        }
    }
}

#[cfg(windows)]
fn run_launch(args: cli::LaunchArgs) -> error::Result<u32> {
    use framecap_layer_lib::options::CaptureOptions;

    let cmdline = args.args.join(" ");
    let options = CaptureOptions::default();

    let ident = framecap_inject::launch_and_inject(
        &args.app,
        &args.workdir,
        &cmdline,
        &[],
        args.log.as_deref(),
        Some(&options),
        args.wait,
    )?;

    Ok(ident)
}

#[cfg(windows)]
fn run_delegate(args: cli::Cap32For64Args) -> error::Result<u32> {
    use error::CliError;
    use framecap_inject::delegate::parse_env_args;
    use framecap_layer_lib::options::CaptureOptions;

    let options = CaptureOptions::from_hex(&args.capopts)?;
    let env = parse_env_args(&args.env).map_err(CliError::BadEnvArgs)?;
    let logfile = (!args.log.is_empty()).then_some(args.log.as_str());

    let ident =
        framecap_inject::inject_into_process(args.pid, &env, logfile, Some(&options), false)?;

    Ok(ident)
}

#[cfg(not(windows))]
fn main() {
    use clap::Parser;

    let _ = cli::Cli::parse();
    eprintln!("framecap-cmd only runs on Windows hosts");
    std::process::exit(1);
}
