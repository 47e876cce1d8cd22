//! Command-line surface of the helper executable.

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "framecap-cmd", version, about = "framecap capture helper")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Launch an application with the capture library loaded and print the
    /// control identifier.
    Launch(LaunchArgs),

    /// Injection delegate spawned by a 64-bit controller for a 32-bit
    /// (WoW64) target. The exit code is the control identifier, zero on
    /// failure.
    #[command(name = "cap32for64", hide = true)]
    Cap32For64(Cap32For64Args),
}

#[derive(Debug, Args)]
pub struct LaunchArgs {
    /// Application to launch.
    pub app: String,

    /// Working directory for the child; defaults to the application's own
    /// directory.
    #[arg(long, default_value = "")]
    pub workdir: String,

    /// Log file pushed into the capture library.
    #[arg(long)]
    pub log: Option<String>,

    /// Block until the launched process exits.
    #[arg(long)]
    pub wait: bool,

    /// Command line passed to the application, verbatim.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}

#[derive(Debug, Args)]
pub struct Cap32For64Args {
    /// Pid of the WoW64 target.
    #[arg(long)]
    pub pid: u32,

    /// Log file pushed into the capture library. Empty means none.
    #[arg(long, default_value = "")]
    pub log: String,

    /// Capture options blob, nibble-hex encoded.
    #[arg(long)]
    pub capopts: String,

    /// Environment edits as `+env-<op> "<name>" "<value>"` groups, appended
    /// by the controller. Not clap syntax, parsed by hand.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub env: Vec<String>,
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use framecap_inject::delegate::parse_env_args;
    use framecap_layer_lib::env::EnvOp;

    use super::*;

    #[test]
    fn cap32for64_with_env_groups() {
        let cli = Cli::parse_from([
            "framecap-cmd",
            "cap32for64",
            "--pid=4242",
            "--log=C:\\logs\\cap.log",
            "--capopts=aabb",
            "+env-prepend-semicolon",
            "Path",
            "C:\\b",
        ]);

        let Command::Cap32For64(args) = cli.command else {
            panic!("expected cap32for64");
        };
        assert_eq!(args.pid, 4242);
        assert_eq!(args.log, "C:\\logs\\cap.log");
        assert_eq!(args.capopts, "aabb");

        let mods = parse_env_args(&args.env).unwrap();
        assert_eq!(mods.len(), 1);
        assert_eq!(mods[0].name, "Path");
        assert_eq!(mods[0].op, EnvOp::PrependSemicolon);
    }

    #[test]
    fn launch_collects_target_arguments() {
        let cli = Cli::parse_from([
            "framecap-cmd",
            "launch",
            "C:\\games\\game.exe",
            "--wait",
            "--",
            "-fullscreen",
            "-w",
            "1920",
        ]);

        let Command::Launch(args) = cli.command else {
            panic!("expected launch");
        };
        assert_eq!(args.app, "C:\\games\\game.exe");
        assert!(args.wait);
        assert_eq!(args.args, ["-fullscreen", "-w", "1920"]);
    }
}
