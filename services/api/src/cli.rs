use crate::seed::{run_seed, SeedArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use el_correo::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "el-correo",
    about = "Serve and seed the human-resources records service",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Populate a fresh store with roles, sample accounts, and the demo organization, then
    /// print what was created
    Seed(SeedArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Seed(args) => run_seed(args).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_flags_parse() {
        let cli = Cli::try_parse_from([
            "el-correo",
            "seed",
            "--per-worker",
            "3",
            "--wipe-cargas",
            "--extra",
            "0",
        ])
        .expect("valid arguments");
        match cli.command {
            Some(Command::Seed(args)) => {
                assert_eq!(args.per_worker, 3);
                assert!(args.wipe_cargas);
                assert_eq!(args.extra, 0);
                assert!(!args.update_password);
            }
            other => panic!("expected seed command, got {other:?}"),
        }
    }

    #[test]
    fn serve_is_the_default() {
        let cli = Cli::try_parse_from(["el-correo"]).expect("no arguments");
        assert!(cli.command.is_none());
    }
}
