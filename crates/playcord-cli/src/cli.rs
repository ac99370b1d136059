use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Show what VLC is playing as Discord Rich Presence.
#[derive(Debug, Parser)]
#[command(name = "playcord", author, version, about, long_about = None)]
pub struct Cli {
    /// Config file to use instead of the platform default
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Sync presence until interrupted (default)
    Run(PlayerArgs),
    /// Check that VLC's HTTP interface is reachable
    Check(PlayerArgs),
    /// Enable VLC's HTTP interface in its vlcrc
    SetupVlc(SetupArgs),
    /// Print how titles would be classified, as JSON
    Classify {
        #[arg(required = true)]
        titles: Vec<String>,
    },
}

/// Overrides for the player connection.
#[derive(Debug, Clone, Default, Args)]
pub struct PlayerArgs {
    /// HTTP interface port
    #[arg(short, long)]
    pub port: Option<u16>,
    /// HTTP interface password
    #[arg(long)]
    pub password: Option<String>,
}

#[derive(Debug, Clone, Args)]
pub struct SetupArgs {
    /// HTTP interface port (defaults to the configured one)
    #[arg(short, long)]
    pub port: Option<u16>,
    /// Password to set; one is generated when omitted
    #[arg(long)]
    pub password: Option<String>,
    /// Disable the HTTP interface instead of enabling it
    #[arg(long = "no-http", action = clap::ArgAction::SetTrue)]
    pub no_http: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("playcord").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_no_subcommand_defaults_to_run() {
        assert!(parse(&[]).command.is_none());
    }

    #[test]
    fn test_run_overrides() {
        let cli = parse(&["run", "--port", "8081", "--password", "pw", "--config", "/tmp/c.toml"]);
        let Some(Command::Run(args)) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.port, Some(8081));
        assert_eq!(args.password.as_deref(), Some("pw"));
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/c.toml")));
    }

    #[test]
    fn test_setup_vlc_flags() {
        let cli = parse(&["setup-vlc", "--no-http"]);
        let Some(Command::SetupVlc(args)) = cli.command else {
            panic!("expected setup-vlc");
        };
        assert!(args.no_http);
        assert_eq!(args.port, None);
    }

    #[test]
    fn test_classify_requires_a_title() {
        assert!(Cli::try_parse_from(["playcord", "classify"]).is_err());
        let cli = parse(&["classify", "Heat (1995).mkv", "Show.S01E02.mkv"]);
        assert!(matches!(cli.command, Some(Command::Classify { titles }) if titles.len() == 2));
    }
}
