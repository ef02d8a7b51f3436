use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use nata_gossip::Multiaddr;

#[derive(Parser)]
#[command(
    name = "nata",
    about = "NataCoin cooperative record engine",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the HTTP server and dissemination node
    Serve(ServeArgs),
    /// Print the effective configuration as TOML
    Config(ConfigArgs),
    /// Print the content identifier a file would be stored under
    Cid(CidArgs),
}

#[derive(Args)]
pub struct ServeArgs {
    /// TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// HTTP bind address
    #[arg(long)]
    pub bind: Option<SocketAddr>,
    /// Dissemination topic
    #[arg(long)]
    pub topic: Option<String>,
    /// Join the topic over libp2p, listening on this multiaddr
    #[arg(long)]
    pub listen: Option<Multiaddr>,
    /// Bootstrap peer multiaddr to dial (repeatable; needs a libp2p transport)
    #[arg(long = "peer")]
    pub peers: Vec<Multiaddr>,
    /// Store records as files under this directory
    #[arg(long)]
    pub data_dir: Option<PathBuf>,
    /// Serve HTTP only, without joining the topic
    #[arg(long)]
    pub no_gossip: bool,
}

#[derive(Args)]
pub struct ConfigArgs {
    /// TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

#[derive(Args)]
pub struct CidArgs {
    pub file: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_serve_defaults() {
        let cli = Cli::try_parse_from(["nata", "serve"]).unwrap();
        if let Command::Serve(args) = cli.command {
            assert!(args.config.is_none());
            assert!(args.peers.is_empty());
            assert!(!args.no_gossip);
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_serve_flags() {
        let cli = Cli::try_parse_from([
            "nata", "serve",
            "--bind", "127.0.0.1:8080",
            "--topic", "lisbon-coop",
            "--listen", "/ip4/0.0.0.0/tcp/4001",
            "--peer", "/ip4/10.0.0.2/tcp/4001",
            "--peer", "/dns4/node3.coop.example/tcp/4001",
            "--data-dir", "/var/lib/nata",
        ])
        .unwrap();
        if let Command::Serve(args) = cli.command {
            assert_eq!(args.bind, Some("127.0.0.1:8080".parse().unwrap()));
            assert_eq!(args.topic.as_deref(), Some("lisbon-coop"));
            assert_eq!(args.listen, Some("/ip4/0.0.0.0/tcp/4001".parse().unwrap()));
            assert_eq!(args.peers.len(), 2);
            assert_eq!(args.data_dir, Some(PathBuf::from("/var/lib/nata")));
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_rejects_bad_peer() {
        assert!(Cli::try_parse_from(["nata", "serve", "--peer", "nowhere"]).is_err());
        assert!(Cli::try_parse_from(["nata", "serve", "--listen", "0.0.0.0:4001"]).is_err());
    }

    #[test]
    fn parse_cid() {
        let cli = Cli::try_parse_from(["nata", "cid", "record.json"]).unwrap();
        if let Command::Cid(args) = cli.command {
            assert_eq!(args.file, PathBuf::from("record.json"));
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_verbose() {
        let cli = Cli::try_parse_from(["nata", "--verbose", "config"]).unwrap();
        assert!(cli.verbose);
        assert!(matches!(cli.command, Command::Config(_)));
    }
}
