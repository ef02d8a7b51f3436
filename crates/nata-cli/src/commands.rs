use anyhow::{bail, Context};
use colored::Colorize;

use nata_crypto::ContentHasher;
use nata_server::{NataServer, ServerConfig, StorageConfig, TransportSettings};

use crate::cli::*;

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Serve(args) => cmd_serve(args).await,
        Command::Config(args) => cmd_config(args),
        Command::Cid(args) => cmd_cid(args),
    }
}

/// Fold command-line flags over the loaded configuration.
fn apply_overrides(config: &mut ServerConfig, args: &ServeArgs) -> anyhow::Result<()> {
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }
    if let Some(topic) = &args.topic {
        config.gossip.topic = topic.clone();
    }
    if let Some(root) = &args.data_dir {
        config.storage = StorageConfig::File { root: root.clone() };
    }
    if let Some(listen) = &args.listen {
        let peers = match &config.gossip.transport {
            TransportSettings::Libp2p { peers, .. } => peers.clone(),
            TransportSettings::Memory => Vec::new(),
        };
        config.gossip.transport = TransportSettings::Libp2p {
            listen: listen.to_string(),
            peers,
        };
    }
    if !args.peers.is_empty() {
        match &mut config.gossip.transport {
            TransportSettings::Libp2p { peers, .. } => {
                peers.extend(args.peers.iter().map(ToString::to_string))
            }
            TransportSettings::Memory => bail!("--peer needs a libp2p transport; pass --listen"),
        }
    }
    if args.no_gossip {
        config.gossip.enabled = false;
    }
    Ok(())
}

async fn cmd_serve(args: ServeArgs) -> anyhow::Result<()> {
    let mut config = ServerConfig::load(args.config.as_deref())
        .context("loading configuration")?;
    apply_overrides(&mut config, &args)?;

    println!(
        "{} NataCoin server on {}",
        "✓".green().bold(),
        config.bind_addr.to_string().bold()
    );
    println!("  CORS origin: {}", config.cors_origin.cyan());
    if config.gossip.enabled {
        println!("  Topic: {}", config.gossip.topic.yellow());
    } else {
        println!("  Topic: {}", "disabled".dimmed());
    }

    NataServer::new(config)?.serve().await?;
    Ok(())
}

fn cmd_config(args: ConfigArgs) -> anyhow::Result<()> {
    let config = ServerConfig::load(args.config.as_deref())
        .context("loading configuration")?;
    print!("{}", config.to_toml()?);
    Ok(())
}

fn cmd_cid(args: CidArgs) -> anyhow::Result<()> {
    let bytes = std::fs::read(&args.file)
        .with_context(|| format!("reading {}", args.file.display()))?;
    let cid = ContentHasher::RECORD.hash(&bytes);
    println!("{}  {}", cid.to_hex().yellow(), args.file.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn serve_args(argv: &[&str]) -> ServeArgs {
        let mut full = vec!["nata", "serve"];
        full.extend_from_slice(argv);
        match Cli::try_parse_from(full).unwrap().command {
            Command::Serve(args) => args,
            _ => panic!("wrong command"),
        }
    }

    #[test]
    fn flags_override_config() {
        let mut config = ServerConfig::default();
        let args = serve_args(&[
            "--bind", "127.0.0.1:9000",
            "--topic", "porto-coop",
            "--data-dir", "/tmp/nata",
            "--listen", "/ip4/127.0.0.1/tcp/4001",
            "--peer", "/ip4/127.0.0.1/tcp/4002",
        ]);
        apply_overrides(&mut config, &args).unwrap();
        assert_eq!(config.bind_addr.port(), 9000);
        assert_eq!(config.gossip.topic, "porto-coop");
        assert_eq!(config.storage, StorageConfig::File { root: "/tmp/nata".into() });
        assert_eq!(
            config.gossip.transport,
            TransportSettings::Libp2p {
                listen: "/ip4/127.0.0.1/tcp/4001".into(),
                peers: vec!["/ip4/127.0.0.1/tcp/4002".into()],
            }
        );
    }

    #[test]
    fn peer_without_libp2p_is_rejected() {
        let mut config = ServerConfig::default();
        let args = serve_args(&["--peer", "/ip4/127.0.0.1/tcp/4002"]);
        assert!(apply_overrides(&mut config, &args).is_err());
    }

    #[test]
    fn no_gossip_disables_node() {
        let mut config = ServerConfig::default();
        apply_overrides(&mut config, &serve_args(&["--no-gossip"])).unwrap();
        assert!(!config.gossip.enabled);
    }

    #[test]
    fn cid_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("record.json");
        std::fs::write(&path, b"{\"type\":\"proposal\"}").unwrap();
        cmd_cid(CidArgs { file: path }).unwrap();
    }

    #[test]
    fn cid_of_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(cmd_cid(CidArgs { file: dir.path().join("absent") }).is_err());
    }
}
