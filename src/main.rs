#[cfg(not(feature = "std"))]
fn main() {}

#[cfg(feature = "std")]
use dogfight::{
    init_logging,
    transport::in_memory::InMemoryTransport,
    transport::tcp::{TcpAcceptor, TcpConnector},
    AutoPilot, MatchNode, MatchSummary, NodeConfig, PeerSession,
};

#[cfg(feature = "std")]
use clap::{Args, Parser, Subcommand};
#[cfg(feature = "std")]
use tokio::time::Duration;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[cfg(feature = "std")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone, Debug)]
#[cfg(feature = "std")]
struct MatchArgs {
    #[arg(long, help = "Fix RNG seed for reproducible matches (e.g., --seed 12345)")]
    seed: Option<u64>,
    #[arg(long, help = "Match length in seconds, proposed by player one")]
    length: Option<u32>,
    #[arg(long, help = "Heartbeat interval in milliseconds")]
    heartbeat_ms: Option<u64>,
}

#[derive(Subcommand)]
#[cfg(feature = "std")]
enum Commands {
    /// Run two autopiloted devices in one process over an in-memory link.
    Local {
        #[command(flatten)]
        args: MatchArgs,
        #[arg(long, default_value_t = 0, help = "Drop every n-th datagram (0 = lossless)")]
        drop_every: u64,
    },
    /// Host a match and wait for the other device to connect.
    Host {
        #[arg(long, default_value = "0.0.0.0:8080")]
        bind: String,
        #[command(flatten)]
        args: MatchArgs,
    },
    /// Join a match hosted by the other device.
    Join {
        #[arg(long, default_value = "127.0.0.1:8080")]
        connect: String,
        #[command(flatten)]
        args: MatchArgs,
    },
}

#[cfg(feature = "std")]
fn node_config(args: &MatchArgs, salt: u64) -> NodeConfig {
    let mut config = NodeConfig::default();
    let seed = args.seed.unwrap_or_else(rand::random);
    config.seed = seed.wrapping_add(salt);
    config.game_length = args.length;
    if let Some(ms) = args.heartbeat_ms {
        config.sync.heartbeat_interval = Duration::from_millis(ms.max(1));
    }
    config
}

#[cfg(feature = "std")]
fn print_summary(label: &str, summary: &MatchSummary) {
    println!(
        "{}: played as {:?}, match ended by {:?} after {} ticks, scores {} - {} (ours: {})",
        label,
        summary.player_id,
        summary.reason,
        summary.ticks,
        summary.scores[0],
        summary.scores[1],
        summary.local_score()
    );
}

#[cfg(feature = "std")]
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();
    let cli = Cli::parse();

    match cli.command {
        Commands::Local { args, drop_every } => {
            println!("Starting local match between two autopilots...");
            if let Some(s) = args.seed {
                println!("Using fixed seed: {} (match will be reproducible)", s);
            }
            let (t1, t2) = InMemoryTransport::lossy_pair(drop_every);
            let mut node1 = MatchNode::new(
                node_config(&args, 0),
                PeerSession::from_transport(Box::new(t1)),
                Box::new(AutoPilot::new()),
            );
            let mut node2 = MatchNode::new(
                node_config(&args, 1),
                PeerSession::from_transport(Box::new(t2)),
                Box::new(AutoPilot::new()),
            );
            let (s1, s2) = tokio::try_join!(node1.run(), node2.run())?;
            print_summary("device A", &s1);
            print_summary("device B", &s2);
        }
        Commands::Host { bind, args } => {
            println!("Hosting match at {}...", bind);
            let acceptor = TcpAcceptor::bind(&bind).await?;
            println!("Waiting for the other device to connect...");
            let mut session = PeerSession::with_connector(Box::new(acceptor), bind);
            session.set_connect_timeout(Duration::from_secs(300));
            let mut node = MatchNode::new(node_config(&args, 0), session, Box::new(AutoPilot::new()));
            let summary = node.run().await?;
            print_summary("host", &summary);
        }
        Commands::Join { connect, args } => {
            println!("Connecting to {}...", connect);
            let session = PeerSession::with_connector(Box::new(TcpConnector), connect);
            let mut node = MatchNode::new(node_config(&args, 1), session, Box::new(AutoPilot::new()));
            let summary = node.run().await?;
            print_summary("guest", &summary);
        }
    }
    Ok(())
}
