//! Lockboard operator tool.
//!
//! Inspects a Redb board store and performs operator lifecycle actions. Shows
//! only metadata: content stays sealed.
//!
//! # Usage
//!
//! ```bash
//! # List every channel, or the channels of one conversation
//! lockboard-admin --db board.redb channels
//! lockboard-admin --db board.redb channels --acl acl://conversations/42
//!
//! # Show the content log of a channel
//! lockboard-admin --db board.redb contents --channel <id> --limit 50
//!
//! # Lock a channel, then delete it
//! lockboard-admin --db board.redb lock --channel <id>
//! lockboard-admin --db board.redb delete --channel <id> --force
//! ```

use std::io::Write;

use clap::{Parser, Subcommand};
use lockboard_proto::{ServiceError, UserId};
use lockboard_server::{BoardService, OpenAccess, RedbStorage, SeqRange, Storage, SystemEnv};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Identity recorded for operator actions.
const OPERATOR: &str = "lockboard-admin";

/// Lockboard board store operator tool
#[derive(Parser, Debug)]
#[command(name = "lockboard-admin")]
#[command(about = "Inspect and administer a Lockboard board store")]
#[command(version)]
struct Args {
    /// Path to the Redb database
    #[arg(long, default_value = "lockboard.redb")]
    db: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List channels in creation order
    Channels {
        /// Only channels linked to this conversation ACL
        #[arg(long)]
        acl: Option<String>,

        /// Maximum number of channels to show
        #[arg(long, default_value = "100")]
        limit: usize,
    },

    /// Show a channel's content log (metadata only)
    Contents {
        /// Channel id
        #[arg(long)]
        channel: String,

        /// Maximum number of records to show
        #[arg(long, default_value = "100")]
        limit: usize,
    },

    /// Lock a channel for deletion
    Lock {
        /// Channel id
        #[arg(long)]
        channel: String,
    },

    /// Delete a channel and its contents
    Delete {
        /// Channel id
        #[arg(long)]
        channel: String,

        /// Delete even if the channel is active
        #[arg(long)]
        force: bool,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer().with_writer(std::io::stderr)).with(filter).init();

    tracing::debug!(db = %args.db, "opening board store");
    let storage = RedbStorage::open(&args.db)?;
    let service = BoardService::new(SystemEnv::new(), storage.clone(), OpenAccess);
    let operator = UserId::new(OPERATOR);

    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    match args.command {
        Command::Channels { acl, limit } => {
            let range = SeqRange { from: 0, until: u64::MAX, limit };
            let filter = |channel: &lockboard_proto::Channel| {
                acl.as_deref().is_none_or(|acl| channel.acl_url_link == acl)
            };

            for channel in storage.scan_channels(range, &filter)? {
                writeln!(
                    out,
                    "{:>6}  {}  {:<12} {}  {:?}",
                    channel.created_at,
                    channel.channel_id,
                    channel.kind,
                    channel.acl_url_link,
                    channel.state,
                )?;
            }
        },

        Command::Contents { channel, limit } => {
            let range = SeqRange { from: 0, until: u64::MAX, limit };

            for content in storage.load_contents(&channel, range)? {
                writeln!(
                    out,
                    "{:>6}  {}  {}  {} bytes",
                    content.created_at,
                    content.content_id,
                    content.content.encryption_key_url,
                    content.content.ciphertext.len(),
                )?;
            }
        },

        Command::Lock { channel } => {
            let locked = service.lock_for_deletion(&operator, &channel)?;
            tracing::info!(channel_id = %locked.channel_id, "channel locked by operator");
            writeln!(out, "locked {}", locked.channel_id)?;
        },

        Command::Delete { channel, force } => {
            let link = storage
                .load_channel(&channel)?
                .ok_or_else(|| ServiceError::not_found(channel.clone()))?
                .acl_url_link;

            service.delete_channel(&operator, &link, &channel, !force)?;
            tracing::info!(channel_id = %channel, "channel deleted by operator");
            writeln!(out, "deleted {channel}")?;
        },
    }

    Ok(())
}
