use std::path::PathBuf;

use clap::{value_parser, ArgAction, Args, Parser, Subcommand};

pub const DATALIB_BEFORE_HELP: &str = concat!(
    "datalib ",
    env!("CARGO_PKG_VERSION"),
    " – deduplicating file library\n\n",
    "  put / get / delete   Store, read, and remove named files.\n",
    "  info / refs / list   Inspect names, hashes, and who shares content.\n",
    "  verify / doctor / gc Check and repair the store.\n",
);

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    disable_help_subcommand = true,
    before_help = DATALIB_BEFORE_HELP
)]
pub struct DatalibCli {
    #[arg(
        long,
        value_name = "DIR",
        help = "Library root (defaults to DATALIB_STORE_PATH or ~/.datalib/store)",
        global = true
    )]
    pub root: Option<PathBuf>,
    #[arg(short, long, help = "Suppress human output (errors still print)", global = true)]
    pub quiet: bool,
    #[arg(short, long, action = ArgAction::Count, help = "Increase logging (-vv reaches trace)", global = true)]
    pub verbose: u8,
    #[arg(long, help = "Force trace logging regardless of -v/-q", global = true)]
    pub trace: bool,
    #[arg(long, help = "Emit {status,message,details} JSON envelopes", global = true)]
    pub json: bool,
    #[command(subcommand)]
    pub command: CommandGroupCli,
}

#[derive(Subcommand, Debug)]
pub enum CommandGroupCli {
    #[command(
        about = "Store a file under NAME (first write wins).",
        override_usage = "datalib put <NAME> <PATH|->"
    )]
    Put(PutArgs),
    #[command(
        about = "Write the content stored under NAME to stdout or a file.",
        override_usage = "datalib get <NAME> [-o PATH]"
    )]
    Get(GetArgs),
    #[command(
        about = "Remove NAME; its content is erased once nothing else references it. Absent names are a no-op."
    )]
    Delete(NameArgs),
    #[command(about = "Show hash, size, and timestamps recorded for NAME.")]
    Info(NameArgs),
    #[command(about = "List the names that reference HASH, oldest first.")]
    Refs(RefsArgs),
    #[command(about = "List stored names in order.")]
    List(ListArgs),
    #[command(about = "Summarize names, blobs, and bytes stored.")]
    Stats,
    #[command(about = "Check the index and content store agree (read-only).")]
    Verify(VerifyArgs),
    #[command(about = "Repair the library: drop leftovers and names whose content is lost.")]
    Doctor,
    #[command(about = "Reclaim unreferenced blobs older than the grace window.")]
    Gc(GcArgs),
}

#[derive(Args, Debug)]
pub struct NameArgs {
    #[arg(value_name = "NAME")]
    pub name: String,
}

#[derive(Args, Debug)]
pub struct PutArgs {
    #[arg(value_name = "NAME")]
    pub name: String,
    #[arg(value_name = "PATH", help = "File to store, or '-' to read stdin")]
    pub source: PathBuf,
}

#[derive(Args, Debug)]
pub struct GetArgs {
    #[arg(value_name = "NAME")]
    pub name: String,
    #[arg(short, long, value_name = "PATH", help = "Write to PATH instead of stdout")]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct RefsArgs {
    #[arg(value_name = "HASH")]
    pub hash: String,
}

#[derive(Args, Debug)]
pub struct ListArgs {
    #[arg(long, value_name = "PREFIX", help = "Only names starting with PREFIX")]
    pub prefix: Option<String>,
}

#[derive(Args, Debug)]
pub struct VerifyArgs {
    #[arg(
        long,
        value_name = "N",
        value_parser = value_parser!(usize),
        help = "Only re-hash N randomly chosen blobs"
    )]
    pub sample: Option<usize>,
}

#[derive(Args, Debug)]
pub struct GcArgs {
    #[arg(
        long,
        value_name = "SECS",
        value_parser = value_parser!(u64),
        help = "Keep orphans modified within SECS (defaults to DATALIB_ORPHAN_GRACE_SECS)"
    )]
    pub grace_secs: Option<u64>,
}
