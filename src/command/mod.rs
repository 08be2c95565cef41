use clap::Subcommand;

pub mod split;

pub use split::SplitCMD;

///////////////////////////////
/// Possible subcommands to parse
#[derive(Subcommand)]
pub enum Commands {
    Split(SplitCMD),
}
