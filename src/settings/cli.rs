use super::Parser;

#[derive(Parser, Debug)]
#[command(name = "quickfriends", about = "Player friend and block relationship service")]
pub struct Cli {
    /// TOML settings file; defaults to settings/dev.toml (debug) or settings/release.toml
    #[arg(long)]
    pub settings: Option<String>,
}
