use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "bookbot")]
#[command(author, version, about = "Telegram bot that sells a PDF book through Stripe Checkout", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Run the bot and the payment HTTP server
    Run,

    /// Run with staging environment variables (.env.staging)
    RunStaging,

    /// Apply database migrations and exit
    Migrate,

    /// Validate configuration, print a summary and exit
    CheckConfig,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
