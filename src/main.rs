use std::{
    path::PathBuf,
    process::ExitCode,
    time::Duration,
};

use ankiflag::{
    core::config::{
        ANKI_CONNECT_VERSION,
        DEFAULT_ANKI_CONNECT_URL,
        DEFAULT_TIMEOUT,
    },
    persistence,
    run_with_config,
    AnkiflagError,
    ConnectionConfig,
    CriteriaOverrides,
    Preset,
    Summary,
};
use clap::Parser;
use log::info;

#[derive(Parser, Debug)]
#[command(name = "ankiflag", version)]
#[command(
    about = "Set a flag field on Anki notes whose cards have matured past an interval",
    long_about = None
)]
struct Cli {
    /// Built-in job to start from
    #[arg(short, long, value_enum)]
    preset: Option<Preset>,

    /// JSON profile overriding the preset (default: <config dir>/ankiflag/profile.json)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Deck whose notes are examined
    #[arg(long)]
    deck: Option<String>,

    /// Note model the notes must use
    #[arg(long)]
    model: Option<String>,

    /// Card template that must have matured
    #[arg(long)]
    template: Option<String>,

    /// Interval in days a card must exceed
    #[arg(long, allow_negative_numbers = true)]
    min_interval: Option<i64>,

    /// Field to write
    #[arg(long)]
    field: Option<String>,

    /// Value to write into the field
    #[arg(long)]
    value: Option<String>,

    /// Leave notes alone whose field already holds the value
    #[arg(long)]
    skip_unchanged: bool,

    /// Report what would change without writing anything
    #[arg(long)]
    dry_run: bool,

    /// AnkiConnect endpoint
    #[arg(long, env = "ANKI_CONNECT_URL", default_value = DEFAULT_ANKI_CONNECT_URL)]
    url: String,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = DEFAULT_TIMEOUT.as_secs())]
    timeout: u64,

    /// Increase log output (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn overrides(&self) -> CriteriaOverrides {
        CriteriaOverrides {
            preset: self.preset,
            deck: self.deck.clone(),
            model: self.model.clone(),
            template: self.template.clone(),
            min_interval: self.min_interval,
            field: self.field.clone(),
            value: self.value.clone(),
            skip_unchanged: self.skip_unchanged.then_some(true),
            dry_run: self.dry_run.then_some(true),
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

fn execute(cli: &Cli) -> Result<Summary, AnkiflagError> {
    let profile = persistence::load_profile_or_default(cli.config.as_deref())?;
    let criteria = profile.merge(cli.overrides()).resolve()?;
    let connection =
        ConnectionConfig::new(&cli.url, ANKI_CONNECT_VERSION, Duration::from_secs(cli.timeout))?;

    info!(
        "Setting '{}' on '{}' notes in deck '{}' with a '{}' card above {} days",
        criteria.field(),
        criteria.model(),
        criteria.deck(),
        criteria.template(),
        criteria.min_interval()
    );
    run_with_config(&connection, &criteria)
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match execute(&cli) {
        Ok(summary) => {
            print!("{summary}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::from(e.exit_code())
        }
    }
}
