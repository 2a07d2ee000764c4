use clap::Parser;
use rowmodel::{Config, cli, config::Args, db::models, telemetry};

fn main() -> anyhow::Result<()> {
    // Parse CLI args
    let args = Args::parse();

    // Load configuration
    let config = Config::load(&args)?;

    telemetry::init_telemetry(&config.log_filter)?;
    tracing::debug!("{:?}", args);

    models::verify_schemas()?;

    let input = cli::open_input(&args.input)?;
    cli::run(&args, &config, input, std::io::stdout().lock())
}
