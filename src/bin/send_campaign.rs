use clap::Parser;
use dotenvy::dotenv;
use pushkind_campaign::campaign::run;
use pushkind_campaign::settings::Settings;

/// Sends a templated campaign to a CSV recipient list.
#[derive(Debug, Parser)]
#[command(about)]
struct Opt {
    /// Settings file; `CAMPAIGN__*` environment variables override it.
    #[arg(long, default_value = "campaign.yaml")]
    config: String,

    /// Label used in log lines.
    #[arg(long, default_value = "default")]
    name: String,
}

/// Entry point for the campaign sender.
#[tokio::main]
async fn main() {
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));
    dotenv().ok();
    let opts = Opt::parse();

    if rustls::crypto::aws_lc_rs::default_provider()
        .install_default()
        .is_err()
    {
        log::warn!("A TLS crypto provider is already installed");
    }

    let settings = match Settings::load(&opts.config) {
        Ok(settings) => settings,
        Err(e) => {
            log::error!("{e}");
            std::process::exit(1);
        }
    };

    match run(&settings, &opts.name).await {
        Ok(tally) => {
            log::info!("Batch email results: {tally}");
            match serde_json::to_string(&tally) {
                Ok(json) => println!("{json}"),
                Err(e) => log::error!("Cannot serialize results: {e}"),
            }
        }
        Err(e) => {
            log::error!("{e}");
            std::process::exit(1);
        }
    }
}
