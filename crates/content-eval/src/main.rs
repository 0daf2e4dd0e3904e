mod case;
mod cli;
mod engine;
mod fixture_io;
mod quality;

use cli::{CliError, CliOptions};
use engine::run_eval;

#[tokio::main]
async fn main() {
    if let Err(err) = dotenvy::dotenv()
        && !err.not_found()
    {
        eprintln!("failed to load .env: {err}");
        std::process::exit(2);
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "content_eval=info,quest_content=warn".to_string()),
        )
        .with_writer(std::io::stderr)
        .init();

    let options = match CliOptions::parse(std::env::args().skip(1)) {
        Ok(options) => options,
        Err(CliError::HelpRequested) => {
            print_usage();
            std::process::exit(0);
        }
        Err(err) => {
            eprintln!("error: {err}");
            eprintln!();
            print_usage();
            std::process::exit(2);
        }
    };

    match run_eval(&options).await {
        Ok(summary) => {
            summary.print();
            if summary.has_failures() {
                std::process::exit(1);
            }
        }
        Err(err) => {
            eprintln!("failed to run content eval harness: {err}");
            std::process::exit(2);
        }
    }
}

fn print_usage() {
    eprintln!(
        "Usage: cargo run -p content-eval -- [--mode mocked|live] [--case <substring>]\n\
         \n\
         Modes:\n\
         - mocked (default): replay recorded model outputs through the content engine\n\
         - live: Azure OpenAI smoke run over cases marked include_in_live_smoke\n\
         \n\
         Options:\n\
         - --case <substring>  Only run cases whose id contains the substring\n\
         - --help              Show this help text"
    );
}
