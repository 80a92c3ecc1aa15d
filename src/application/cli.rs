use clap::builder::PossibleValuesParser;
use clap::Arg;
use clap::Command;

use crate::domain::models::prompts;

pub fn build() -> Command {
    return Command::new("quickchat")
        .about("Terminal chat client for remote text and image generation APIs, with chat history persisted to local disk.")
        .version(env!("CARGO_PKG_VERSION"))
        .arg(
            Arg::new("api-url")
                .long("api-url")
                .env("QUICKCHAT_API_URL")
                .num_args(1)
                .help("Base URL of the generation API.")
                .default_value("http://localhost:8000"),
        )
        .arg(
            Arg::new("model")
                .long("model")
                .env("QUICKCHAT_MODEL")
                .num_args(1)
                .value_parser(PossibleValuesParser::new(prompts::model_ids()))
                .help("Model used for generation. Overrides and replaces the saved setting."),
        )
        .arg(
            Arg::new("data-dir")
                .long("data-dir")
                .env("QUICKCHAT_DATA_DIR")
                .num_args(1)
                .help("Directory settings and chat history are persisted to."),
        );
}
