use env_logger::Env;
use preview_composer_cli::run;

fn main() -> anyhow::Result<()> {
    // a .env file is optional
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    run()
}
