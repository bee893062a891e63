use anyhow::Result;
use wfcheck::cli::{App, Args, Config};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse_args();
    let config = Config::load(args.config.clone())?;

    App::new(config).run(args).await
}
