// src/main.rs

use buck_rpc::{cli, exec, logging, run};

#[tokio::main]
async fn main() {
    // Before anything can touch the environment.
    exec::env::capture_original_env();

    if let Err(err) = run_main().await {
        eprintln!("buck-rpc error: {err:?}");
        std::process::exit(1);
    }
}

async fn run_main() -> anyhow::Result<()> {
    let args = cli::parse();
    logging::init_logging(args.log_level)?;
    run(args).await
}
