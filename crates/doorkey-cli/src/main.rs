use clap::Parser;
use doorkey_cli::config::Cli;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    doorkey_cli::init_tracing(cli.verbose);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let result = runtime.block_on(doorkey_cli::run(cli));
    // Stdin is read on a blocking thread that cannot be interrupted.
    runtime.shutdown_background();
    result
}
