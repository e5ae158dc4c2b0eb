use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let args = talk_ledger::args::parse();
    talk_ledger::cli::main(args).await
}
