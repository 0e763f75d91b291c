#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = testly_client::run().await {
        eprintln!("testly-client fatal: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}
