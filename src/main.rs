#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = khtn_grader::run().await {
        eprintln!("khtn-grader fatal: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}
