#[tokio::main]
async fn main() -> anyhow::Result<()> {
    ragdoc_server::start().await
}
