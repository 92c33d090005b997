use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    correduria_server::run().await
}
