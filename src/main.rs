//! Environmental infraction notice service

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    auto_infracao::server::run().await
}
