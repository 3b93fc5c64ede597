//! Credentis server entry point.

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    credentis::server::run().await
}
