#[tokio::main]
async fn main() -> anyhow::Result<()> {
    ant_node::run().await
}
