#[tokio::main]
async fn main() -> anyhow::Result<()> {
    pomodoro_server::run().await
}
