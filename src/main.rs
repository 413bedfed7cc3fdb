#[tokio::main]
async fn main() {
    if let Err(e) = tapflow::run().await {
        eprintln!("tapflow: {e}");
        std::process::exit(1);
    }
}
