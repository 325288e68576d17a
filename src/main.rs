//! Binary entry point; all app logic lives in the library.

#[tokio::main]
async fn main() {
    if let Err(e) = portfolio_site::run().await {
        eprintln!("portfolio-site: {e}");
        std::process::exit(1);
    }
}
