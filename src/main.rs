#[tokio::main]
async fn main() {
    let code = lm_access::cli::run().await;
    std::process::exit(code);
}
