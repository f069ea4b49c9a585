#[tokio::main]
async fn main() {
    if let Err(err) = wifi_whisperer_lib::run().await {
        log::error!("fatal: {err:#}");
        eprintln!("wifi-whisperer: {err:#}");
        std::process::exit(1);
    }
}
