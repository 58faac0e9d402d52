use tracing_subscriber::EnvFilter;

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("doubleagent=info")),
        )
        .init();
}

#[cfg(feature = "dioxus")]
fn main() {
    doubleagent::config::load_dotenv();
    init_tracing();
    dioxus::launch(doubleagent::ui::App);
}

#[cfg(not(feature = "dioxus"))]
fn main() {
    doubleagent::config::load_dotenv();
    init_tracing();
    tracing::error!("built without a front end; enable the desktop, web or mobile feature");
    std::process::exit(1);
}
