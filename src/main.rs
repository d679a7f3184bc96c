mod api;
mod app;
mod gallery;
mod resolver;

fn main() -> eframe::Result<()> {
    env_logger::init();

    let base_url = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("SOUK_API_BASE").ok())
        .unwrap_or_else(|| api::DEFAULT_API_BASE.to_string());

    let client = match api::ApiClient::new(&base_url) {
        Ok(client) => client,
        Err(err) => {
            eprintln!("Could not start Souk Admin: {err:#}");
            std::process::exit(1);
        }
    };
    log::info!("Souk Admin starting against {}", client.base_url());

    let native_options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 820.0])
            .with_resizable(true),
        ..Default::default()
    };

    eframe::run_native(
        "Souk Admin",
        native_options,
        Box::new(move |_cc| Ok(Box::new(app::SoukAdminApp::new(client)))),
    )
}
