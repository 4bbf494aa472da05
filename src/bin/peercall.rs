//! Desktop client: one window to call a peer by id or answer their call.

use peercall::{
    app::CallApp,
    log::Logger,
    logger_info, logger_warn,
    settings::{self, Settings},
};

fn main() -> eframe::Result<()> {
    let (config, load_err) = settings::load_config();
    let settings = Settings::from_config(&config).unwrap_or_else(|e| {
        eprintln!("Invalid configuration: {e}. Using defaults.");
        Settings::default()
    });

    let logger = Logger::start_client(4096, 256, 1, &config);
    if let Some(e) = load_err {
        logger_warn!(logger, "{}; using defaults", e);
    }
    logger_info!(
        logger,
        "peercall starting, relay {}, logging to {}",
        settings.server_addr,
        logger.file_path().display()
    );

    let native_options = eframe::NativeOptions::default();
    eframe::run_native(
        "PeerCall",
        native_options,
        Box::new(|cc| Ok(Box::new(CallApp::new(cc, settings, logger)))),
    )
}
