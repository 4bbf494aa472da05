use std::sync::Arc;
use std::{env, process};

use peercall::log::{LogSink, Logger, StderrLogSink};
use peercall::settings::{self, Settings};
use peercall::signaling::run::run_signaling_server_with_log;

fn main() -> std::io::Result<()> {
    // --- Parse CLI args ----------------------------------------------------
    //
    //   signaling_server                  -> [Signaling] listen_addr, else 0.0.0.0:5000
    //   signaling_server 0.0.0.0:6000     -> full address
    //   signaling_server 127.0.0.1 7000   -> IP and port

    let args: Vec<String> = env::args().collect();
    let (config, load_err) = settings::load_config();

    let addr = match args.as_slice() {
        [_] => Settings::from_config(&config)
            .map(|s| s.listen_addr)
            .unwrap_or_else(|_| settings::DEFAULT_LISTEN_ADDR.to_owned()),
        [_, addr] => addr.clone(),
        [_, ip, port] => format!("{ip}:{port}"),
        _ => {
            let me = args.first().map_or("signaling_server", String::as_str);
            eprintln!("Usage:");
            eprintln!("  {me}                # listen on [Signaling] listen_addr or 0.0.0.0:5000");
            eprintln!("  {me} [ADDR]         # e.g. 0.0.0.0:6000");
            eprintln!("  {me} [IP] [PORT]    # e.g. 127.0.0.1 6000");
            process::exit(1);
        }
    };

    // --- Start process logger ----------------------------------------------
    // PEERCALL_LOG_STDERR=1 logs to the terminal instead of the log file.
    let logger = Logger::start_server(1024, 128, 10, &config);
    let log_sink: Arc<dyn LogSink> = if env::var_os("PEERCALL_LOG_STDERR").is_some() {
        Arc::new(StderrLogSink::default())
    } else {
        Arc::new(logger.handle())
    };
    if let Some(e) = load_err {
        eprintln!("[signaling_server] {e}; using defaults");
    }

    eprintln!(
        "[signaling_server] starting on {addr}, logging to {}",
        logger.file_path().display()
    );

    // --- Run relay (blocks) --------------------------------------------------
    run_signaling_server_with_log(&addr, log_sink)
}
