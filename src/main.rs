fn main() {
    // stdout carries the native-messaging stream, so logs go to stderr.
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    if let Err(e) = tubesync_lib::run() {
        log::error!("{:#}", e);
        std::process::exit(1);
    }
}
