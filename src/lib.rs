pub mod config;
pub mod errors;
pub mod host;
pub mod page;
pub mod providers;
pub mod spotify;
pub mod sync;
pub mod youtube;

#[cfg(test)]
pub mod testing;

use config::SyncConfig;

/// Run the native-messaging host on stdin/stdout until the browser closes
/// the connection.
pub fn run() -> anyhow::Result<()> {
    let config = SyncConfig::load()?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    runtime.block_on(host::serve(
        config,
        tokio::io::stdin(),
        tokio::io::stdout(),
    ))?;
    Ok(())
}
