//! Runs adapter code on the blocking pool
//!
//! Adapter calls may block on ledger I/O and may panic. Both stay inside the
//! blocking task; a panic comes back as its message.

/// Run `f` on the blocking pool, returning the panic message if it panicked
pub async fn run_blocking<T, F>(f: F) -> Result<T, String>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await.map_err(|e| {
        if e.is_cancelled() {
            return "blocking task cancelled".to_string();
        }
        let payload = e.into_panic();
        if let Some(msg) = payload.downcast_ref::<&str>() {
            msg.to_string()
        } else if let Some(msg) = payload.downcast_ref::<String>() {
            msg.clone()
        } else {
            "adapter panicked".to_string()
        }
    })
}
