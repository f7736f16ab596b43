use once_cell::sync::Lazy;

pub static RUNTIME: Lazy<tokio::runtime::Runtime> = Lazy::new(|| {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("flexpbx-io")
        .build()
        .expect("Failed to build Tokio runtime")
});

pub fn spawn_async<F>(fut: F) -> tokio::task::JoinHandle<F::Output>
where
    F: std::future::Future + Send + 'static,
    F::Output: Send + 'static,
{
    RUNTIME.spawn(fut)
}

/// Runs `fut` on the I/O runtime and hands its result to `done` on the GTK
/// main loop.
pub fn run_async_to_main<T, Fut, D>(fut: Fut, done: D)
where
    T: Send + 'static,
    Fut: std::future::Future<Output = T> + Send + 'static,
    D: FnOnce(T) + 'static,
{
    let handle = spawn_async(fut);
    glib::spawn_future_local(async move {
        match handle.await {
            Ok(value) => done(value),
            Err(e) => log::error!("background task failed: {e}"),
        }
    });
}

pub fn normalize_url(input: &str) -> String {
    let trimmed = input.trim();
    if trimmed.is_empty() || trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    }
}
