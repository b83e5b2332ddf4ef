use std::future::Future;

use once_cell::sync::Lazy;

static RUNTIME: Lazy<tokio::runtime::Runtime> = Lazy::new(|| {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("Failed to build Tokio runtime")
});

/// Drive `fut` on the shared Tokio runtime; its output arrives on the GLib
/// main loop through the returned receiver.
#[allow(deprecated)]
pub fn run_async_to_main<T, Fut>(fut: Fut) -> glib::Receiver<T>
where
    T: Send + 'static,
    Fut: Future<Output = T> + Send + 'static,
{
    let (tx, rx) = glib::MainContext::channel(glib::Priority::default());
    RUNTIME.spawn(async move {
        if tx.send(fut.await).is_err() {
            log::debug!("Main loop dropped the receiver before the request finished");
        }
    });
    rx
}
