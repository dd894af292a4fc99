// Log output for the app and its worker threads (export, tracking probe).
// Our own crate follows --debug; the HTTP and camera stacks stay at warn
// so their chatter does not drown the frame loop.

use tracing_subscriber::EnvFilter;

const QUIET_DEPS: &[&str] = &["reqwest", "hyper", "hyper_util", "rustls", "nokhwa"];

/// Filter directives used when `RUST_LOG` does not apply.
pub fn directives(debug: bool) -> String {
    let own = if debug { "debug" } else { "info" };
    let mut out = format!("warn,beyond_the_brush={own}");
    for dep in QUIET_DEPS {
        out.push_str(&format!(",{dep}=warn"));
    }
    out
}

/// Install the global subscriber. `RUST_LOG` is only honoured with `--debug`.
pub fn init(debug: bool) {
    let fallback = || EnvFilter::new(directives(debug));
    let filter = if debug { EnvFilter::try_from_default_env().unwrap_or_else(|_| fallback()) } else { fallback() };

    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .try_init()
        .is_ok();
    if installed && debug {
        tracing::debug!(filter = %directives(true), "debug logging enabled");
    }
}
