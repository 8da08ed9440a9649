//! meetbar entry point.

use std::process::ExitCode;

use meetbar_core::{TracingConfig, init_tracing};
use meetbar_tray::{App, AppResult};
use tokio::runtime::Runtime;
use tokio::sync::mpsc;
use tracing::error;

fn main() -> ExitCode {
    if let Err(e) = TracingConfig::from_env().and_then(init_tracing) {
        eprintln!("error: {}", e);
        return ExitCode::FAILURE;
    }

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            error!(error = %e, "failed to start the async runtime");
            return ExitCode::FAILURE;
        }
    };

    run(runtime)
}

fn status(result: AppResult<()>) -> u8 {
    match result {
        Ok(()) => 0,
        Err(e) => {
            error!(error = %e, "meetbar stopped");
            1
        }
    }
}

#[cfg(not(target_os = "macos"))]
fn run(runtime: Runtime) -> ExitCode {
    use meetbar_tray::Presenter;

    let result = runtime.block_on(async {
        let app = App::setup()?;
        let (tx, rx) = mpsc::unbounded_channel();
        let presenter = Presenter::start(app.initial_state(), tx).await;
        app.serve(presenter, rx).await
    });
    ExitCode::from(status(result))
}

/// The menu bar needs the main thread; tokio runs on its worker threads.
#[cfg(target_os = "macos")]
fn run(runtime: Runtime) -> ExitCode {
    use meetbar_tray::Presenter;
    use meetbar_tray::menubar::{self, MenuBarEvent};

    let app = match App::setup() {
        Ok(app) => app,
        Err(e) => return ExitCode::from(status(Err(e))),
    };

    let event_loop = menubar::event_loop();
    let proxy = event_loop.create_proxy();
    let (tx, rx) = mpsc::unbounded_channel();
    let initial = app.initial_state();

    let presenter = Presenter::menu_bar(proxy.clone());
    runtime.spawn(async move {
        let code = status(app.serve(presenter, rx).await);
        let _ = proxy.send_event(MenuBarEvent::Exit(i32::from(code)));
    });

    menubar::run(event_loop, initial, tx)
}
