mod api;
mod command;
mod config;
mod controller;
mod error_log;
mod store;
mod sync;
mod tui;
mod view;

use anyhow::anyhow;
use clap::Parser;
use tokio::sync::{broadcast, mpsc};
use tokio::task;

use crate::api::ApiClient;
use crate::command::{Command, UiRequest};
use crate::controller::Controller;
use crate::error_log::ErrorLogStore;
use crate::tui::TuiApp;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let param = config::CliParams::parse();

    let (tx, mut rx) = broadcast::channel::<Command>(64);
    let (req_tx, req_rx) = mpsc::channel::<UiRequest>(32);

    let api = ApiClient::new(param.api_base())?;
    let error_log = ErrorLogStore::new(param.error_log.clone());
    let controller = Controller::new(api, tx.clone(), req_rx, param.refresh_interval(), error_log);
    let controller_error_tx = tx.clone();
    task::spawn(async move {
        if let Err(err) = controller.run().await {
            let _ = controller_error_tx.send(Command::Error(format!("controller error: {err}")));
        }
    });

    let mut app = TuiApp::new(&param.symbol, &param.ticker, req_tx);
    app.request_initial_data();
    let app_result = tokio::select! {
        result = app.run(&mut rx) => result,
        _ = tokio::signal::ctrl_c() => Ok(()),
    };
    app.dispose();
    app_result.map_err(|err| anyhow!(err.to_string()))?;
    Ok(())
}
