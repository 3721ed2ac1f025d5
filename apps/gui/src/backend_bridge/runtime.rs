//! Runtime bridge between UI command queue and backend event intake.
//!
//! Commands are drained on a dedicated thread running its own tokio
//! runtime so the egui paint loop never blocks on network calls.

use std::thread;

use client_core::AnalysisClient;
use crossbeam_channel::{Receiver, Sender};

use crate::backend_bridge::commands::{BackendCommand, UiEvent};

pub fn launch(server_url: String, cmd_rx: Receiver<BackendCommand>, ui_tx: Sender<UiEvent>) {
    thread::spawn(move || {
        let runtime = match tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime,
            Err(err) => {
                let _ = ui_tx.try_send(UiEvent::Error(format!(
                    "backend worker startup failure: failed to build runtime: {err}"
                )));
                tracing::error!("failed to build backend runtime: {err}");
                return;
            }
        };

        runtime.block_on(async move {
            let client = AnalysisClient::new(server_url);

            while let Ok(cmd) = cmd_rx.recv() {
                match cmd {
                    BackendCommand::CheckService => match client.service_status().await {
                        Ok(status) => {
                            let _ = ui_tx.try_send(UiEvent::Info(status.message));
                        }
                        Err(err) => {
                            let _ = ui_tx.try_send(UiEvent::Error(format!(
                                "Server unreachable: {err}"
                            )));
                        }
                    },
                    BackendCommand::AnalyzeImage { path } => {
                        match client.analyze_path(&path).await {
                            Ok(record) => {
                                let _ = ui_tx.try_send(UiEvent::AnalysisComplete(record));
                                push_history(&client, &ui_tx).await;
                            }
                            Err(err) => {
                                let _ = ui_tx
                                    .try_send(UiEvent::Error(format!("Analysis failed: {err}")));
                            }
                        }
                    }
                    BackendCommand::RefreshHistory => {
                        push_history(&client, &ui_tx).await;
                    }
                    BackendCommand::ViewAnalysis { id } => match client.get(&id).await {
                        Ok(record) => {
                            let _ = ui_tx.try_send(UiEvent::AnalysisLoaded(record));
                        }
                        Err(err) => {
                            let _ = ui_tx
                                .try_send(UiEvent::Error(format!("Could not load analysis: {err}")));
                        }
                    },
                    BackendCommand::DeleteAnalysis { id } => match client.delete(&id).await {
                        Ok(ack) => {
                            let _ = ui_tx.try_send(UiEvent::AnalysisDeleted {
                                id,
                                message: ack.message,
                            });
                            push_history(&client, &ui_tx).await;
                        }
                        Err(err) => {
                            let _ =
                                ui_tx.try_send(UiEvent::Error(format!("Delete failed: {err}")));
                        }
                    },
                }
            }
        });
    });
}

async fn push_history(client: &AnalysisClient, ui_tx: &Sender<UiEvent>) {
    match client.history().await {
        Ok(records) => {
            let _ = ui_tx.try_send(UiEvent::HistoryLoaded(records));
        }
        Err(err) => {
            let _ = ui_tx.try_send(UiEvent::Error(format!("Could not load history: {err}")));
        }
    }
}
