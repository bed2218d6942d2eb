use std::sync::Arc;
use std::time::Duration;

use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

use crate::event_bus::{Event, EventBus};

/// Terminal status display: a spinner while a remote call is in flight and a
/// colored line when it settles.
pub struct StatusUI {
    headless: bool,
    spinners: bool,
    listener: Option<JoinHandle<()>>,
}

impl StatusUI {
    pub fn new(headless: bool, spinners: bool) -> Self {
        Self {
            headless,
            spinners,
            listener: None,
        }
    }

    pub fn start(&mut self, bus: &Arc<EventBus>) {
        if self.headless {
            return;
        }

        let mut receiver = bus.subscribe();
        let spinners = self.spinners;
        self.listener = Some(tokio::spawn(async move {
            let mut spinner: Option<ProgressBar> = None;
            loop {
                match receiver.recv().await {
                    Ok(event) => Self::handle_event(event, &mut spinner, spinners),
                    Err(RecvError::Lagged(_)) => continue,
                    Err(RecvError::Closed) => break,
                }
            }
            if let Some(pb) = spinner.take() {
                pb.finish_and_clear();
            }
        }));
    }

    /// Wait for the listener to drain. The bus must be dropped first.
    pub async fn finish(&mut self) {
        if let Some(handle) = self.listener.take() {
            let _ = handle.await;
        }
    }

    pub fn display_error(&self, error: &str) {
        eprintln!("{} {}", "✗ Error:".red().bold(), error);
    }

    fn handle_event(event: Event, spinner: &mut Option<ProgressBar>, spinners: bool) {
        match event {
            Event::GenerationStarted { provider, model } => {
                let message = format!("Generating form with {} ({})...", provider, model);
                *spinner = Self::spin(spinners, message);
            }
            Event::GenerationCompleted { title, questions } => {
                let message = format!(
                    "{} Generated \"{}\" with {} questions",
                    "✓".green(),
                    title,
                    questions
                );
                Self::settle(spinner, message);
            }
            Event::GenerationFailed { .. }
            | Event::PublishFailed { .. }
            | Event::AuthFailed { .. } => {
                // the error itself is printed by the caller
                if let Some(pb) = spinner.take() {
                    pb.finish_and_clear();
                }
            }
            Event::SignedIn => {
                eprintln!("{} Signed in to Google", "✓".green());
            }
            Event::PublishStarted { title } => {
                *spinner = Self::spin(spinners, format!("Creating Google Form \"{}\"...", title));
            }
            Event::PublishCompleted { requests, .. } => {
                Self::settle(
                    spinner,
                    format!("{} Form published ({} requests applied)", "✓".green(), requests),
                );
            }
            Event::PublishIncomplete { responder_uri, .. } => {
                Self::settle(
                    spinner,
                    format!(
                        "{} Form was created but not populated; a blank form remains at {}",
                        "!".yellow().bold(),
                        responder_uri.bright_yellow()
                    ),
                );
            }
        }
    }

    fn spin(enabled: bool, message: String) -> Option<ProgressBar> {
        if !enabled {
            eprintln!("{}", message);
            return None;
        }
        let pb = ProgressBar::new_spinner();
        let template = "{spinner:.green} {msg} [{elapsed}]";
        if let Ok(style) = ProgressStyle::default_spinner().template(template) {
            pb.set_style(style);
        }
        pb.set_message(message);
        pb.enable_steady_tick(Duration::from_millis(100));
        Some(pb)
    }

    fn settle(spinner: &mut Option<ProgressBar>, message: String) {
        if let Some(pb) = spinner.take() {
            pb.finish_and_clear();
        }
        eprintln!("{}", message);
    }
}
