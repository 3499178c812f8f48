//! Progress reporting with indicatif

use std::time::Duration;

use extloader_core::flash::WriteProgress;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

fn bar_style(unit: &str, phase: &str) -> Result<ProgressStyle, Box<dyn std::error::Error>> {
    Ok(ProgressStyle::default_bar()
        .template(&format!(
            "{{spinner:.green}} [{{elapsed_precise}}] [{{bar:40.cyan/blue}}] {} ({{eta}}) {}",
            unit, phase
        ))?
        .progress_chars("#>-"))
}

/// Progress reporter using indicatif progress bars
pub struct IndicatifProgress {
    multi: MultiProgress,
    current_bar: Option<ProgressBar>,
}

impl IndicatifProgress {
    pub fn new() -> Self {
        Self {
            multi: MultiProgress::new(),
            current_bar: None,
        }
    }

    fn create_bar(&mut self, total: u64, unit: &str, phase: &str) {
        let pb = ProgressBar::new(total);
        pb.set_style(bar_style(unit, phase).unwrap_or_else(|_| ProgressStyle::default_bar()));
        self.current_bar = Some(self.multi.add(pb));
    }

    /// Show a spinner for an operation without intermediate progress
    pub fn spinner(&mut self, message: String) {
        self.finish("");
        let pb = self.multi.add(ProgressBar::new_spinner());
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
            pb.set_style(style);
        }
        pb.set_message(message);
        pb.enable_steady_tick(Duration::from_millis(100));
        self.current_bar = Some(pb);
    }

    /// Finish the current bar with a message
    pub fn finish(&mut self, message: &str) {
        if let Some(pb) = self.current_bar.take() {
            pb.finish_with_message(message.to_string());
        }
    }
}

impl Default for IndicatifProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl WriteProgress for IndicatifProgress {
    fn erasing(&mut self, sectors_to_erase: usize) {
        self.create_bar(sectors_to_erase as u64, "{pos}/{len} sectors", "Erasing");
    }

    fn erase_progress(&mut self, sectors_erased: usize) {
        if let Some(pb) = &self.current_bar {
            pb.set_position(sectors_erased as u64);
        }
    }

    fn writing(&mut self, bytes_to_write: usize) {
        self.finish("Erase complete");
        self.create_bar(bytes_to_write as u64, "{bytes}/{total_bytes}", "Writing");
    }

    fn write_progress(&mut self, bytes_written: usize) {
        if let Some(pb) = &self.current_bar {
            pb.set_position(bytes_written as u64);
        }
    }
}
