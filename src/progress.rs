use std::sync::Mutex;

use indicatif::{ProgressBar, ProgressStyle};

pub trait ProgressSink: Send + Sync {
    fn begin(&self, message: &str, total: Option<u64>);
    fn advance(&self, bytes: u64);
    fn finish(&self);
}

pub struct Silent;

impl ProgressSink for Silent {
    fn begin(&self, _message: &str, _total: Option<u64>) {}
    fn advance(&self, _bytes: u64) {}
    fn finish(&self) {}
}

#[derive(Default)]
pub struct Bar {
    inner: Mutex<Option<ProgressBar>>,
}

impl ProgressSink for Bar {
    fn begin(&self, message: &str, total: Option<u64>) {
        let pb = match total {
            Some(total) => {
                let pb = ProgressBar::new(total);
                pb.set_style(
                    ProgressStyle::default_bar()
                        .template("  {msg} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})")
                        .expect("invalid progress bar template")
                        .progress_chars("=> "),
                );
                pb
            }
            None => ProgressBar::new_spinner(),
        };
        pb.set_message(message.to_string());
        *self.inner.lock().unwrap() = Some(pb);
    }

    fn advance(&self, bytes: u64) {
        if let Some(pb) = self.inner.lock().unwrap().as_ref() {
            pb.inc(bytes);
        }
    }

    fn finish(&self) {
        if let Some(pb) = self.inner.lock().unwrap().take() {
            pb.finish_and_clear();
        }
    }
}

pub fn sink_for(progress: bool) -> Box<dyn ProgressSink> {
    if progress {
        Box::new(Bar::default())
    } else {
        Box::new(Silent)
    }
}
