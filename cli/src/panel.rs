//! Panel host that saves report pages to disk.

use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use rext_core::{Panel, PanelHost};
use rext_types::ViewColumn;

pub struct ReportPanels {
    path: PathBuf,
    written: Rc<RefCell<Vec<PathBuf>>>,
}

impl ReportPanels {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            written: Rc::default(),
        }
    }

    /// Report files written so far.
    pub fn written(&self) -> Vec<PathBuf> {
        self.written.borrow().clone()
    }
}

pub struct ReportPanel {
    path: PathBuf,
    written: Rc<RefCell<Vec<PathBuf>>>,
}

impl Panel for ReportPanel {
    fn set_html(&mut self, html: String) {
        match write_report(&self.path, &html) {
            Ok(()) => {
                tracing::info!(path = %self.path.display(), "Report written");
                let mut written = self.written.borrow_mut();
                if !written.contains(&self.path) {
                    written.push(self.path.clone());
                }
            }
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Failed to write report");
            }
        }
    }
}

impl PanelHost for ReportPanels {
    type Panel = ReportPanel;

    fn create_panel(&mut self, title: &str, column: ViewColumn) -> ReportPanel {
        tracing::debug!(title, ?column, path = %self.path.display(), "Opening report panel");
        ReportPanel {
            path: self.path.clone(),
            written: Rc::clone(&self.written),
        }
    }
}

fn write_report(path: &Path, html: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, html)
}
