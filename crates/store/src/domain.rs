// SPDX-License-Identifier: MIT

//! Session domains: `runs`, `reviews`, `specs`, each laid out identically
//! under `<root>/.voratiq/<domain>/`.

use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Domain {
    Runs,
    Reviews,
    Specs,
}

impl Domain {
    pub fn dir_name(self) -> &'static str {
        match self {
            Self::Runs => "runs",
            Self::Reviews => "reviews",
            Self::Specs => "specs",
        }
    }

    pub fn root(self, workspace_root: &Path) -> PathBuf {
        workspace_root.join(".voratiq").join(self.dir_name())
    }

    pub fn index_path(self, workspace_root: &Path) -> PathBuf {
        self.root(workspace_root).join("index.json")
    }

    pub fn lock_path(self, workspace_root: &Path) -> PathBuf {
        self.root(workspace_root).join("history.lock")
    }

    pub fn session_dir(self, workspace_root: &Path, id: &str) -> PathBuf {
        self.root(workspace_root).join("sessions").join(id)
    }

    pub fn record_path(self, workspace_root: &Path, id: &str) -> PathBuf {
        self.session_dir(workspace_root, id).join("record.json")
    }
}

voratiq_core::simple_display! {
    Domain {
        Runs => "runs",
        Reviews => "reviews",
        Specs => "specs",
    }
}
