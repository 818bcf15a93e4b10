//! The `.agents/` tree — every path the core reads or writes.
//!
//! Collecting the layout in one place keeps the ownership rules auditable:
//! the pool owns `pool/`, promotion writes the knowledge dirs, the hook
//! layer appends to `ao/`, and nothing else touches those paths.

use std::io;
use std::path::{Path, PathBuf};

/// Directory name of the agents tree relative to a repository root.
pub const AGENTS_DIR: &str = ".agents";

/// Knowledge tree directories that receive promoted artifacts or
/// collaborator output.
pub const KNOWLEDGE_DIRS: &[&str] = &[
    "learnings",
    "patterns",
    "research",
    "plans",
    "retros",
    "council",
];

/// Path map for a single `.agents/` tree.
#[derive(Debug, Clone)]
pub struct AgentsLayout {
    root: PathBuf,
}

impl AgentsLayout {
    /// Build the layout for a repository root (the directory containing
    /// `.agents/`). No filesystem access happens here.
    pub fn new(base: impl AsRef<Path>) -> Self {
        Self {
            root: base.as_ref().join(AGENTS_DIR),
        }
    }

    /// The `.agents/` directory itself.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Candidate pool root (`pool/`).
    pub fn pool_dir(&self) -> PathBuf {
        self.root.join("pool")
    }

    /// A knowledge tree directory (`learnings/`, `patterns/`, ...).
    pub fn knowledge_dir(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// Operational state directory (`ao/`).
    pub fn ao_dir(&self) -> PathBuf {
        self.root.join("ao")
    }

    /// RPI ratchet chain (`ao/chain.jsonl`).
    pub fn ratchet_chain(&self) -> PathBuf {
        self.ao_dir().join("chain.jsonl")
    }

    /// Citations log (`ao/citations.jsonl`).
    pub fn citations_log(&self) -> PathBuf {
        self.ao_dir().join("citations.jsonl")
    }

    /// Environment snapshot (`ao/environment.json`).
    pub fn environment_file(&self) -> PathBuf {
        self.ao_dir().join("environment.json")
    }

    /// Non-blocking hook failure log (`ao/hook-errors.log`).
    pub fn hook_errors_log(&self) -> PathBuf {
        self.ao_dir().join("hook-errors.log")
    }

    /// Handoff packet directories.
    pub fn handoff_pending(&self) -> PathBuf {
        self.root.join("handoff").join("pending")
    }

    pub fn handoff_consumed(&self) -> PathBuf {
        self.root.join("handoff").join("consumed")
    }

    pub fn handoff_quarantined(&self) -> PathBuf {
        self.root.join("handoff").join("quarantined")
    }

    /// File-based kill switch for the RPI loop (`rpi/KILL`).
    pub fn kill_switch(&self) -> PathBuf {
        self.root.join("rpi").join("KILL")
    }

    /// Whether the kill switch file is present.
    pub fn kill_switch_engaged(&self) -> bool {
        self.kill_switch().exists()
    }

    /// Create the operational directories the core appends to. The pool
    /// creates its own directories in `CandidatePool::init`.
    pub fn ensure_ao(&self) -> io::Result<()> {
        std::fs::create_dir_all(self.ao_dir())?;
        std::fs::create_dir_all(self.handoff_pending())?;
        std::fs::create_dir_all(self.handoff_consumed())?;
        std::fs::create_dir_all(self.handoff_quarantined())?;
        std::fs::create_dir_all(self.root.join("rpi"))?;
        Ok(())
    }

    /// Create the knowledge tree directories.
    pub fn ensure_knowledge(&self) -> io::Result<()> {
        for dir in KNOWLEDGE_DIRS {
            std::fs::create_dir_all(self.knowledge_dir(dir))?;
        }
        Ok(())
    }

    /// Count regular files under the whole tree.
    pub fn file_count(&self) -> io::Result<usize> {
        fn walk(dir: &Path, count: &mut usize) -> io::Result<()> {
            for dirent in std::fs::read_dir(dir)? {
                let path = dirent?.path();
                if path.is_dir() {
                    walk(&path, count)?;
                } else {
                    *count += 1;
                }
            }
            Ok(())
        }
        let mut count = 0;
        if self.root.is_dir() {
            walk(&self.root, &mut count)?;
        }
        Ok(count)
    }

    /// Whether auto-prune should run: the knob is on and the tree has
    /// outgrown [`crate::config::PRUNE_FILE_THRESHOLD`].
    pub fn needs_auto_prune(&self, config: &crate::config::OpsConfig) -> io::Result<bool> {
        if !config.prune_auto {
            return Ok(false);
        }
        Ok(self.file_count()? > crate::config::PRUNE_FILE_THRESHOLD)
    }
}
