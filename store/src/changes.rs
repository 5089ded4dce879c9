//! The changes stack: which objects were first touched at each nesting level.
//!
//! While live, the stack holds exactly one frame per open nesting level.
//! Frame *i* lists the packages and variables whose current history state is
//! stamped with level *i*; an object appears in at most one frame at a time.
//! The stack is built lazily on the first transactional touch and dies when
//! the top-level transaction resolves.

/// Objects first touched at one nesting level. Variables are listed as
/// (package name, variable name) pairs and are always processed before
/// packages on a level transition.
#[derive(Debug, Default)]
pub(crate) struct ChangesFrame {
    pub packages: Vec<String>,
    pub variables: Vec<(String, String)>,
}

#[derive(Debug, Default)]
pub(crate) struct ChangesStack {
    frames: Vec<ChangesFrame>,
}

impl ChangesStack {
    /// True once any transactional object has been touched in the current
    /// top-level transaction.
    pub fn is_live(&self) -> bool {
        !self.frames.is_empty()
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Ensure a frame exists for every level from 1 to `level`.
    pub fn prepare(&mut self, level: usize) {
        while self.frames.len() < level {
            self.frames.push(ChangesFrame::default());
        }
    }

    /// Push one frame for a freshly opened nesting level.
    pub fn push_frame(&mut self) {
        self.frames.push(ChangesFrame::default());
    }

    /// Detach the frame of the level being closed.
    pub fn pop_frame(&mut self) -> Option<ChangesFrame> {
        self.frames.pop()
    }

    /// Frame of the innermost open level.
    pub fn top_mut(&mut self) -> &mut ChangesFrame {
        self.frames.last_mut().expect("changes stack is empty")
    }

    /// Remove every entry referring to the given package from the top frame.
    /// Called when a package is physically evicted while an outer level still
    /// lists it.
    pub fn forget_package(&mut self, package: &str) {
        if let Some(top) = self.frames.last_mut() {
            top.variables.retain(|(p, _)| p != package);
            top.packages.retain(|p| p != package);
        }
    }
}
