/// A compile error reported by one of the phases.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub message: String,
    /// Character offset into the source, when the phase reported one.
    pub index: Option<usize>,
}

#[derive(Debug, Default)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn push_error_at<S: Into<String>>(&mut self, message: S, index: Option<usize>) {
        self.entries.push(Diagnostic {
            message: message.into(),
            index,
        });
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }
}
