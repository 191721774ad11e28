// ABOUTME: Diagnostics accumulator for non-fatal warnings during a deployment.
// ABOUTME: Warnings never fail a request but are logged and shown to the client.

/// Collects non-fatal warnings during one request.
#[derive(Debug, Default)]
pub struct Diagnostics {
    warnings: Vec<Warning>,
}

impl Diagnostics {
    /// Record a warning, auto-logging it via tracing.
    pub fn warn(&mut self, warning: Warning) {
        tracing::warn!(kind = ?warning.kind, "{}", warning.message);
        self.warnings.push(warning);
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct Warning {
    pub kind: WarningKind,
    pub message: String,
}

impl Warning {
    /// A previous container survived the swap.
    pub fn swap_remove(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::SwapRemove,
            message: message.into(),
        }
    }

    /// A user label collided with a server-owned key.
    pub fn reserved_label(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::ReservedLabel,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningKind {
    /// Removing a superseded container failed; it may still be running.
    SwapRemove,
    /// A reserved label in the project config was ignored.
    ReservedLabel,
}
