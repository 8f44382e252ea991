/// Per-tab session lifecycle as seen by the coordinator.
///
/// State transitions:
/// ```text
/// idle → starting → active → stopping → idle
///           ↓                   ↑
///         idle (start failed)   (host unreachable counts as stopped)
/// ```
///
/// A start requested while `Starting` or `Active` is a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionPhase {
    #[default]
    Idle,
    Starting,
    Active,
    Stopping,
}

impl SessionPhase {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }

    /// Whether a start request should collapse into a no-op.
    pub fn is_live(&self) -> bool {
        matches!(self, Self::Starting | Self::Active)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Starting => "starting",
            Self::Active => "active",
            Self::Stopping => "stopping",
        }
    }
}

impl std::fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn live_phases_absorb_start() {
        assert!(SessionPhase::Starting.is_live());
        assert!(SessionPhase::Active.is_live());
        assert!(!SessionPhase::Idle.is_live());
        assert!(!SessionPhase::Stopping.is_live());
    }

    #[test]
    fn default_is_idle() {
        assert!(SessionPhase::default().is_idle());
    }
}
