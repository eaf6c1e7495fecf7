use cardscan_core::{ExtractionResult, StillImage};
use serde::Serialize;

/// Where the scan flow currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ScanPhase {
    #[default]
    Idle,
    CameraOpen,
    /// A still exists; its extraction result (or error) is on display.
    Reviewing,
}

impl std::fmt::Display for ScanPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScanPhase::Idle => write!(f, "idle"),
            ScanPhase::CameraOpen => write!(f, "cameraOpen"),
            ScanPhase::Reviewing => write!(f, "reviewing"),
        }
    }
}

/// Transient state of one scan. Errors are kept apart so dismissing one
/// never clears another.
#[derive(Debug, Clone, Default)]
pub struct ScanState {
    pub phase: ScanPhase,
    pub image: Option<StillImage>,
    pub result: Option<ExtractionResult>,
    pub camera_opening: bool,
    pub camera_ready: bool,
    pub extracting: bool,
    pub saving: bool,
    pub camera_error: Option<String>,
    pub extraction_error: Option<String>,
    pub submission_error: Option<String>,
    /// Model that produced the current result; cleared when extraction starts.
    pub model_used: Option<String>,
}

impl ScanState {
    pub fn is_busy(&self) -> bool {
        self.camera_opening || self.extracting || self.saving
    }

    pub fn can_capture(&self) -> bool {
        self.phase == ScanPhase::CameraOpen && !self.is_busy()
    }

    pub fn can_save(&self) -> bool {
        self.phase == ScanPhase::Reviewing && self.result.is_some() && !self.is_busy()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cardscan_core::CardFields;

    #[test]
    fn save_needs_a_result() {
        let mut state = ScanState {
            phase: ScanPhase::Reviewing,
            ..Default::default()
        };
        assert!(!state.can_save());

        state.result = Some(ExtractionResult {
            fields: CardFields::default(),
            model_used: "m".into(),
            failed_attempts: vec![],
        });
        assert!(state.can_save());

        state.extracting = true;
        assert!(!state.can_save());
    }

    #[test]
    fn capture_needs_an_open_camera() {
        let mut state = ScanState::default();
        assert!(!state.can_capture());
        state.phase = ScanPhase::CameraOpen;
        assert!(state.can_capture());
        state.camera_opening = true;
        assert!(!state.can_capture());
    }
}
