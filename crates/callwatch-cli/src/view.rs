//! In-memory state of the call detail view.

use callwatch_protocol::events::TranscriptionProgress;
use std::fmt;

use crate::api::CallDetail;

/// How a notice should be presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Success,
    Error,
}

/// A transient user-facing message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub severity: Severity,
    pub title: String,
    pub description: String,
}

impl Notice {
    pub fn new(severity: Severity, title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            severity,
            title: title.into(),
            description: description.into(),
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.severity {
            Severity::Info => "info",
            Severity::Success => "ok",
            Severity::Error => "error",
        };
        write!(f, "[{}] {}: {}", tag, self.title, self.description)
    }
}

/// What the call detail view shows.
#[derive(Debug, Clone, Default)]
pub struct CallView {
    call: Option<CallDetail>,
    progress: f64,
    current_segment: String,
    notices: Vec<Notice>,
}

impl CallView {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the snapshot.
    pub fn set_call(&mut self, call: CallDetail) {
        self.call = Some(call);
    }

    /// Apply a progress event.
    pub fn apply_progress(&mut self, event: &TranscriptionProgress) {
        self.progress = event.progress.clamp(0.0, 100.0);
        self.current_segment.clone_from(&event.text);
    }

    /// Transcription finished.
    pub fn mark_completed(&mut self) {
        self.progress = 100.0;
    }

    pub fn push_notice(&mut self, notice: Notice) {
        self.notices.push(notice);
    }

    /// Remove and return pending notices.
    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    #[must_use]
    pub fn call(&self) -> Option<&CallDetail> {
        self.call.as_ref()
    }

    #[must_use]
    pub fn progress(&self) -> f64 {
        self.progress
    }

    #[must_use]
    pub fn current_segment(&self) -> &str {
        &self.current_segment
    }

    #[must_use]
    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    /// Plain-text rendering.
    #[must_use]
    pub fn render(&self) -> String {
        let Some(call) = &self.call else {
            return "Loading call...".to_string();
        };

        let short_id: String = call.id.chars().take(8).collect();
        let mut out = format!("Call {} ({})\n", short_id, call.created_at);

        let status = if call.status_display.is_empty() {
            &call.status
        } else {
            &call.status_display
        };
        out.push_str(&format!("Status: {}\n", status));
        if let Some(duration) = call.duration {
            out.push_str(&format!("Duration: {:.0}s\n", duration));
        }

        if call.is_processing() {
            out.push_str(&format!("Progress: {}%\n", self.progress));
            if !self.current_segment.is_empty() {
                out.push_str(&format!("Current segment: {}\n", self.current_segment));
            }
        }

        if let Some(transcription) = &call.transcription {
            out.push_str(&format!("Transcript: {}\n", transcription.text));
        }
        if let Some(analysis) = &call.analysis {
            let category = analysis
                .category_display
                .as_deref()
                .or(analysis.category.as_deref())
                .unwrap_or("-");
            let sentiment = analysis.sentiment.as_deref().unwrap_or("-");
            out.push_str(&format!("Category: {} | Sentiment: {}\n", category, sentiment));
            if let Some(summary) = analysis.summary.as_deref().filter(|s| !s.is_empty()) {
                out.push_str(&format!("Summary: {}\n", summary));
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn processing_call() -> CallDetail {
        serde_json::from_value(serde_json::json!({
            "id": "abc123def456",
            "status": "processing",
            "status_display": "Processing",
            "created_at": "2024-05-01T10:00:00Z"
        }))
        .unwrap()
    }

    fn progress(value: f64, text: &str) -> TranscriptionProgress {
        TranscriptionProgress {
            call_id: None,
            progress: value,
            text: text.to_string(),
            segment: None,
            timestamp: None,
        }
    }

    #[test]
    fn test_progress_updates() {
        let mut view = CallView::new();
        view.apply_progress(&progress(42.0, "hello"));
        assert_eq!(view.progress(), 42.0);
        assert_eq!(view.current_segment(), "hello");

        view.apply_progress(&progress(140.0, ""));
        assert_eq!(view.progress(), 100.0);

        view.mark_completed();
        assert_eq!(view.progress(), 100.0);
    }

    #[test]
    fn test_render_processing() {
        let mut view = CallView::new();
        assert_eq!(view.render(), "Loading call...");

        view.set_call(processing_call());
        view.apply_progress(&progress(42.0, "hello"));

        let out = view.render();
        assert!(out.starts_with("Call abc123de "));
        assert!(out.contains("Progress: 42%"));
        assert!(out.contains("Current segment: hello"));
    }

    #[test]
    fn test_render_tolerates_missing_analysis_fields() {
        let mut view = CallView::new();
        view.set_call(
            serde_json::from_value(serde_json::json!({
                "id": "abc123def456",
                "status": "completed",
                "duration": null,
                "transcription": {"text": "hello", "confidence": null, "segments": []},
                "analysis": {"category": null, "category_display": null,
                             "sentiment": null, "summary": null}
            }))
            .unwrap(),
        );

        let out = view.render();
        assert!(!out.contains("Duration:"));
        assert!(out.contains("Transcript: hello"));
        assert!(out.contains("Category: - | Sentiment: -"));
        assert!(!out.contains("Summary:"));
    }

    #[test]
    fn test_notices_drain() {
        let mut view = CallView::new();
        view.push_notice(Notice::new(Severity::Error, "Transcription failed", "decoder crashed"));
        assert_eq!(
            view.notices()[0].to_string(),
            "[error] Transcription failed: decoder crashed"
        );
        assert_eq!(view.take_notices().len(), 1);
        assert!(view.notices().is_empty());
    }
}
