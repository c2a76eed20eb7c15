//! Toolkit-independent session state and its transitions.
//!
//! Widget callbacks call into `Session`; the widgets are then refreshed
//! from what it reports. No method here touches GTK, the network or the
//! audio device.

use std::time::{Duration, Instant};

use crate::api::HealthStatus;
use crate::audio::{self, AudioPayload, AudioSource};
use crate::config::ScoringMode;
use crate::error::{ApiError, SessionError, ValidationError};
use crate::evaluation::{
    infer_level, Evaluation, EvaluationHistory, EvaluationRequest, EvaluationResponse,
};
use crate::rubric::Selection;

pub type RequestId = u64;

/// Capture side of the recording/upload state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureState {
    Idle,
    Recording { started: Instant },
    /// A recording finished and produced the active payload.
    Stopped,
    /// An uploaded file is the active payload.
    FileSelected { name: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RubricInput {
    Catalog,
    Manual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    Transcription,
    Evaluation,
}

#[derive(Debug, Clone)]
struct InFlight {
    id: RequestId,
    kind: RequestKind,
    evaluation: Option<EvaluationRequest>,
}

/// Which controls accept input right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Controls {
    pub record: bool,
    pub upload: bool,
    pub evaluate: bool,
    pub cancel: bool,
}

#[derive(Debug)]
pub struct Session {
    capture: CaptureState,
    payload: Option<AudioPayload>,
    transcript: Option<String>,
    pub selection: Selection,
    pub input_mode: RubricInput,
    history: EvaluationHistory,
    in_flight: Option<InFlight>,
    next_request: RequestId,
    health_check: RequestId,
    mic_unavailable: bool,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            capture: CaptureState::Idle,
            payload: None,
            transcript: None,
            selection: Selection::new(),
            input_mode: RubricInput::Catalog,
            history: EvaluationHistory::new(),
            in_flight: None,
            next_request: 1,
            health_check: 0,
            mic_unavailable: false,
        }
    }
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn capture(&self) -> &CaptureState {
        &self.capture
    }

    pub fn source(&self) -> AudioSource {
        self.payload
            .as_ref()
            .map_or(AudioSource::None, |p| p.source)
    }

    pub fn payload(&self) -> Option<&AudioPayload> {
        self.payload.as_ref()
    }

    /// Audio the user can play back: a finished recording or the selected file.
    pub fn playback(&self) -> Option<&AudioPayload> {
        match self.capture {
            CaptureState::Stopped | CaptureState::FileSelected { .. } => self.payload.as_ref(),
            _ => None,
        }
    }

    pub fn transcript(&self) -> Option<&str> {
        self.transcript.as_deref()
    }

    pub fn history(&self) -> &EvaluationHistory {
        &self.history
    }

    pub fn is_recording(&self) -> bool {
        matches!(self.capture, CaptureState::Recording { .. })
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn in_flight_kind(&self) -> Option<RequestKind> {
        self.in_flight.as_ref().map(|f| f.kind)
    }

    /// Record that the microphone is known to be unusable.
    pub fn set_microphone_unavailable(&mut self, unavailable: bool) {
        self.mic_unavailable = unavailable;
    }

    pub fn microphone_unavailable(&self) -> bool {
        self.mic_unavailable
    }

    pub fn controls(&self) -> Controls {
        let busy = self.is_busy();
        let recording = self.is_recording();
        Controls {
            record: !busy && !self.mic_unavailable,
            upload: !busy && !recording,
            evaluate: !busy && !recording && self.transcript.is_some(),
            cancel: busy,
        }
    }

    /// Time since capture started, while recording.
    pub fn elapsed(&self, now: Instant) -> Option<Duration> {
        match self.capture {
            CaptureState::Recording { started } => Some(now.saturating_duration_since(started)),
            _ => None,
        }
    }

    /// Check that a new capture may begin. Call before opening the device.
    pub fn ensure_can_record(&self) -> Result<(), SessionError> {
        if self.is_busy() {
            return Err(SessionError::Busy);
        }
        if self.mic_unavailable {
            return Err(SessionError::MicrophoneUnavailable);
        }
        if self.is_recording() {
            return Err(SessionError::AlreadyRecording);
        }
        Ok(())
    }

    /// The device is open. Drops any previous payload and transcript.
    pub fn recording_started(&mut self, now: Instant) -> Result<(), SessionError> {
        self.ensure_can_record()?;
        self.payload = None;
        self.transcript = None;
        self.capture = CaptureState::Recording { started: now };
        Ok(())
    }

    /// Leave the recording state. Returns how long capture ran.
    pub fn recording_stopped(&mut self, now: Instant) -> Result<Duration, SessionError> {
        let elapsed = self.elapsed(now).ok_or(SessionError::NotRecording)?;
        self.capture = CaptureState::Idle;
        Ok(elapsed)
    }

    /// Attach the encoded capture as the active payload.
    pub fn recording_encoded(&mut self, payload: AudioPayload) {
        self.payload = Some(payload);
        self.transcript = None;
        self.capture = CaptureState::Stopped;
    }

    /// Validate and activate an uploaded file, replacing any previous source.
    pub fn select_file(&mut self, payload: AudioPayload) -> Result<(), SessionError> {
        if self.is_busy() {
            return Err(SessionError::Busy);
        }
        if self.is_recording() {
            return Err(SessionError::AlreadyRecording);
        }
        audio::validate_upload(
            &payload.filename,
            Some(payload.mime_type.as_str()),
            payload.bytes.len() as u64,
        )?;
        self.capture = CaptureState::FileSelected {
            name: payload.filename.clone(),
        };
        self.payload = Some(payload);
        self.transcript = None;
        Ok(())
    }

    /// Forget the uploaded file and anything derived from it.
    pub fn remove_file(&mut self) {
        self.payload = None;
        self.transcript = None;
        self.capture = CaptureState::Idle;
    }

    /// Mark a transcription as in flight and hand back what to send.
    pub fn begin_transcription(&mut self) -> Result<(RequestId, AudioPayload), SessionError> {
        if self.is_busy() {
            return Err(SessionError::Busy);
        }
        let payload = self.payload.clone().ok_or(SessionError::NoAudio)?;
        let id = self.start_request(RequestKind::Transcription, None);
        Ok((id, payload))
    }

    /// Apply a transcription result. Returns `None` for a response that no
    /// longer matches the in-flight request (cancelled or superseded).
    pub fn finish_transcription(
        &mut self,
        id: RequestId,
        result: Result<String, ApiError>,
    ) -> Option<Result<&str, ApiError>> {
        self.take_in_flight(id, RequestKind::Transcription)?;
        match result {
            Ok(text) => {
                self.transcript = Some(text);
                self.transcript.as_deref().map(Ok)
            }
            Err(e) => {
                self.transcript = None;
                Some(Err(e))
            }
        }
    }

    /// Run the evaluation preconditions, in order: question, rubrics,
    /// transcript.
    pub fn prepare_evaluation(
        &self,
        question: &str,
        manual_rubrics: &str,
        mode: ScoringMode,
    ) -> Result<EvaluationRequest, ValidationError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(ValidationError::EmptyQuestion);
        }

        let (rubrics, level) = match self.input_mode {
            RubricInput::Catalog => {
                if self.selection.is_empty() {
                    return Err(ValidationError::EmptySelection);
                }
                (
                    self.selection.build_rubric_text(mode.is_client_side()),
                    self.selection.level_label(),
                )
            }
            RubricInput::Manual => {
                let text = manual_rubrics.trim();
                if text.is_empty() {
                    return Err(ValidationError::EmptyManualRubrics);
                }
                (text.to_string(), infer_level(text))
            }
        };

        let response = self
            .transcript
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or(ValidationError::MissingTranscript)?;

        Ok(EvaluationRequest {
            question: question.to_string(),
            rubrics,
            response: response.to_string(),
            level: level.map(|l| l.as_str().to_string()),
        })
    }

    pub fn begin_evaluation(&mut self, request: EvaluationRequest) -> Result<RequestId, SessionError> {
        if self.is_busy() {
            return Err(SessionError::Busy);
        }
        Ok(self.start_request(RequestKind::Evaluation, Some(request)))
    }

    /// Apply an evaluation result; on success the new entry goes to the
    /// front of the history.
    pub fn finish_evaluation(
        &mut self,
        id: RequestId,
        result: Result<EvaluationResponse, ApiError>,
        timestamp: String,
    ) -> Option<Result<&Evaluation, ApiError>> {
        let flight = self.take_in_flight(id, RequestKind::Evaluation)?;
        match (result, flight.evaluation) {
            (Ok(response), Some(request)) => {
                Some(Ok(self.history.push(Evaluation::new(&request, response, timestamp))))
            }
            (Ok(_), None) => None,
            (Err(e), _) => Some(Err(e)),
        }
    }

    /// Start a health probe. Only the newest probe may update the badge.
    pub fn begin_health_check(&mut self) -> RequestId {
        self.health_check += 1;
        self.health_check
    }

    pub fn finish_health_check(&self, id: RequestId, status: HealthStatus) -> Option<HealthStatus> {
        if id == self.health_check {
            Some(status)
        } else {
            log::info!("Ignoring stale health result #{id} ({status:?})");
            None
        }
    }

    /// Drop the in-flight marker. Returns what was cancelled.
    pub fn cancel_request(&mut self) -> Option<RequestKind> {
        self.in_flight.take().map(|f| f.kind)
    }

    fn start_request(&mut self, kind: RequestKind, evaluation: Option<EvaluationRequest>) -> RequestId {
        let id = self.next_request;
        self.next_request += 1;
        self.in_flight = Some(InFlight { id, kind, evaluation });
        id
    }

    fn take_in_flight(&mut self, id: RequestId, kind: RequestKind) -> Option<InFlight> {
        match &self.in_flight {
            Some(f) if f.id == id && f.kind == kind => self.in_flight.take(),
            _ => {
                log::info!("Ignoring stale {kind:?} response #{id}");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transcribed(text: &str) -> Session {
        let mut s = Session::new();
        s.select_file(AudioPayload::uploaded("a.wav", None, vec![0; 16]))
            .unwrap();
        let (id, _) = s.begin_transcription().unwrap();
        s.finish_transcription(id, Ok(text.to_string()));
        s
    }

    fn with_catalog_cell(mut s: Session) -> Session {
        s.selection.select_level(2).unwrap();
        s.selection.toggle_category("comprehensibility").unwrap();
        s
    }

    #[test]
    fn test_superseded_health_result_is_dropped() {
        let mut s = Session::new();
        let old = s.begin_health_check();
        let new = s.begin_health_check();
        assert_eq!(
            s.finish_health_check(new, HealthStatus::NotConfigured),
            Some(HealthStatus::NotConfigured)
        );
        // The old endpoint answers last.
        assert_eq!(s.finish_health_check(old, HealthStatus::Connected), None);
    }

    #[test]
    fn test_playback_follows_active_source() {
        let mut s = Session::new();
        assert!(s.playback().is_none());

        s.recording_started(Instant::now()).unwrap();
        assert!(s.playback().is_none());
        s.recording_stopped(Instant::now()).unwrap();
        s.recording_encoded(AudioPayload::recorded(vec![1, 2, 3]));
        assert_eq!(s.playback().unwrap().source, AudioSource::Recording);

        s.select_file(AudioPayload::uploaded("clip.mp3", None, vec![0; 8]))
            .unwrap();
        assert_eq!(s.playback().unwrap().filename, "clip.mp3");

        s.recording_started(Instant::now()).unwrap();
        assert!(s.playback().is_none());
        s.recording_stopped(Instant::now()).unwrap();

        s.select_file(AudioPayload::uploaded("clip.mp3", None, vec![0; 8]))
            .unwrap();
        s.remove_file();
        assert!(s.playback().is_none());
    }

    #[test]
    fn test_record_cycle() {
        let mut s = Session::new();
        let t0 = Instant::now();
        s.recording_started(t0).unwrap();
        assert!(s.is_recording());
        assert!(!s.controls().upload);
        assert!(!s.controls().evaluate);
        assert_eq!(s.recording_started(t0), Err(SessionError::AlreadyRecording));

        let elapsed = s.recording_stopped(t0 + Duration::from_secs(3)).unwrap();
        assert_eq!(elapsed, Duration::from_secs(3));
        s.recording_encoded(AudioPayload::recorded(vec![1, 2]));
        assert_eq!(s.capture(), &CaptureState::Stopped);
        assert_eq!(s.source(), AudioSource::Recording);
    }

    #[test]
    fn test_stop_without_recording() {
        let mut s = Session::new();
        assert_eq!(
            s.recording_stopped(Instant::now()),
            Err(SessionError::NotRecording)
        );
    }

    #[test]
    fn test_new_source_discards_previous() {
        let mut s = transcribed("hello");
        assert_eq!(s.source(), AudioSource::Upload);
        assert!(s.controls().evaluate);

        s.recording_started(Instant::now()).unwrap();
        assert_eq!(s.payload(), None);
        assert_eq!(s.transcript(), None);
    }

    #[test]
    fn test_invalid_file_leaves_state_unchanged() {
        let mut s = transcribed("hello");
        let err = s
            .select_file(AudioPayload::uploaded("photo.png", Some("image/png"), vec![0; 4]))
            .unwrap_err();
        assert_eq!(err, SessionError::Invalid(ValidationError::UnsupportedFileType));
        assert_eq!(s.transcript(), Some("hello"));
        assert_eq!(s.payload().unwrap().filename, "a.wav");
    }

    #[test]
    fn test_remove_file_resets() {
        let mut s = transcribed("hello");
        s.remove_file();
        assert_eq!(s.capture(), &CaptureState::Idle);
        assert_eq!(s.source(), AudioSource::None);
        assert!(!s.controls().evaluate);
    }

    #[test]
    fn test_transcription_failure_keeps_evaluate_disabled() {
        let mut s = Session::new();
        s.select_file(AudioPayload::uploaded("a.mp3", None, vec![0; 4]))
            .unwrap();
        let (id, payload) = s.begin_transcription().unwrap();
        assert_eq!(payload.filename, "a.mp3");
        let busy = s.controls();
        assert!(!busy.record && !busy.upload && !busy.evaluate && busy.cancel);

        let outcome = s.finish_transcription(id, Err(ApiError::Backend("boom".into())));
        assert_eq!(outcome, Some(Err(ApiError::Backend("boom".into()))));
        let after = s.controls();
        assert!(after.record && after.upload && !after.evaluate && !after.cancel);
    }

    #[test]
    fn test_cancelled_response_ignored() {
        let mut s = Session::new();
        s.select_file(AudioPayload::uploaded("a.mp3", None, vec![0; 4]))
            .unwrap();
        let (id, _) = s.begin_transcription().unwrap();
        assert_eq!(s.cancel_request(), Some(RequestKind::Transcription));
        assert!(!s.is_busy());

        assert_eq!(s.finish_transcription(id, Ok("late".into())), None);
        assert_eq!(s.transcript(), None);
    }

    #[test]
    fn test_busy_rejects_second_request() {
        let mut s = transcribed("hi");
        let (_, _) = s.begin_transcription().unwrap();
        assert_eq!(s.begin_transcription().unwrap_err(), SessionError::Busy);
        assert_eq!(
            s.begin_evaluation(EvaluationRequest {
                question: "q".into(),
                rubrics: "r".into(),
                response: "hi".into(),
                level: None,
            }),
            Err(SessionError::Busy)
        );
    }

    #[test]
    fn test_precondition_order() {
        let s = Session::new();
        assert_eq!(
            s.prepare_evaluation("  ", "", ScoringMode::ClientSide),
            Err(ValidationError::EmptyQuestion)
        );
        assert_eq!(
            s.prepare_evaluation("Why?", "", ScoringMode::ClientSide),
            Err(ValidationError::EmptySelection)
        );

        let s = with_catalog_cell(Session::new());
        assert_eq!(
            s.prepare_evaluation("Why?", "", ScoringMode::ClientSide),
            Err(ValidationError::MissingTranscript)
        );

        let mut s = Session::new();
        s.input_mode = RubricInput::Manual;
        assert_eq!(
            s.prepare_evaluation("Why?", " \n ", ScoringMode::ClientSide),
            Err(ValidationError::EmptyManualRubrics)
        );
    }

    #[test]
    fn test_empty_transcript_counts_as_missing() {
        let s = with_catalog_cell(transcribed(""));
        assert_eq!(
            s.prepare_evaluation("Why?", "", ScoringMode::ClientSide),
            Err(ValidationError::MissingTranscript)
        );
    }

    #[test]
    fn test_catalog_request_by_mode() {
        let s = with_catalog_cell(transcribed("my answer"));

        let client = s
            .prepare_evaluation(" Why? ", "", ScoringMode::ClientSide)
            .unwrap();
        assert_eq!(client.question, "Why?");
        assert_eq!(client.level.as_deref(), Some("Competent"));
        assert!(client.rubrics.starts_with("EVALUATION LEVEL: Competent\n\n"));
        assert_eq!(client.response, "my answer");

        let server = s
            .prepare_evaluation("Why?", "", ScoringMode::ServerSide)
            .unwrap();
        assert_eq!(
            server.rubrics,
            "Comprehensibility (Competent Level)\nClear & easy to follow\n\n"
        );
        assert_eq!(server.level.as_deref(), Some("Competent"));
    }

    #[test]
    fn test_manual_level_inference() {
        let mut s = transcribed("answer");
        s.input_mode = RubricInput::Manual;

        let req = s
            .prepare_evaluation("Why?", "Grade this as a Proficient speaker", ScoringMode::ServerSide)
            .unwrap();
        assert_eq!(req.level.as_deref(), Some("Proficient"));

        let req = s
            .prepare_evaluation("Why?", "  Focus on grammar only  ", ScoringMode::ServerSide)
            .unwrap();
        assert_eq!(req.level, None);
        assert_eq!(req.rubrics, "Focus on grammar only");
    }

    #[test]
    fn test_evaluations_prepend_history() {
        let mut s = with_catalog_cell(transcribed("answer"));
        for (i, score) in [70.0, 80.0, 90.0].into_iter().enumerate() {
            let req = s
                .prepare_evaluation(&format!("Q{i}"), "", ScoringMode::ClientSide)
                .unwrap();
            let id = s.begin_evaluation(req).unwrap();
            let response = EvaluationResponse {
                overall_score: score,
                ..Default::default()
            };
            let stored = s.finish_evaluation(id, Ok(response), format!("t{i}")).unwrap().unwrap();
            assert_eq!(stored.overall_score, score);
            assert!(s.controls().evaluate);
        }

        let numbered: Vec<_> = s
            .history()
            .numbered()
            .map(|(n, e)| (n, e.question.clone()))
            .collect();
        assert_eq!(
            numbered,
            vec![(3, "Q2".to_string()), (2, "Q1".to_string()), (1, "Q0".to_string())]
        );
    }

    #[test]
    fn test_failed_evaluation_reenables_controls() {
        let mut s = with_catalog_cell(transcribed("answer"));
        let req = s.prepare_evaluation("Q", "", ScoringMode::ClientSide).unwrap();
        let id = s.begin_evaluation(req).unwrap();
        let outcome = s.finish_evaluation(id, Err(ApiError::Timeout { secs: 5 }), "t".into());
        assert_eq!(outcome, Some(Err(ApiError::Timeout { secs: 5 })));
        assert!(s.history().is_empty());
        let c = s.controls();
        assert!(c.record && c.evaluate && !c.cancel);
    }

    #[test]
    fn test_microphone_unavailable_disables_record() {
        let mut s = Session::new();
        s.set_microphone_unavailable(true);
        assert!(!s.controls().record);
        assert_eq!(
            s.recording_started(Instant::now()),
            Err(SessionError::MicrophoneUnavailable)
        );
        assert!(s.controls().upload);
    }
}
