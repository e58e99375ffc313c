//! Submission rollup status.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::output::OutputKind;
use crate::status::{OutputStatus, SubmissionStatus};

/// Output kinds requested for a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
pub struct RequestedOutputs {
    #[serde(default)]
    pub generate_audio: bool,
    #[serde(default)]
    pub generate_video: bool,
    #[serde(default)]
    pub generate_podcast: bool,
    #[serde(default)]
    pub generate_quiz: bool,
    #[serde(default)]
    pub generate_interactive_podcast: bool,
}

impl RequestedOutputs {
    pub fn contains(&self, kind: OutputKind) -> bool {
        match kind {
            OutputKind::Audio => self.generate_audio,
            OutputKind::Video => self.generate_video,
            OutputKind::Podcast => self.generate_podcast,
            OutputKind::Quiz => self.generate_quiz,
            OutputKind::InteractivePodcast => self.generate_interactive_podcast,
        }
    }

    pub fn kinds(&self) -> Vec<OutputKind> {
        OutputKind::ALL
            .into_iter()
            .filter(|k| self.contains(*k))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds().is_empty()
    }

    pub fn from_kinds(kinds: &[OutputKind]) -> Self {
        let mut requested = Self::default();
        for kind in kinds {
            match kind {
                OutputKind::Audio => requested.generate_audio = true,
                OutputKind::Video => requested.generate_video = true,
                OutputKind::Podcast => requested.generate_podcast = true,
                OutputKind::Quiz => requested.generate_quiz = true,
                OutputKind::InteractivePodcast => requested.generate_interactive_podcast = true,
            }
        }
        requested
    }
}

/// Compute a submission's status from its children.
///
/// Only requested kinds are considered. A requested kind with no child row
/// counts as PENDING. When nothing has completed but something has failed
/// while other outputs are still unfinished, the submission is PROCESSING.
pub fn compute(
    requested: &RequestedOutputs,
    children: &[(OutputKind, OutputStatus)],
) -> SubmissionStatus {
    let statuses: Vec<OutputStatus> = requested
        .kinds()
        .into_iter()
        .map(|kind| {
            children
                .iter()
                .find(|(k, _)| *k == kind)
                .map(|(_, status)| *status)
                .unwrap_or(OutputStatus::Pending)
        })
        .collect();

    if statuses.is_empty() {
        return SubmissionStatus::Pending;
    }

    let all = |s: OutputStatus| statuses.iter().all(|x| *x == s);
    let any = |s: OutputStatus| statuses.iter().any(|x| *x == s);

    if all(OutputStatus::Failed) {
        SubmissionStatus::Failed
    } else if all(OutputStatus::Completed) {
        SubmissionStatus::Completed
    } else if any(OutputStatus::Completed) {
        SubmissionStatus::PartialComplete
    } else if statuses.iter().any(|s| s.is_started()) {
        SubmissionStatus::Processing
    } else {
        SubmissionStatus::Pending
    }
}
