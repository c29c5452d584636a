/// Reconciles revisable transcript fragments into a stable transcript.
///
/// The backend re-sends a growing or shrinking transcription of the same
/// spoken utterance before finalizing it. Naively replacing or appending
/// each fragment would either discard corrections or duplicate text, so
/// fragments are compared against the previous one: if either contains the
/// other (or there is no previous fragment), the new fragment is a
/// refinement of the same utterance and replaces the pending text. Only
/// when a genuinely different fragment arrives is the pending text locked
/// into the confirmed transcript.
///
/// Two distinct utterances that happen to share a substring (say "go"
/// followed by "going to go") are merged as one. That is a known limit of
/// the containment check; callers get the backend's observed behavior, not
/// a corrected one.
#[derive(Debug, Clone, Default)]
pub struct TranscriptReconciler {
    /// Text locked in as belonging to completed utterances. Append-only
    /// within a session.
    confirmed: String,
    /// Most recent fragment, not yet locked in.
    prior: String,
}

impl TranscriptReconciler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing transcript, e.g. text the user already typed.
    pub fn with_baseline(text: &str) -> Self {
        Self {
            confirmed: text.to_string(),
            prior: String::new(),
        }
    }

    /// Feed one fragment and get back the new live display text.
    pub fn apply(&mut self, fragment: &str) -> String {
        let incoming = fragment.trim();

        let continuation = self.prior.is_empty()
            || incoming.contains(self.prior.as_str())
            || self.prior.contains(incoming);

        if !continuation {
            // A new utterance started: lock in the previous fragment.
            self.confirmed = join(&self.confirmed, &self.prior);
        }

        self.prior = incoming.to_string();
        self.live()
    }

    /// Finalize whatever partial text was last received.
    ///
    /// Called when the session stops; afterwards the live display and the
    /// confirmed transcript are identical.
    pub fn flush(&mut self) -> &str {
        if !self.prior.is_empty() {
            self.confirmed = join(&self.confirmed, &self.prior);
            self.prior.clear();
        }
        &self.confirmed
    }

    /// Reset to a manually edited transcript, discarding pending text.
    pub fn rebaseline(&mut self, text: &str) {
        self.confirmed = text.to_string();
        self.prior.clear();
    }

    /// Transcript text locked in so far.
    pub fn confirmed(&self) -> &str {
        &self.confirmed
    }

    /// Most recent fragment, not yet locked in.
    pub fn pending(&self) -> &str {
        &self.prior
    }

    /// Confirmed text plus the pending fragment.
    pub fn live(&self) -> String {
        join(&self.confirmed, &self.prior)
    }
}

/// Join two transcript pieces with a single space, omitting the separator
/// when either side is empty.
fn join(left: &str, right: &str) -> String {
    if left.is_empty() {
        right.to_string()
    } else if right.is_empty() {
        left.to_string()
    } else {
        format!("{} {}", left, right)
    }
}
