//! One user's generation session as an explicit state machine.
//!
//! A [`Session`] is never mutated in place: each transition returns the
//! next session, so the form, the loading flag and the last result always
//! change together.
//!
//! ```text
//! Idle | Ready | Failed --submit--> Loading --complete--> Ready | Failed
//! ```
//!
//! Only one request may be outstanding; submitting while `Loading` is
//! rejected. A new cycle replaces the previous result entirely.

use tracing::{error, info};

use crate::client::Generator;
use crate::error::SpecError;
use crate::form::SpecFormData;
use crate::markdown::{self, RenderOptions};
use crate::prompt;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Status {
    #[default]
    Idle,
    Loading,
    /// Generation succeeded; `source` is the untransformed Markdown.
    Ready { source: String },
    /// Generation failed; `message` is safe to show to the user.
    Failed { message: String },
}

/// What the result area shows. Exactly one at a time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum View {
    Placeholder,
    Loading,
    Error(String),
    Spec { html: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub form: SpecFormData,
    pub status: Status,
}

impl Session {
    pub fn new(form: SpecFormData) -> Self {
        Self {
            form,
            status: Status::Idle,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.status == Status::Loading
    }

    /// Whether a new request may be submitted now.
    pub fn can_submit(&self) -> bool {
        !self.is_loading()
    }

    /// Replace the form. The current status is kept.
    pub fn with_form(&self, form: SpecFormData) -> Self {
        Self {
            form,
            status: self.status.clone(),
        }
    }

    /// Enter `Loading`, discarding any previous result or error.
    pub fn submit(&self) -> Result<Self, SpecError> {
        if self.is_loading() {
            return Err(SpecError::GenerationInFlight);
        }
        Ok(Self {
            form: self.form.clone(),
            status: Status::Loading,
        })
    }

    /// Leave `Loading` with the outcome of the request.
    ///
    /// The user only ever sees the error's display text; the full error is
    /// logged. Completing a session that is not loading is ignored.
    pub fn complete(&self, outcome: Result<String, SpecError>) -> Self {
        if !self.is_loading() {
            return self.clone();
        }
        let status = match outcome {
            Ok(source) => Status::Ready { source },
            Err(e) => {
                error!(err = ?e, "generation cycle failed");
                Status::Failed {
                    message: e.to_string(),
                }
            }
        };
        Self {
            form: self.form.clone(),
            status,
        }
    }

    pub fn view(&self, options: RenderOptions) -> View {
        match &self.status {
            Status::Idle => View::Placeholder,
            Status::Loading => View::Loading,
            Status::Failed { message } => View::Error(message.clone()),
            Status::Ready { source } => View::Spec {
                html: markdown::render_with(source, options),
            },
        }
    }

    /// Text for the copy action: the Markdown source, not the HTML.
    pub fn copy_text(&self) -> Option<&str> {
        match &self.status {
            Status::Ready { source } => Some(source),
            _ => None,
        }
    }
}

/// Run one full cycle: submit, assemble the prompt, call the generator,
/// complete.
pub fn run_cycle(session: &Session, generator: &dyn Generator) -> Result<Session, SpecError> {
    let loading = session.submit()?;
    let prompt = prompt::website_spec(&loading.form);
    info!(
        client = %loading.form.client_name,
        sections = loading.form.sections.len(),
        prompt_len = prompt.len(),
        "generation cycle started"
    );

    let outcome = generator.generate(&prompt);
    Ok(loading.complete(outcome))
}
