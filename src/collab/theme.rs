use futures::future::BoxFuture;

use crate::collab::CollabResult;
use crate::state::week::WeekId;

/// Context handed to the generator so themes do not repeat week to week.
#[derive(Debug, Clone)]
pub struct ThemeContext {
    /// Week the generated theme is for.
    pub week: WeekId,
    /// Theme of the week that just ran, if any.
    pub previous_theme: Option<String>,
}

/// External theme generator collaborator.
pub trait ThemeGenerator: Send + Sync {
    /// Produce a theme string for the upcoming week.
    fn generate(&self, context: ThemeContext) -> BoxFuture<'static, CollabResult<String>>;
}
