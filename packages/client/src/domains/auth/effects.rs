use anyhow::{Context, Result};
use async_trait::async_trait;
use relay::{
    smallvec, Action, ConcurrencyPolicy, Effect, EffectContext, EngineBuilder, Failure, MatchTags, Reducer,
};
use tracing::{debug, info, warn};

use crate::domains::movies::{ActionTag, MovieAction};
use crate::kernel::ClientDeps;

/// Register the login triggers on the builder.
pub fn register<R>(
    builder: EngineBuilder<MovieAction, ClientDeps, R>,
) -> EngineBuilder<MovieAction, ClientDeps, R>
where
    R: Reducer<Action = MovieAction>,
{
    builder
        .with_effect(LoginEffect)
        .with_effect(ClosePromptAfterLogin)
}

/// Result of a completed login pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggedIn {
    pub session_id: String,
    pub redirect_url: Option<String>,
}

/// Login effect - token, validation, session, capture
///
/// Each step waits for the previous one and the first failing step ends the
/// pipeline. The session id is only captured once it exists.
pub struct LoginEffect;

#[async_trait]
impl Effect<MovieAction, ClientDeps> for LoginEffect {
    type Output = LoggedIn;

    fn name(&self) -> &'static str {
        "login"
    }

    fn matches(&self) -> MatchTags<ActionTag> {
        smallvec![ActionTag::Login]
    }

    fn policy(&self) -> ConcurrencyPolicy {
        ConcurrencyPolicy::Serialized
    }

    async fn run(&self, action: MovieAction, ctx: EffectContext<ClientDeps>) -> Result<LoggedIn> {
        let (username, password, redirect_url) = match action {
            MovieAction::Login {
                username,
                password,
                redirect_url,
            } => (username, password, redirect_url),
            other => anyhow::bail!("unexpected action: {}", other.tag()),
        };
        let auth = &ctx.deps().auth;

        // 1. Fresh request token
        let token = auth
            .request_token()
            .await
            .context("requesting token")?;

        // 2. Validate it with the user's credentials
        debug!(username = %username, "validating login");
        let validated = auth
            .validate_with_login(&username, &password, &token.request_token)
            .await
            .context("validating login")?;

        // 3. Exchange the validated token for a session
        let session = auth
            .create_session(&validated.request_token)
            .await
            .context("creating session")?;

        // 4. Capture
        ctx.deps().session.set_session_id(&session.session_id);
        info!(username = %username, "logged in");

        Ok(LoggedIn {
            session_id: session.session_id,
            redirect_url,
        })
    }

    fn on_success(&self, logged_in: LoggedIn) -> MovieAction {
        MovieAction::LoginSuccess {
            session_id: logged_in.session_id,
            redirect_url: logged_in.redirect_url,
        }
    }

    fn on_failure(&self, error: Failure) -> MovieAction {
        MovieAction::LoginFailure { error }
    }
}

/// Follows a successful login: navigates to the redirect target, if any,
/// and closes the login prompt either way.
pub struct ClosePromptAfterLogin;

#[async_trait]
impl Effect<MovieAction, ClientDeps> for ClosePromptAfterLogin {
    type Output = ();

    fn name(&self) -> &'static str {
        "close_prompt_after_login"
    }

    fn matches(&self) -> MatchTags<ActionTag> {
        smallvec![ActionTag::LoginSuccess]
    }

    fn policy(&self) -> ConcurrencyPolicy {
        ConcurrencyPolicy::Concurrent
    }

    async fn run(&self, action: MovieAction, ctx: EffectContext<ClientDeps>) -> Result<()> {
        if let MovieAction::LoginSuccess {
            redirect_url: Some(target),
            ..
        } = action
        {
            ctx.deps().navigator.navigate(&target).await?;
        }
        Ok(())
    }

    fn on_success(&self, _: ()) -> MovieAction {
        MovieAction::CloseLoginPrompt
    }

    fn on_failure(&self, error: Failure) -> MovieAction {
        warn!(error = %error, "redirect after login failed");
        MovieAction::CloseLoginPrompt
    }
}
