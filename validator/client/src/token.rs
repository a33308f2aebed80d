use anyhow::{bail, ensure, Context, Result};

/// Supplies bearer tokens for calls to the validation service.
///
/// A token is requested for every call, so implementations may refresh
/// credentials as they see fit.
#[async_trait::async_trait]
pub trait TokenSource: Send + Sync {
    async fn token(&self) -> Result<String>;
}

/// A fixed token, e.g. from the environment.
#[derive(Clone)]
pub struct StaticToken(String);

/// Obtains a token by running a command and reading its standard output,
/// e.g. `gcloud auth print-access-token`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandToken {
    program: String,
    args: Vec<String>,
}

// === impl StaticToken ===

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

impl std::fmt::Debug for StaticToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("StaticToken(..)")
    }
}

#[async_trait::async_trait]
impl TokenSource for StaticToken {
    async fn token(&self) -> Result<String> {
        Ok(self.0.clone())
    }
}

// === impl CommandToken ===

impl CommandToken {
    /// Splits a command line on whitespace into a program and its arguments.
    pub fn parse(command: &str) -> Result<Self> {
        let mut words = command.split_whitespace().map(str::to_string);
        let Some(program) = words.next() else {
            bail!("token command must not be empty");
        };
        Ok(Self {
            program,
            args: words.collect(),
        })
    }
}

#[async_trait::async_trait]
impl TokenSource for CommandToken {
    async fn token(&self) -> Result<String> {
        let output = tokio::process::Command::new(&self.program)
            .args(&self.args)
            .kill_on_drop(true)
            .output()
            .await
            .with_context(|| format!("failed to run {}", self.program))?;
        ensure!(
            output.status.success(),
            "{} exited with {}: {}",
            self.program,
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        );

        let token = String::from_utf8(output.stdout)
            .with_context(|| format!("{} printed a non-UTF-8 token", self.program))?;
        let token = token.trim();
        ensure!(!token.is_empty(), "{} printed an empty token", self.program);
        Ok(token.to_string())
    }
}
