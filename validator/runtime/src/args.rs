use crate::{
    client::{CommandToken, StaticToken, ValidationClient},
    duration::HumanDuration,
    Config, ConfigPaths, FailurePolicy, ManifestDir, Poller, Report, Validator,
};
use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[clap(
    name = "manifest-validator",
    about = "Validates resource manifests against a remote policy service",
    version
)]
pub struct Args {
    #[clap(
        long,
        default_value = "manifest_validator=info,warn",
        env = "MANIFEST_VALIDATOR_LOG"
    )]
    log_level: kubert::LogFilter,

    #[clap(long, default_value = "plain")]
    log_format: kubert::LogFormat,

    /// Base URL of the validation service.
    #[clap(long, env = "VALIDATION_ENDPOINT")]
    endpoint: String,

    /// The project that validation requests are billed to.
    #[clap(long, env = "VALIDATION_PROJECT")]
    project: String,

    /// A bearer token for the validation service.
    ///
    /// When unset, a token is obtained from `--token-command` for every call.
    #[clap(long, env = "VALIDATION_ACCESS_TOKEN", hide_env_values = true)]
    access_token: Option<String>,

    #[clap(
        long,
        env = "VALIDATION_TOKEN_COMMAND",
        default_value = "gcloud auth print-access-token"
    )]
    token_command: String,

    /// A directory of rendered YAML manifests.
    #[clap(long, env = "MANIFESTS_DIR", default_value = ".")]
    manifests: PathBuf,

    /// A directory of previously accepted violations.
    #[clap(long, env = "ALLOWLIST_PATH")]
    allowlist_dir: Option<PathBuf>,

    /// A JSON file mapping component categories to resource name patterns.
    /// Only matching resources are validated.
    #[clap(long, env = "FOCUS_COMPONENT_PATH")]
    focus_components: Option<PathBuf>,

    /// How often a pending validation operation is checked. Must be
    /// non-zero.
    #[clap(long, default_value = "1s")]
    poll_interval: HumanDuration,

    /// How long to wait for all validation operations to resolve.
    #[clap(long, default_value = "120m")]
    deadline: HumanDuration,

    #[clap(long, default_value = "30s")]
    request_timeout: HumanDuration,

    /// Fail when a validation operation completes with an error.
    #[clap(long)]
    fail_on_operation_error: bool,

    /// Fail when validation operations are still pending at the deadline.
    #[clap(long)]
    fail_on_unresolved: bool,
}

impl Args {
    #[inline]
    pub async fn parse_and_run() -> Result<()> {
        Self::parse().run().await
    }

    pub async fn run(self) -> Result<()> {
        let Self {
            log_level,
            log_format,
            endpoint,
            project,
            access_token,
            token_command,
            manifests,
            allowlist_dir,
            focus_components,
            poll_interval,
            deadline,
            request_timeout,
            fail_on_operation_error,
            fail_on_unresolved,
        } = self;

        log_format.try_init(log_level)?;

        let config = Config::load(&ConfigPaths {
            allowlist_dir,
            focus_components,
        })?;

        info!(%endpoint, %project, manifests = %manifests.display(), "Validating manifests");
        let client = match access_token {
            Some(token) => ValidationClient::new(
                endpoint,
                project,
                StaticToken::new(token),
                request_timeout.get(),
            )?,
            None => ValidationClient::new(
                endpoint,
                project,
                CommandToken::parse(&token_command)?,
                request_timeout.get(),
            )?,
        };

        let validator = Validator::new(
            ManifestDir::new(manifests, config.focus.clone()),
            Poller::new(client, poll_interval.get(), deadline.get())?,
            Report::new(config.allowlist.clone()),
        )
        .with_failure_policy(FailurePolicy {
            fail_on_operation_error,
            fail_on_unresolved,
        });

        let (shutdown, watch) = kubert::shutdown::sigint_or_sigterm()?;
        tokio::spawn(async move {
            if shutdown.signaled().await.is_err() {
                warn!("Aborted by a second signal");
            }
        });

        validator
            .validate(async move {
                let _release = watch.signaled().await;
            })
            .await?;

        info!("Validation completed successfully");
        Ok(())
    }
}
