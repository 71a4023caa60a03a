//! Main application orchestration and execution

use crate::{
    cli::{Cli, ClientArgs, Command, CreateArgs, GroupsArgs, ServerArgs},
    client::{GroupSource, RemoteClient},
    config::{display_client_summary, ConfigParser},
    error::{AppError, Result},
    executor::GroupExecutor,
    logging::Logger,
    models::{ClientConfig, ReconciliationReport},
    output::{ReportWriter, SummaryFormatter},
    reconcile::ReconciliationEngine,
    server,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Build time and commit recorded by the build script
pub fn build_info() -> (&'static str, &'static str) {
    (
        option_env!("BUILD_TIME").unwrap_or("unknown"),
        option_env!("GIT_COMMIT").unwrap_or("unknown"),
    )
}

/// Main application struct that coordinates all components
pub struct App {
    cli: Cli,
    parser: ConfigParser,
}

impl App {
    /// Create a new application instance with CLI configuration
    pub fn new(cli: Cli) -> Result<Self> {
        let parser = ConfigParser::new(cli.global.clone());
        parser.load_env()?;
        Ok(Self { cli, parser })
    }

    /// Whether console output should be colored
    pub fn use_color(&self) -> bool {
        self.parser
            .log_settings()
            .map(|settings| settings.enable_color)
            .unwrap_or(!self.cli.global.no_color)
    }

    /// Run the selected subcommand until it finishes or `cancel` fires
    pub async fn run(self, cancel: CancellationToken) -> Result<()> {
        match &self.cli.command {
            Command::Server(args) => self.server(args, cancel).await,
            Command::Client(args) => self.client(args, cancel).await,
            Command::Create(args) => self.create(args).await,
            Command::Groups(args) => self.groups(args).await,
        }
    }

    async fn server(&self, args: &ServerArgs, cancel: CancellationToken) -> Result<()> {
        let config = self.parser.server_config(args)?;
        let logger = Logger::with_settings("SERVER", &config.log);
        log_startup(&logger).await;

        server::serve(&config, logger, cancel).await
    }

    async fn client(&self, args: &ClientArgs, cancel: CancellationToken) -> Result<()> {
        let config = self.parser.client_config(args)?;
        let logger = Logger::with_settings("CLIENT", &config.log);
        log_startup(&logger).await;

        if self.cli.global.debug {
            eprintln!("{}\n", display_client_summary(&config));
        }

        let report = run_client(&config, &logger, cancel.clone()).await?;
        println!("{}", SummaryFormatter::new(config.log.enable_color).format_report(&report));

        if cancel.is_cancelled() {
            return Err(AppError::cancelled("run group interrupted, partial report written"));
        }
        Ok(())
    }

    async fn create(&self, args: &CreateArgs) -> Result<()> {
        let remote = self.parser.remote(args.remote.as_deref())?;
        let spec = args.to_spec();
        spec.validate()?;

        let client = RemoteClient::new(&remote, crate::defaults::DEFAULT_REQUEST_TIMEOUT)?;
        let group = client.create_group(&spec).await?;
        println!("{}", serde_json::to_string_pretty(&group)?);
        Ok(())
    }

    async fn groups(&self, args: &GroupsArgs) -> Result<()> {
        let remote = self.parser.remote(args.remote.as_deref())?;
        let client = RemoteClient::new(&remote, crate::defaults::DEFAULT_REQUEST_TIMEOUT)?;
        let groups = client.list_groups().await?;

        if self.cli.global.verbose {
            eprintln!("{}", SummaryFormatter::new(self.use_color()).format_groups(&groups));
        }
        println!("{}", serde_json::to_string_pretty(&groups)?);
        Ok(())
    }
}

/// Execute a run group end to end and write its report
///
/// Fetches the group definition, dispatches every run, reconciles against the
/// server's records and writes the report to `config.report_path`.
pub async fn run_client(
    config: &ClientConfig,
    logger: &Logger,
    cancel: CancellationToken,
) -> Result<ReconciliationReport> {
    let client = Arc::new(RemoteClient::new(&config.remote, config.request_timeout())?);

    let definition = client.fetch_group(&config.group_id).await?;
    let mut group = definition.without_runs();
    group.payload = config.payload_bytes();
    group.remote_addr = Some(config.remote.clone());

    // Every later line of this session, from any component, names the group
    logger.add_context_field("run_group_id", group.id()).await;
    logger
        .info("executing run group")
        .field("remote", &config.remote)
        .field("run_count", group.run_count())
        .log()
        .await;

    let executor = GroupExecutor::new(client.clone(), logger.named("EXECUTOR"), cancel);
    executor.execute(&mut group).await?;

    let engine = ReconciliationEngine::new(client, logger.named("RECONCILE"));
    let report = engine.create(&group).await?;

    ReportWriter::write(&report, &config.report_path)?;
    logger
        .info("report written")
        .field("path", config.report_path.display().to_string())
        .log()
        .await;

    Ok(report)
}

async fn log_startup(logger: &Logger) {
    let (build_time, git_commit) = build_info();
    logger
        .debug("starting")
        .field("version", crate::VERSION)
        .field("build_time", build_time)
        .field("git_commit", git_commit)
        .log()
        .await;
}
