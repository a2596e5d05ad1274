use std::{
    path::PathBuf,
    sync::Arc,
    time::{Duration, Instant},
};

use anyhow::{Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use console::{StyledObject, style};
use indicatif::{ProgressBar, ProgressStyle};
use lectern_core::{
    FileStore, Intake, LectureRecord, LectureStatus, LectureStore, PipelineConfig,
    PipelineExecutor, Provider, RawSources, SpoolQueue, Submission, Worker,
    format_lecture_readable, get_root_data_dir, get_scratch_dir, get_spool_dir, get_store_dir,
    queue::DEFAULT_POLL_INTERVAL,
};
use tokio::sync::broadcast;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

fn format_duration(d: Duration) -> String {
    let secs = d.as_secs_f64();
    if secs < 60.0 {
        format!("{:.1}s", secs)
    } else {
        format!("{:.0}m {:.0}s", (secs / 60.0).floor(), secs % 60.0)
    }
}

/// CLI wrapper for Provider enum (needed for clap ValueEnum)
#[derive(Clone, Default, ValueEnum)]
enum CliProvider {
    #[default]
    Openai,
    Grok,
    Gemini,
}

impl From<CliProvider> for Provider {
    fn from(cli: CliProvider) -> Self {
        match cli {
            CliProvider::Openai => Provider::Openai,
            CliProvider::Grok => Provider::Grok,
            CliProvider::Gemini => Provider::Gemini,
        }
    }
}

#[derive(Parser)]
#[command(name = "lectern")]
#[command(about = "Turn lecture recordings into transcripts, slides, summaries and quizzes")]
struct Cli {
    /// Where lecture records and the job spool live
    #[arg(long, env = "LECTERN_DATA_DIR", global = true)]
    data_dir: Option<PathBuf>,

    /// Scratch directory for downloaded media
    #[arg(long, env = "LECTERN_SCRATCH_DIR", global = true)]
    scratch_dir: Option<PathBuf>,

    /// Root that upload paths such as /uploads/a.mp4 resolve against
    #[arg(long, env = "LECTERN_MEDIA_ROOT", global = true)]
    media_root: Option<PathBuf>,

    /// Interpreter for the local model scripts
    #[arg(long, env = "LECTERN_PYTHON", default_value = "python", global = true)]
    python: PathBuf,

    /// Directory holding transcriber.py, extractor.py, cleaner.py, summarize.py and quiz_generator.py
    #[arg(long, env = "LECTERN_SCRIPTS_DIR", default_value = "ai_models", global = true)]
    scripts_dir: PathBuf,

    /// Upper bound for every stage call, in seconds
    #[arg(long, env = "LECTERN_STAGE_TIMEOUT_SECS", default_value_t = 600, global = true)]
    stage_timeout_secs: u64,

    /// Connect and stall bound for remote audio downloads, in seconds
    #[arg(long, env = "LECTERN_DOWNLOAD_TIMEOUT_SECS", default_value_t = 60, global = true)]
    download_timeout_secs: u64,

    /// Upper bound for a whole platform video download, in seconds
    #[arg(long, env = "LECTERN_PLATFORM_TIMEOUT_SECS", default_value_t = 3600, global = true)]
    platform_timeout_secs: u64,

    /// Hosted AI provider for the external summary and quiz
    #[arg(short, long, env = "LECTERN_PROVIDER", value_enum, default_value = "openai", global = true)]
    provider: CliProvider,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Register a lecture and queue it for processing
    Submit {
        #[arg(short, long)]
        title: String,

        #[arg(short, long, default_value = "")]
        description: String,

        /// Local video file
        #[arg(long)]
        video: Option<String>,

        /// Local audio file
        #[arg(long)]
        audio: Option<String>,

        /// Local slide deck
        #[arg(long)]
        slides: Option<String>,

        /// YouTube URL
        #[arg(long)]
        platform_url: Option<String>,

        /// Remote audio file URL
        #[arg(long)]
        audio_url: Option<String>,
    },

    /// Process queued lectures until interrupted
    Worker {
        /// Handle a single job and exit
        #[arg(long)]
        once: bool,
    },

    /// Queue a completed or failed lecture for another run
    Reprocess { id: Uuid },

    /// Print one lecture
    Show {
        id: Uuid,

        /// Raw JSON instead of the readable view
        #[arg(long)]
        json: bool,
    },

    /// List all lectures, newest first
    List,
}

impl Cli {
    fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            scratch_dir: self.scratch_dir.clone().unwrap_or_else(get_scratch_dir),
            media_root: self.media_root.clone(),
            stage_timeout: Duration::from_secs(self.stage_timeout_secs),
            download_timeout: Duration::from_secs(self.download_timeout_secs),
            platform_timeout: Duration::from_secs(self.platform_timeout_secs),
            provider: self.provider.clone().into(),
            interpreter: self.python.clone(),
            scripts_dir: self.scripts_dir.clone(),
            ..PipelineConfig::default()
        }
    }
}

fn create_spinner(msg: &str) -> Result<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
            .template("{spinner:.cyan} {msg}")?,
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    Ok(pb)
}

fn styled_status(status: LectureStatus) -> StyledObject<&'static str> {
    let s = style(status.as_str());
    match status {
        LectureStatus::Completed => s.green(),
        LectureStatus::Failed => s.red(),
        LectureStatus::Processing => s.yellow(),
        LectureStatus::Queued => s.cyan(),
        LectureStatus::Uploaded => s.dim(),
    }
}

fn warn_missing_key(provider: Provider) {
    if let Err(e) = provider.validate_api_key() {
        println!(
            "{} {} {}",
            style("!").yellow().bold(),
            e,
            style("(hosted sources will be skipped)").dim()
        );
    }
}

struct App {
    config: PipelineConfig,
    store: Arc<FileStore>,
    spool: Arc<SpoolQueue>,
}

impl App {
    async fn open(cli: &Cli) -> Result<Self> {
        let data_dir = cli.data_dir.clone().unwrap_or_else(get_root_data_dir);
        let store = FileStore::open(get_store_dir(&data_dir)).await?;
        let spool = SpoolQueue::open(get_spool_dir(&data_dir), DEFAULT_POLL_INTERVAL).await?;

        Ok(Self {
            config: cli.pipeline_config(),
            store: Arc::new(store),
            spool: Arc::new(spool),
        })
    }

    fn executor(&self) -> Result<Arc<PipelineExecutor>> {
        let store: Arc<dyn LectureStore> = self.store.clone();
        Ok(Arc::new(PipelineExecutor::from_config(store, &self.config)?))
    }

    fn intake(&self) -> Result<Intake> {
        Ok(Intake::new(self.spool.clone(), self.executor()?))
    }
}

async fn submit(app: &App, record: LectureRecord) -> Result<()> {
    if !record.has_raw_source() {
        println!(
            "{} No source given, processing will fail",
            style("!").yellow().bold()
        );
    }
    warn_missing_key(app.config.provider);

    let id = record.id;
    let started = Instant::now();
    let spinner = create_spinner("Submitting lecture...")?;
    let submission = app.intake()?.submit(record).await?;

    match submission {
        Submission::Queued(job) => spinner.finish_with_message(format!(
            "{} Queued {} {}",
            style("✓").green().bold(),
            style(id).bold(),
            style(format!("(job {})", job.job_id)).dim()
        )),
        Submission::Inline(status) => spinner.finish_with_message(format!(
            "{} Queue unavailable, inline summary {} for {} {}",
            style("!").yellow().bold(),
            styled_status(status),
            style(id).bold(),
            style(format!("[{}]", format_duration(started.elapsed()))).dim()
        )),
    }
    Ok(())
}

async fn run_worker(app: &App, once: bool) -> Result<()> {
    let recovered = app.spool.recover().await?;
    if recovered > 0 {
        println!(
            "{} Re-queued {} unfinished job(s)",
            style("↻").cyan().bold(),
            recovered
        );
    }
    warn_missing_key(app.config.provider);

    let worker = Worker::new(app.spool.clone(), app.executor()?);

    if once {
        let started = Instant::now();
        match worker.run_once().await? {
            Some(status) => println!(
                "{} Lecture {} {}",
                style("✓").green().bold(),
                styled_status(status),
                style(format!("[{}]", format_duration(started.elapsed()))).dim()
            ),
            None => println!("{} Job dropped, lecture not found", style("!").yellow().bold()),
        }
        return Ok(());
    }

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received");
            let _ = shutdown_tx.send(());
        }
    });

    println!(
        "{} Waiting for jobs {}",
        style("●").cyan().bold(),
        style("(Ctrl-C to stop)").dim()
    );
    worker.run(shutdown_rx).await
}

async fn show(app: &App, id: Uuid, json: bool) -> Result<()> {
    let Some(record) = app.store.find(id).await? else {
        bail!("Lecture {id} not found");
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&record)?);
    } else {
        println!("{}", format_lecture_readable(&record));
    }
    Ok(())
}

async fn list(app: &App) -> Result<()> {
    let records = app.store.list().await?;
    if records.is_empty() {
        println!("{}", style("No lectures yet").dim());
        return Ok(());
    }

    for record in records {
        println!(
            "{}  {:<10}  {}  {}",
            style(record.id).dim(),
            styled_status(record.status),
            record.title,
            style(record.updated_at.format("%Y-%m-%d %H:%M")).dim()
        );
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lectern=info,lectern_core=info".into()),
        )
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let app = App::open(&cli).await?;

    println!(
        "\n{}  {}\n",
        style("lectern").cyan().bold(),
        style("Lecture Pipeline").dim()
    );

    match cli.command {
        Command::Submit {
            title,
            description,
            video,
            audio,
            slides,
            platform_url,
            audio_url,
        } => {
            let sources = RawSources {
                video,
                audio,
                slides,
                platform_url,
                audio_url,
            };
            let record = LectureRecord::new(title, sources).with_description(description);
            submit(&app, record).await
        }
        Command::Worker { once } => run_worker(&app, once).await,
        Command::Reprocess { id } => {
            let job = app.intake()?.reprocess(id).await?;
            println!(
                "{} Reprocess queued {}",
                style("✓").green().bold(),
                style(format!("(job {})", job.job_id)).dim()
            );
            Ok(())
        }
        Command::Show { id, json } => show(&app, id, json).await,
        Command::List => list(&app).await,
    }
}
