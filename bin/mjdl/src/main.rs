use std::{num::NonZeroU32, path::PathBuf, str::FromStr, time::Duration};

use anyhow::bail;
use clap::Parser;
use fake_user_agent::get_chrome_rua;
use mjdl::{
    locate::MANIFEST_MARKER, merge::FfmpegMerger, Batch, BatchMode, FailurePolicy, HttpClient,
    Pipeline, RunContext,
};
use reqwest::{
    header::{HeaderMap, HeaderName, HeaderValue},
    Client,
};

#[derive(Parser, Debug, Clone)]
#[clap(name = "mjdl", version, about)]
pub struct MjdlArgs {
    /// File containing one page URL per line
    #[clap(short, long, required_unless_present = "output")]
    file: Option<PathBuf>,

    /// Skip the first n lines of the URL list
    #[clap(short, long, default_value = "0")]
    skip: usize,

    /// Only concatenate existing results into this file
    #[clap(short, long)]
    output: Option<PathBuf>,

    /// Root of the temp/ and output/ directories
    #[clap(long, env = "MJDL_BASE_DIR")]
    base_dir: Option<PathBuf>,

    /// Segment requests kept in flight per track
    #[clap(long, env = "MJDL_THREADS", default_value = "1")]
    threads: NonZeroU32,

    /// Stop the batch at the first failed URL
    #[clap(long)]
    fail_fast: bool,

    /// Keep temporary files.
    #[clap(short, long)]
    keep: bool,

    /// Remove temp/ and output/ before starting
    #[clap(long)]
    clean: bool,

    /// Token identifying the manifest link in a page
    #[clap(long, default_value = MANIFEST_MARKER)]
    marker: String,

    /// Cookies used to download
    #[clap(long)]
    cookies: Option<String>,

    /// HTTP Header used to download
    ///
    /// Custom header. eg. "User-Agent: xxxxx". This option will override --cookies.
    #[clap(short = 'H', long)]
    headers: Vec<String>,

    /// Timeout seconds for each page/manifest/segment request.
    #[clap(long, default_value = "60")]
    timeout: u64,

    /// Debug output
    #[clap(short, long, alias = "debug")]
    verbose: bool,
}

impl MjdlArgs {
    fn client(&self) -> anyhow::Result<HttpClient> {
        let mut headers = HeaderMap::new();
        if let Some(cookies) = &self.cookies {
            headers.insert(reqwest::header::COOKIE, HeaderValue::from_str(cookies)?);
        }

        for header in &self.headers {
            let Some((key, value)) = header.split_once(':') else {
                bail!("Invalid header: {header}");
            };
            headers.insert(
                HeaderName::from_str(key.trim())?,
                HeaderValue::from_str(value.trim())?,
            );
        }

        let builder = Client::builder()
            .default_headers(headers)
            .user_agent(get_chrome_rua())
            .timeout(Duration::from_secs(self.timeout));
        Ok(HttpClient::new(builder)?)
    }

    fn context(&self) -> anyhow::Result<RunContext> {
        let work_dir = std::env::current_dir()?;
        let base_dir = match &self.base_dir {
            Some(dir) => {
                if !dir.exists() {
                    bail!("Base directory {} does not exist.", dir.display());
                }
                dir.canonicalize()?
            }
            None => work_dir.clone(),
        };
        Ok(RunContext::new(base_dir, work_dir))
    }

    fn mode(&self) -> anyhow::Result<BatchMode> {
        if let Some(output) = &self.output {
            return Ok(BatchMode::ConcatOnly {
                output: output.clone(),
            });
        }

        let Some(url_list) = &self.file else {
            bail!("Either --file or --output is required.");
        };
        if !url_list.is_file() {
            bail!("{} not a valid file", url_list.display());
        }
        Ok(BatchMode::Download {
            url_list: url_list.clone(),
            skip: self.skip,
        })
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = MjdlArgs::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_level.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let context = args.context()?;
    let mode = args.mode()?;
    if args.clean {
        context.clean().await?;
    }
    tracing::info!("Run prefix: {}", context.prefix());

    let pipeline = Pipeline::new(args.client()?)
        .with_marker(args.marker.clone())
        .with_concurrency(args.threads);
    let policy = if args.fail_fast {
        FailurePolicy::Abort
    } else {
        FailurePolicy::Continue
    };
    let batch = Batch::new(pipeline, mode)
        .policy(policy)
        .keep_temp(args.keep);

    let merger = FfmpegMerger::new()?;
    let report = batch.run(&context, &merger).await?;

    tracing::info!(
        "{} succeeded, {} failed.",
        report.completed.len(),
        report.failed.len()
    );
    if !report.is_success() {
        for failure in &report.failed {
            tracing::error!(
                "#{} {}: {}",
                failure.index,
                failure.page_url,
                failure.error
            );
        }
        bail!(
            "{} source(s) failed, see {}",
            report.failed.len(),
            context.error_log().display()
        );
    }

    Ok(())
}
