use clap::Parser;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use spotify_downloader::catalog::SpotifyCatalog;
use spotify_downloader::cli::Cli;
use spotify_downloader::common::logger::PrettyLogger;
use spotify_downloader::config::AppConfig;
use spotify_downloader::downloader::YtDlpSource;
use spotify_downloader::tagger::MetadataTagger;
use spotify_downloader::task::{
    DownloadController, DownloadRequest, TaskSnapshot, TaskStatus, TaskStore,
};
use spotify_downloader::{log_error, log_info, log_step, log_success, log_warning};

type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

fn progress_bar(total: u64) -> ProgressBar {
    let bar = ProgressBar::new(total);
    let style = ProgressStyle::with_template(
        "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}",
    )
    .map(|style| style.progress_chars("#>-"))
    .unwrap_or_else(|_| ProgressStyle::default_bar());
    bar.set_style(style);
    bar
}

/// 前台运行单个链接，进度条从任务表读取
async fn run_foreground(controller: Arc<DownloadController>, args: &Cli, url: String) -> Result<()> {
    let request = DownloadRequest {
        url,
        limit: args.limit,
        format: args.format,
        quality: args.quality,
        output_dir: args.output_dir.clone(),
    };

    log_step!("获取曲目列表并搜索下载地址");
    let task_id = controller.submit_single(request).await?;

    let store = controller.store().clone();
    if let Some(snapshot) = store.get(&task_id).await {
        PrettyLogger::source_info(&snapshot.original_url, snapshot.total);
    }
    let bar = progress_bar(0);
    let snapshot = loop {
        let Some(snapshot) = store.get(&task_id).await else {
            return Err(format!("任务 {} 不存在", task_id).into());
        };
        bar.set_length(snapshot.total as u64);
        bar.set_position(snapshot.completed as u64);
        bar.set_message(snapshot.status.to_string());

        if snapshot.status.is_terminal() {
            break snapshot;
        }
        tokio::time::sleep(Duration::from_millis(200)).await;
    };
    bar.finish_and_clear();

    report(&snapshot, controller.cancel_token().is_cancelled());
    match snapshot.status {
        TaskStatus::Completed => Ok(()),
        _ => Err(snapshot.error.unwrap_or_else(|| "下载失败".to_string()).into()),
    }
}

fn report(snapshot: &TaskSnapshot, interrupted: bool) {
    PrettyLogger::separator();
    if interrupted {
        log_warning!("下载被用户中断");
    }
    if let Some(dir) = snapshot.output_dir.as_ref() {
        PrettyLogger::file_info("保存位置", dir.display().to_string());
    }
    match snapshot.status {
        TaskStatus::Completed => {
            log_success!("共处理 {} 首歌曲", snapshot.total);
            PrettyLogger::completion_summary(vec![
                format!("任务: {}", snapshot.id),
                format!("进度: {}/{} ({}%)", snapshot.completed, snapshot.total, snapshot.progress),
            ]);
        }
        _ => {
            log_error!("{}", snapshot.error.as_deref().unwrap_or("下载失败"));
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    // 初始化日志
    let level = if args.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt().with_max_level(level).init();

    PrettyLogger::title("Spotify Downloader");

    let mut config = AppConfig::load(&args.config).map_err(|e| {
        error!("加载配置失败: {}", e);
        e
    })?;
    if let Some(workers) = args.workers {
        config.download = config.download.with_workers(workers);
    }
    config.server.port = args.port;
    debug!("下载配置: {:?}", config.download);

    let source = YtDlpSource::new();
    source.check_available().await?;

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("⏭️ 收到 Ctrl+C，正在停止...");
                cancel.cancel();
            }
        });
    }

    let catalog = SpotifyCatalog::new(config.credentials.clone())?;
    let tagger = MetadataTagger::default();
    let controller = Arc::new(DownloadController::new(
        TaskStore::new(),
        Arc::new(catalog),
        Arc::new(source),
        Some(Arc::new(tagger)),
        config.download.clone(),
        cancel,
    ));

    if args.serve {
        log_info!("以服务模式运行，端口 {}", config.server.port);
        serve(controller, &config).await?;
        return Ok(());
    }

    let Some(url) = args.url.clone() else {
        return Err("请提供专辑或歌单链接".into());
    };
    info!("开始下载: {}", url);
    run_foreground(controller, &args, url).await?;
    info!("{}", "全部完成！".green());
    Ok(())
}

#[cfg(feature = "http")]
async fn serve(controller: Arc<DownloadController>, config: &AppConfig) -> Result<()> {
    spotify_downloader::server::serve(controller, &config.server).await?;
    Ok(())
}

#[cfg(not(feature = "http"))]
async fn serve(_controller: Arc<DownloadController>, _config: &AppConfig) -> Result<()> {
    Err("未启用 http 功能，无法以服务模式运行".into())
}
