use clap::Parser;
use std::path::PathBuf;

use crate::common::models::{AudioFormat, AudioQuality};

/// Spotify 歌单/专辑下载器
#[derive(Parser, Debug)]
#[command(name = "spotdl")]
#[command(version = "1.0")]
#[command(about = "把 Spotify 歌单、专辑下载为带标签的音频文件", long_about = None)]
pub struct Cli {
    /// 专辑或歌单链接，"liked" 表示我喜欢的音乐
    #[arg(value_name = "URL")]
    #[arg(value_hint = clap::ValueHint::Url)]
    #[arg(required_unless_present = "serve")]
    pub url: Option<String>,

    /// 最多下载的歌曲数量
    #[arg(short, long, value_name = "N")]
    pub limit: Option<usize>,

    /// 音频格式
    #[arg(short, long, value_enum, default_value_t = AudioFormat::Mp3)]
    pub format: AudioFormat,

    /// 音质 (kbps)
    #[arg(short, long, default_value = "192")]
    #[arg(help = "音质: 128 / 192 / 256 / 320 (kbps)")]
    pub quality: AudioQuality,

    /// 保存目录，默认使用专辑/歌单名称
    #[arg(short, long, value_name = "DIR")]
    #[arg(value_hint = clap::ValueHint::DirPath)]
    pub output_dir: Option<PathBuf>,

    /// 并发下载数，默认 min(CPU 核数, 5)
    #[arg(long, value_name = "并发数")]
    pub workers: Option<usize>,

    /// 以 HTTP 服务方式运行
    #[arg(long)]
    pub serve: bool,

    /// HTTP 服务端口
    #[arg(long, default_value_t = 5001)]
    pub port: u16,

    /// 配置文件路径
    #[arg(long, value_name = "FILE", default_value = "config.json")]
    #[arg(value_hint = clap::ValueHint::FilePath)]
    pub config: PathBuf,

    /// 输出调试日志
    #[arg(long)]
    pub verbose: bool,
}
