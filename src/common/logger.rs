use colored::*;

const TITLE_WIDTH: usize = 48;

/// 命令行模式下的彩色输出；后台服务只走 tracing
pub struct PrettyLogger;

impl PrettyLogger {
    fn mark(symbol: ColoredString, message: &str) {
        println!("{} {}", symbol, message);
    }

    pub fn success(message: impl AsRef<str>) {
        Self::mark("✓".green().bold(), message.as_ref());
    }

    pub fn info(message: impl AsRef<str>) {
        Self::mark("ℹ".blue().bold(), message.as_ref());
    }

    pub fn warning(message: impl AsRef<str>) {
        Self::mark("⚠".yellow().bold(), message.as_ref());
    }

    pub fn error(message: impl AsRef<str>) {
        Self::mark("✗".red().bold(), message.as_ref());
    }

    // 阶段标题前空一行
    pub fn step_start(step: impl AsRef<str>) {
        println!();
        Self::mark("▶".cyan().bold(), &step.as_ref().bold().to_string());
    }

    pub fn file_info(label: impl AsRef<str>, path: impl AsRef<str>) {
        println!("{} {}: {}", "📁".blue().bold(), label.as_ref().bold(), path.as_ref());
    }

    /// 歌单/专辑名与找到的歌曲数
    pub fn source_info(name: impl AsRef<str>, count: usize) {
        println!(
            "{} {} ({} 首)",
            "🎵".magenta().bold(),
            name.as_ref().bold(),
            count.to_string().cyan()
        );
    }

    pub fn separator() {
        println!("{}", "─".repeat(TITLE_WIDTH + 2).bright_black());
    }

    /// 居中的标题，按字符数计算宽度
    pub fn title(text: impl AsRef<str>) {
        let text = text.as_ref();
        let width = text.chars().count().min(TITLE_WIDTH);
        let left = (TITLE_WIDTH - width) / 2;
        let right = TITLE_WIDTH - left - width;
        println!(
            "{} {} {}",
            "─".repeat(left).bright_black(),
            text.bold(),
            "─".repeat(right).bright_black()
        );
    }

    pub fn completion_summary(lines: Vec<impl AsRef<str>>) {
        println!("\n{}", "🎉 下载完成！".green().bold());
        for line in lines {
            println!("  {}", line.as_ref());
        }
    }
}

#[macro_export]
macro_rules! log_success {
    ($($arg:tt)*) => {
        $crate::common::logger::PrettyLogger::success(format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        $crate::common::logger::PrettyLogger::info(format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_warning {
    ($($arg:tt)*) => {
        $crate::common::logger::PrettyLogger::warning(format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        $crate::common::logger::PrettyLogger::error(format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_step {
    ($($arg:tt)*) => {
        $crate::common::logger::PrettyLogger::step_start(format!($($arg)*))
    };
}
