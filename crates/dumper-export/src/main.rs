use std::env;
use std::error::Error;
use std::io::stderr;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use tracing_appender::{
    non_blocking,
    non_blocking::WorkerGuard,
    rolling::{RollingFileAppender, Rotation},
};
use tracing_subscriber::{EnvFilter, fmt::layer, layer::SubscriberExt, util::SubscriberInitExt};

use dumper_core::{ExportConfig, ExportError};

const USAGE: &str = "用法: dumper-export [--config <FILE>] [--source <DB>] [--output <FILE>]";

/// 命令行参数，未指定时沿用配置文件或默认值
#[derive(Debug, Default, PartialEq)]
struct Args {
    help: bool,
    config: Option<PathBuf>,
    source: Option<PathBuf>,
    output: Option<PathBuf>,
}

fn parse_args(args: &[String]) -> Result<Args, String> {
    let mut parsed = Args::default();
    let mut iter = args.iter().skip(1);
    while let Some(arg) = iter.next() {
        let slot = match arg.as_str() {
            "-h" | "--help" => {
                parsed.help = true;
                continue;
            }
            "--config" => &mut parsed.config,
            "--source" => &mut parsed.source,
            "--output" => &mut parsed.output,
            other => return Err(format!("未知参数: {}", other)),
        };
        match iter.next() {
            Some(value) => *slot = Some(PathBuf::from(value)),
            None => return Err(format!("参数 {} 缺少取值", arg)),
        }
    }
    Ok(parsed)
}

/// 配置文件 < 命令行参数
fn load_config(args: &Args) -> Result<ExportConfig, ExportError> {
    let mut config = match &args.config {
        Some(path) => ExportConfig::load(path)?,
        None => ExportConfig::default(),
    };
    if let Some(source) = &args.source {
        config.source = source.clone();
    }
    if let Some(output) = &args.output {
        config.output = output.clone();
    }
    Ok(config)
}

/// 初始化日志：stderr + 按天滚动的日志文件，stdout 只留给完成提示
fn init_logging(log_dir: &Path) -> Vec<WorkerGuard> {
    let log_level = if cfg!(debug_assertions) { "debug" } else { "info" };

    let (stderr_writer, stderr_guard) = non_blocking(stderr());
    let mut guards = vec![stderr_guard];

    let file_layer = match RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("dumper")
        .filename_suffix("log")
        .build(log_dir)
    {
        Ok(appender) => {
            let (file_writer, file_guard) = non_blocking(appender);
            guards.push(file_guard);
            Some(layer().with_writer(file_writer).with_ansi(false))
        }
        Err(err) => {
            eprintln!("无法创建日志文件 {}: {}", log_dir.display(), err);
            None
        }
    };

    tracing_subscriber::registry()
        .with(EnvFilter::new(log_level))
        .with(layer().with_writer(stderr_writer))
        .with(file_layer)
        .init();

    guards
}

fn print_error(err: &dyn Error) {
    eprintln!("error: {}", err);
    let mut source = err.source();
    while let Some(cause) = source {
        eprintln!("  caused by: {}", cause);
        source = cause.source();
    }
}

fn main() -> ExitCode {
    // 1. 解析命令行参数
    let args: Vec<String> = env::args().collect();
    let args = match parse_args(&args) {
        Ok(args) => args,
        Err(msg) => {
            eprintln!("{}", msg);
            eprintln!("{}", USAGE);
            return ExitCode::from(2);
        }
    };
    if args.help {
        println!("{}", USAGE);
        return ExitCode::SUCCESS;
    }

    // 2. 读取配置
    let config = match load_config(&args) {
        Ok(config) => config,
        Err(err) => {
            print_error(&err);
            return ExitCode::FAILURE;
        }
    };

    // 3. 初始化日志系统，guard 存活到 main 结束以刷新缓冲
    let _log_guards = init_logging(&config.log_dir());
    tracing::info!("导出进程启动");

    // 4. 执行导出
    match dumper_core::run(&config) {
        Ok(stats) => {
            tracing::info!("{:?}", stats);
            println!("{} created.", config.output.display());
            ExitCode::SUCCESS
        }
        Err(err) => {
            tracing::error!("导出失败: {}", err);
            print_error(&err);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        std::iter::once("dumper-export")
            .chain(list.iter().copied())
            .map(String::from)
            .collect()
    }

    #[test]
    fn no_arguments_means_defaults() {
        let parsed = parse_args(&args(&[])).unwrap();
        assert_eq!(parsed, Args::default());

        let config = load_config(&parsed).unwrap();
        assert_eq!(config, ExportConfig::default());
    }

    #[test]
    fn flags_override_paths() {
        let parsed = parse_args(&args(&["--source", "app.db", "--output", "out.sql"])).unwrap();
        let config = load_config(&parsed).unwrap();
        assert_eq!(config.source, PathBuf::from("app.db"));
        assert_eq!(config.output, PathBuf::from("out.sql"));
    }

    #[test]
    fn unknown_flag_is_rejected() {
        assert!(parse_args(&args(&["--verbose"])).is_err());
    }

    #[test]
    fn flag_without_value_is_rejected() {
        assert!(parse_args(&args(&["--output"])).is_err());
    }

    #[test]
    fn help_flag() {
        assert!(parse_args(&args(&["-h"])).unwrap().help);
    }

    #[test]
    fn missing_config_file_fails() {
        let parsed = parse_args(&args(&["--config", "/nonexistent/dumper.json"])).unwrap();
        assert!(matches!(load_config(&parsed), Err(ExportError::Config { .. })));
    }
}
