use chrono::Local;
use log::{Level, LevelFilter};
use serde::{Deserialize, Serialize};
/// 统一日志管理模块
/// 控制台日志走 log + env_logger，执行审计日志按订阅落盘
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::core::error::{AutomationError, AutomationResult};

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub root_dir: String,
    pub default_level: String,
    pub max_file_size_mb: u64,
    pub console_output: bool,
    pub audit: bool,
    pub format: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            root_dir: "logs".to_string(),
            default_level: "INFO".to_string(),
            max_file_size_mb: 10,
            console_output: true,
            audit: false,
            format: "[{timestamp}] [{level}] [{module}] {message}".to_string(),
        }
    }
}

impl LogConfig {
    /// 获取日志级别
    pub fn level_filter(&self) -> LevelFilter {
        match self.default_level.to_uppercase().as_str() {
            "TRACE" => LevelFilter::Trace,
            "DEBUG" => LevelFilter::Debug,
            "INFO" => LevelFilter::Info,
            "WARN" => LevelFilter::Warn,
            "ERROR" => LevelFilter::Error,
            "OFF" => LevelFilter::Off,
            _ => LevelFilter::Info,
        }
    }

    fn render(&self, level: Level, module: &str, message: &str) -> String {
        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
        self.format
            .replace("{timestamp}", &timestamp.to_string())
            .replace("{level}", &level.to_string())
            .replace("{module}", module)
            .replace("{message}", message)
    }
}

/// 初始化控制台日志，RUST_LOG 优先于配置
pub fn init_logger(config: &LogConfig) {
    let env = env_logger::Env::default().filter_or("RUST_LOG", config.default_level.as_str());
    let format_config = config.clone();

    let _ = env_logger::Builder::from_env(env)
        .format(move |buf, record| {
            writeln!(
                buf,
                "{}",
                format_config.render(record.level(), record.target(), &record.args().to_string())
            )
        })
        .try_init();
}

/// 订阅执行审计日志
///
/// 每次执行尝试追加一行到 `{root_dir}/subscriptions/sub_{id}_{YYYYMMDD}.log`，
/// 超过大小上限时轮转。
pub struct AuditLogger {
    config: LogConfig,
    write_guard: Mutex<()>,
}

impl AuditLogger {
    pub fn new(config: LogConfig) -> AutomationResult<Self> {
        let dir = format!("{}/subscriptions", config.root_dir);
        if !Path::new(&dir).exists() {
            fs::create_dir_all(&dir)?;
        }

        Ok(Self {
            config,
            write_guard: Mutex::new(()),
        })
    }

    /// 获取订阅的审计日志路径
    pub fn sub_log_path(&self, sub_id: u64) -> PathBuf {
        let date = Local::now().format("%Y%m%d");
        PathBuf::from(format!(
            "{}/subscriptions/sub_{}_{}.log",
            self.config.root_dir, sub_id, date
        ))
    }

    /// 写入一条审计记录
    pub fn record(&self, sub_id: u64, level: Level, message: &str) -> AutomationResult<()> {
        let _guard = crate::safe_lock!(self.write_guard)?;

        let formatted = self
            .config
            .render(level, &format!("sub_{}", sub_id), message);
        let path = self.sub_log_path(sub_id);
        self.write_to_file(&path, &formatted)
    }

    fn write_to_file(&self, path: &Path, content: &str) -> AutomationResult<()> {
        if path.exists() {
            let size_mb = fs::metadata(path)?.len() / (1024 * 1024);
            if size_mb >= self.config.max_file_size_mb {
                self.rotate_log_file(path)?;
            }
        }

        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        writeln!(file, "{}", content)?;
        file.flush()?;
        Ok(())
    }

    /// 轮转日志文件
    fn rotate_log_file(&self, path: &Path) -> AutomationResult<()> {
        let timestamp = Local::now().format("%Y%m%d_%H%M%S");
        let parent = path
            .parent()
            .ok_or_else(|| AutomationError::Internal("日志路径缺少父目录".to_string()))?;
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| AutomationError::Internal("日志文件名无效".to_string()))?;

        let new_path = parent.join(format!("{}_{}_rotated.log", stem, timestamp));
        fs::rename(path, new_path)?;
        Ok(())
    }
}

// 日志文件命名规范：
// - 审计日志: logs/subscriptions/sub_{订阅ID}_{YYYYMMDD}.log
// - 轮转日志: logs/subscriptions/sub_{订阅ID}_{YYYYMMDD}_{YYYYMMDD_HHMMSS}_rotated.log

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_filter() {
        let mut config = LogConfig::default();
        assert_eq!(config.level_filter(), LevelFilter::Info);
        config.default_level = "debug".to_string();
        assert_eq!(config.level_filter(), LevelFilter::Debug);
        config.default_level = "verbose".to_string();
        assert_eq!(config.level_filter(), LevelFilter::Info);
    }

    #[test]
    fn test_audit_record_appends_line() {
        let root = std::env::temp_dir().join(format!("rustauto_audit_{}", std::process::id()));
        let config = LogConfig {
            root_dir: root.to_string_lossy().to_string(),
            ..LogConfig::default()
        };
        let audit = AuditLogger::new(config).unwrap();

        audit.record(7, Level::Info, "执行成功").unwrap();
        audit.record(7, Level::Warn, "触发条件未满足").unwrap();

        let contents = fs::read_to_string(audit.sub_log_path(7)).unwrap();
        assert_eq!(contents.lines().count(), 2);
        assert!(contents.contains("[sub_7]"));

        let _ = fs::remove_dir_all(root);
    }
}
