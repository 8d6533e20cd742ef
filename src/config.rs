use std::path::PathBuf;
use std::time::Duration;

/// 程序配置
#[derive(Clone, Debug)]
pub struct Config {
    /// 同时运行的申请会话数量
    pub max_concurrent_sessions: usize,
    /// 浏览器调试端口（设置后连接已有浏览器，否则自行启动）
    pub browser_debug_port: Option<u16>,
    /// 自行启动浏览器时是否无头
    pub headless: bool,
    /// 浏览器可执行文件路径（可选）
    pub chrome_executable: Option<PathBuf>,
    /// 待申请职位列表（TOML）
    pub jobs_file: PathBuf,
    /// 申请人资料（JSON）
    pub profile_file: PathBuf,
    /// 预设答案与类别关键词（TOML）
    pub answers_file: PathBuf,
    /// 简历 PDF 路径（可选）
    pub resume_path: Option<PathBuf>,
    /// 审计记录文件（JSON Lines，只追加）
    pub store_file: PathBuf,
    /// 截图证据目录
    pub screenshot_dir: PathBuf,
    /// 提交前是否人工审核
    pub review_enabled: bool,
    /// 审核最多轮数
    pub review_max_rounds: usize,
    /// 每日最多提交数量
    pub max_applications_per_day: usize,
    /// 会话失败后的最多重试次数
    pub max_session_retries: usize,
    /// 下拉菜单展开后的等待时间
    pub menu_settle_ms: u64,
    /// 点击后的等待时间
    pub click_settle_ms: u64,
    /// 提交后的等待时间
    pub submit_settle_ms: u64,
    /// 生成式回答超时
    pub generative_timeout_secs: u64,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    /// 输出日志文件
    pub output_log_file: String,
    // --- LLM 配置 ---
    pub llm_api_key: String,
    pub llm_api_base_url: String,
    pub llm_model_name: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_concurrent_sessions: 2,
            browser_debug_port: None,
            headless: true,
            chrome_executable: None,
            jobs_file: PathBuf::from("jobs.toml"),
            profile_file: PathBuf::from("user_data.json"),
            answers_file: PathBuf::from("answers.toml"),
            resume_path: None,
            store_file: PathBuf::from("applications.jsonl"),
            screenshot_dir: PathBuf::from("screenshots"),
            review_enabled: true,
            review_max_rounds: 5,
            max_applications_per_day: 10,
            max_session_retries: 1,
            menu_settle_ms: 600,
            click_settle_ms: 400,
            submit_settle_ms: 3000,
            generative_timeout_secs: 30,
            verbose_logging: false,
            output_log_file: "output.txt".to_string(),
            llm_api_key: String::new(),
            llm_api_base_url: "https://api.openai.com/v1".to_string(),
            llm_model_name: "gpt-4o-mini".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            max_concurrent_sessions: env_parse("MAX_CONCURRENT_SESSIONS").unwrap_or(default.max_concurrent_sessions),
            browser_debug_port: env_parse("BROWSER_DEBUG_PORT").or(default.browser_debug_port),
            headless: env_parse("HEADLESS").unwrap_or(default.headless),
            chrome_executable: std::env::var("CHROME_EXECUTABLE").ok().map(PathBuf::from).or(default.chrome_executable),
            jobs_file: env_path("JOBS_FILE").unwrap_or(default.jobs_file),
            profile_file: env_path("PROFILE_FILE").unwrap_or(default.profile_file),
            answers_file: env_path("ANSWERS_FILE").unwrap_or(default.answers_file),
            resume_path: env_path("RESUME_PATH").or(default.resume_path),
            store_file: env_path("STORE_FILE").unwrap_or(default.store_file),
            screenshot_dir: env_path("SCREENSHOT_DIR").unwrap_or(default.screenshot_dir),
            review_enabled: env_parse("REVIEW_ENABLED").unwrap_or(default.review_enabled),
            review_max_rounds: env_parse("REVIEW_MAX_ROUNDS").unwrap_or(default.review_max_rounds),
            max_applications_per_day: env_parse("MAX_APPLICATIONS_PER_DAY").unwrap_or(default.max_applications_per_day),
            max_session_retries: env_parse("MAX_SESSION_RETRIES").unwrap_or(default.max_session_retries),
            menu_settle_ms: env_parse("MENU_SETTLE_MS").unwrap_or(default.menu_settle_ms),
            click_settle_ms: env_parse("CLICK_SETTLE_MS").unwrap_or(default.click_settle_ms),
            submit_settle_ms: env_parse("SUBMIT_SETTLE_MS").unwrap_or(default.submit_settle_ms),
            generative_timeout_secs: env_parse("GENERATIVE_TIMEOUT_SECS").unwrap_or(default.generative_timeout_secs),
            verbose_logging: env_parse("VERBOSE_LOGGING").unwrap_or(default.verbose_logging),
            output_log_file: std::env::var("OUTPUT_LOG_FILE").unwrap_or(default.output_log_file),
            llm_api_key: std::env::var("LLM_API_KEY")
                .or_else(|_| std::env::var("OPENAI_API_KEY"))
                .unwrap_or(default.llm_api_key),
            llm_api_base_url: std::env::var("LLM_API_BASE_URL").unwrap_or(default.llm_api_base_url),
            llm_model_name: std::env::var("LLM_MODEL_NAME").unwrap_or(default.llm_model_name),
        }
    }

    /// 固定等待时间
    pub fn settle(&self) -> SettleTimings {
        SettleTimings {
            menu: Duration::from_millis(self.menu_settle_ms),
            click: Duration::from_millis(self.click_settle_ms),
            submit: Duration::from_millis(self.submit_settle_ms),
        }
    }

    pub fn generative_timeout(&self) -> Duration {
        Duration::from_secs(self.generative_timeout_secs)
    }

    /// 控制台审核会独占标准输入，开启时只能串行
    pub fn effective_concurrency(&self) -> usize {
        if self.review_enabled {
            1
        } else {
            self.max_concurrent_sessions.max(1)
        }
    }
}

/// 所有交互等待都是固定时长，不做自适应轮询
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SettleTimings {
    pub menu: Duration,
    pub click: Duration,
    pub submit: Duration,
}

impl SettleTimings {
    /// 测试用：不等待
    pub fn instant() -> Self {
        Self {
            menu: Duration::ZERO,
            click: Duration::ZERO,
            submit: Duration::ZERO,
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

fn env_path(key: &str) -> Option<PathBuf> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty()).map(PathBuf::from)
}
