//! 批量申请处理器 - 编排层
//!
//! ## 职责
//!
//! 本模块是整个应用的入口，负责批量职位申请的调度和资源管理。
//!
//! ## 核心功能
//!
//! 1. **应用初始化**：日志文件、加载资料和答案配置、打开浏览器
//! 2. **批量加载**：读取职位列表，过滤已投递的职位，按今日剩余额度截断
//! 3. **并发控制**：使用 Semaphore 限制同时运行的会话数
//! 4. **分批处理**：每批完成后再开始下一批
//! 5. **资源管理**：持有 Browser，每个会话使用独立的标签页
//! 6. **全局统计**：汇总所有会话的结果

use anyhow::Result;
use chromiumoxide::Browser;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

use crate::browser;
use crate::config::Config;
use crate::error::FormError;
use crate::infrastructure::JsExecutor;
use crate::models::{load_jobs, load_profile, load_resolver_config, JobRef};
use crate::services::{AnswerResolver, GenerativeAnswerer, LlmService, Outcome, OutcomeStore};
use crate::utils::logging::{
    init_log_file, log_batch_complete, log_batch_start, log_jobs_loaded, log_startup,
    print_final_stats,
};
use crate::workflow::{ApplicationFlow, CancelFlag, ConsoleReview, ReviewSurface};

/// 应用主结构
pub struct App {
    config: Config,
    browser: Browser,
    store: Arc<OutcomeStore>,
    flow: Arc<ApplicationFlow>,
    cancel: CancelFlag,
}

impl App {
    /// 初始化应用
    pub async fn initialize(config: Config, cancel: CancelFlag) -> Result<Self> {
        init_log_file(&config.output_log_file)?;
        log_startup(config.effective_concurrency(), config.review_enabled);

        let profile = Arc::new(load_profile(&config.profile_file).await?);
        let rules = Arc::new(load_resolver_config(&config.answers_file).await?);

        let generator: Option<Arc<dyn GenerativeAnswerer>> = if config.llm_api_key.is_empty() {
            warn!("⚠️ 未配置 LLM_API_KEY，跳过生成式回答");
            None
        } else {
            Some(Arc::new(LlmService::new(&config)))
        };
        let resolver = Arc::new(AnswerResolver::new(
            rules,
            profile.clone(),
            generator,
            config.generative_timeout(),
        ));

        let review: Option<Arc<dyn ReviewSurface>> = if config.review_enabled {
            Some(Arc::new(ConsoleReview::new()))
        } else {
            None
        };

        let store = Arc::new(OutcomeStore::new(config.store_file.clone()));
        let flow = Arc::new(ApplicationFlow::new(
            &config,
            resolver,
            profile,
            store.clone(),
            review,
            cancel.clone(),
        ));

        let browser = browser::open_browser(&config).await?;

        Ok(Self {
            config,
            browser,
            store,
            flow,
            cancel,
        })
    }

    /// 运行应用主逻辑
    pub async fn run(&self) -> Result<()> {
        let jobs = self.load_jobs().await?;

        if jobs.is_empty() {
            warn!("⚠️ 没有需要申请的职位，程序结束");
            return Ok(());
        }

        let stats = self.process_all_jobs(jobs).await?;

        print_final_stats(
            stats.success,
            stats.failed,
            stats.total,
            &self.config.output_log_file,
        );
        Ok(())
    }

    /// 加载职位：去掉已投递的，再按今日剩余额度截断
    async fn load_jobs(&self) -> Result<Vec<JobRef>> {
        info!("\n📁 正在读取职位列表...");
        let all_jobs = load_jobs(&self.config.jobs_file).await?;

        let mut pending = Vec::with_capacity(all_jobs.len());
        let mut skipped = 0;
        for job in all_jobs {
            if self.store.has_applied(&job).await? {
                skipped += 1;
            } else {
                pending.push(job);
            }
        }

        let used = self.store.submitted_today().await?;
        let remaining = self.config.max_applications_per_day.saturating_sub(used);
        log_jobs_loaded(pending.len(), skipped, remaining);
        if pending.len() > remaining {
            warn!("⚠️ 今日剩余额度 {}，超出的职位留到明天", remaining);
            pending.truncate(remaining);
        }
        Ok(pending)
    }

    /// 处理所有职位
    async fn process_all_jobs(&self, jobs: Vec<JobRef>) -> Result<ProcessingStats> {
        let concurrency = self.config.effective_concurrency();
        let semaphore = Arc::new(Semaphore::new(concurrency));
        let total_jobs = jobs.len();
        let mut stats = ProcessingStats {
            total: total_jobs,
            ..Default::default()
        };

        let total_batches = total_jobs.div_ceil(concurrency);
        for (batch_idx, batch_jobs) in jobs.chunks(concurrency).enumerate() {
            if self.cancel.is_cancelled() {
                warn!("⏹️ 已取消，剩余 {} 个职位不再处理", total_jobs - stats.processed());
                break;
            }
            let batch_start = batch_idx * concurrency;
            let batch_num = batch_idx + 1;

            log_batch_start(
                batch_num,
                total_batches,
                batch_start + 1,
                batch_start + batch_jobs.len(),
                total_jobs,
            );

            let batch_result = self
                .process_batch(batch_jobs, batch_start, semaphore.clone())
                .await?;

            stats.success += batch_result.success;
            stats.failed += batch_result.failed;

            log_batch_complete(
                batch_num,
                batch_result.success,
                batch_result.success + batch_result.failed,
            );

            if batch_result.budget_exhausted {
                warn!("⛔ 今日额度已用完，停止处理");
                break;
            }
        }

        Ok(stats)
    }

    /// 处理单个批次，每个会话一个新标签页
    async fn process_batch(
        &self,
        batch_jobs: &[JobRef],
        batch_start: usize,
        semaphore: Arc<Semaphore>,
    ) -> Result<BatchResult> {
        let mut batch_handles = Vec::new();

        for (idx, job) in batch_jobs.iter().enumerate() {
            let tag = batch_start + idx + 1;
            let permit = semaphore.clone().acquire_owned().await?;

            let page = self.browser.new_page("about:blank").await?;
            let executor = JsExecutor::new(page);
            let flow = self.flow.clone();
            let job = job.clone();

            let handle = tokio::spawn(async move {
                let _permit = permit;
                let result = flow.run(&executor, job, tag).await;
                if let Err(e) = executor.page().clone().close().await {
                    warn!("[会话 {}] 关闭标签页失败: {}", tag, e);
                }
                result
            });
            batch_handles.push((tag, handle));
        }

        let mut result = BatchResult::default();

        for (tag, handle) in batch_handles {
            match handle.await {
                Ok(Ok(record)) if record.outcome == Outcome::Submitted => {
                    result.success += 1;
                }
                Ok(Ok(record)) => {
                    info!("[会话 {}] 结果: {:?}", tag, record.outcome);
                    result.failed += 1;
                }
                Ok(Err(e)) => {
                    if let Some(FormError::BudgetExhausted { .. }) = e.downcast_ref::<FormError>() {
                        result.budget_exhausted = true;
                    }
                    warn!("[会话 {}] 未完成: {}", tag, e);
                    result.failed += 1;
                }
                Err(e) => {
                    error!("[会话 {}] 任务执行失败: {}", tag, e);
                    result.failed += 1;
                }
            }
        }

        Ok(result)
    }
}

/// 处理统计
#[derive(Debug, Default)]
struct ProcessingStats {
    success: usize,
    failed: usize,
    total: usize,
}

impl ProcessingStats {
    fn processed(&self) -> usize {
        self.success + self.failed
    }
}

/// 批次处理结果
#[derive(Debug, Default)]
struct BatchResult {
    success: usize,
    failed: usize,
    budget_exhausted: bool,
}
