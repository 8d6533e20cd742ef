//! 测试用的内存表单
//!
//! 只认 `[id="..."]` 形式的定位符；伪下拉框只支持 "control" 触发器和 "scope-id" 菜单，
//! 其余策略一律返回未命中，正好覆盖按优先级回落的路径。

#![allow(dead_code)]

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use ats_autofill::infrastructure::{ControlProbe, FormPage, LocatorStrategy};
use ats_autofill::models::{ApplicantProfile, JobRef};
use ats_autofill::services::{GenerativeAnswerer, GenerativeRequest};

const OPTION_SELECTOR: &str = r#"[role="option"]"#;

#[derive(Debug, Clone)]
pub struct FakeControl {
    pub probe: ControlProbe,
    pub value: Option<String>,
    /// 伪下拉框菜单里的选项
    pub menu: Vec<String>,
    /// 选中某个值后出现的新控件
    pub reveals: Option<(String, ControlProbe)>,
}

impl FakeControl {
    pub fn text(id: &str, label: &str) -> Self {
        Self::from_probe(ControlProbe {
            tag: "input".into(),
            input_type: "text".into(),
            id: id.into(),
            label: label.into(),
            visible: true,
            ..Default::default()
        })
    }

    pub fn textarea(id: &str, label: &str) -> Self {
        Self::from_probe(ControlProbe {
            tag: "textarea".into(),
            id: id.into(),
            label: label.into(),
            visible: true,
            ..Default::default()
        })
    }

    pub fn email(id: &str, label: &str) -> Self {
        let mut control = Self::text(id, label);
        control.probe.input_type = "email".into();
        control
    }

    pub fn native_select(id: &str, label: &str, options: &[&str]) -> Self {
        Self::from_probe(ControlProbe {
            tag: "select".into(),
            id: id.into(),
            label: label.into(),
            options: options.iter().map(|s| s.to_string()).collect(),
            visible: true,
            ..Default::default()
        })
    }

    /// combobox 输入框，菜单 id 为 `{id}-menu`
    pub fn pseudo_select(id: &str, label: &str, options: &[&str]) -> Self {
        let mut control = Self::from_probe(ControlProbe {
            tag: "input".into(),
            input_type: "text".into(),
            id: id.into(),
            role: "combobox".into(),
            aria_controls: format!("{}-menu", id),
            label: label.into(),
            visible: true,
            ..Default::default()
        });
        control.menu = options.iter().map(|s| s.to_string()).collect();
        control
    }

    pub fn required(mut self) -> Self {
        self.probe.required = true;
        self
    }

    pub fn revealing(mut self, on_value: &str, control: ControlProbe) -> Self {
        self.reveals = Some((on_value.to_string(), control));
        self
    }

    fn from_probe(probe: ControlProbe) -> Self {
        Self {
            probe,
            value: None,
            menu: Vec::new(),
            reveals: None,
        }
    }

    fn is_pseudo(&self) -> bool {
        !self.menu.is_empty()
    }
}

#[derive(Debug, Default)]
struct FakeState {
    controls: Vec<FakeControl>,
    open_menu: Option<usize>,
    /// id → 固定的回读值，模拟页面没有真正接受选择
    readback_override: HashMap<String, String>,
    /// 前几次找菜单时假装菜单还没渲染出来
    menu_misses: usize,
    has_submit: bool,
    body: String,
    body_after_submit: String,
    opened_urls: Vec<String>,
    submit_clicks: usize,
    uploads: Vec<PathBuf>,
    screenshots: Vec<PathBuf>,
}

/// 内存中的表单页面
#[derive(Debug, Clone, Default)]
pub struct FakeForm {
    state: Arc<Mutex<FakeState>>,
}

impl FakeForm {
    pub fn new(controls: Vec<FakeControl>) -> Self {
        let form = Self::default();
        {
            let mut state = form.state.lock().unwrap();
            state.controls = controls;
            state.has_submit = true;
            state.body = "Apply for this job".into();
        }
        form
    }

    pub fn after_submit(self, body: &str) -> Self {
        self.state.lock().unwrap().body_after_submit = body.to_string();
        self
    }

    pub fn readback_override(self, id: &str, value: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .readback_override
            .insert(id.to_string(), value.to_string());
        self
    }

    pub fn flaky_menu(self, misses: usize) -> Self {
        self.state.lock().unwrap().menu_misses = misses;
        self
    }

    pub fn value(&self, id: &str) -> Option<String> {
        let state = self.state.lock().unwrap();
        state
            .controls
            .iter()
            .find(|c| c.probe.id == id)
            .and_then(|c| c.value.clone())
    }

    pub fn submit_clicks(&self) -> usize {
        self.state.lock().unwrap().submit_clicks
    }

    pub fn opened_urls(&self) -> Vec<String> {
        self.state.lock().unwrap().opened_urls.clone()
    }

    pub fn screenshots(&self) -> Vec<PathBuf> {
        self.state.lock().unwrap().screenshots.clone()
    }

    fn index_of(state: &FakeState, selector: &str) -> Option<usize> {
        let id = selector.strip_prefix(r#"[id=""#)?.strip_suffix(r#""]"#)?;
        state.controls.iter().position(|c| c.probe.id == id)
    }

    fn menu_selector(control: &FakeControl) -> String {
        format!("#{}", control.probe.aria_controls)
    }
}

#[async_trait]
impl FormPage for FakeForm {
    async fn open(&self, url: &str) -> Result<()> {
        self.state.lock().unwrap().opened_urls.push(url.to_string());
        Ok(())
    }

    async fn probe_controls(&self) -> Result<Vec<ControlProbe>> {
        let state = self.state.lock().unwrap();
        Ok(state.controls.iter().map(|c| c.probe.clone()).collect())
    }

    async fn locate(
        &self,
        anchor: &str,
        token: Option<&str>,
        strategy: &LocatorStrategy,
    ) -> Result<Option<String>> {
        let mut state = self.state.lock().unwrap();
        let Some(index) = Self::index_of(&state, anchor) else {
            return Ok(None);
        };
        if strategy.name == "scope-id" && state.menu_misses > 0 {
            state.menu_misses -= 1;
            return Ok(None);
        }
        let control = &state.controls[index];
        let found = match strategy.name {
            "control" => Some(anchor.to_string()),
            "scope-id" => {
                let open = state.open_menu == Some(index);
                (open && token == Some(control.probe.aria_controls.as_str()))
                    .then(|| Self::menu_selector(control))
            }
            _ => None,
        };
        Ok(found)
    }

    async fn click(&self, selector: &str) -> Result<bool> {
        let mut state = self.state.lock().unwrap();
        if selector == "#submit_app" {
            if !state.has_submit {
                return Ok(false);
            }
            state.submit_clicks += 1;
            state.body = state.body_after_submit.clone();
            return Ok(true);
        }
        match Self::index_of(&state, selector) {
            Some(index) if state.controls[index].is_pseudo() => {
                state.open_menu = Some(index);
                Ok(true)
            }
            Some(_) => Ok(true),
            None => Ok(false),
        }
    }

    async fn fill(&self, selector: &str, value: &str) -> Result<bool> {
        let mut state = self.state.lock().unwrap();
        let Some(index) = Self::index_of(&state, selector) else {
            return Ok(false);
        };
        state.controls[index].value = Some(value.to_string());
        Ok(true)
    }

    async fn read_value(&self, selector: &str) -> Result<Option<String>> {
        let state = self.state.lock().unwrap();
        let Some(index) = Self::index_of(&state, selector) else {
            return Ok(None);
        };
        let control = &state.controls[index];
        if let Some(forced) = state.readback_override.get(&control.probe.id) {
            return Ok(Some(forced.clone()));
        }
        Ok(control.value.clone().filter(|v| !v.is_empty()))
    }

    async fn select_native(&self, selector: &str, option_text: &str) -> Result<bool> {
        let mut state = self.state.lock().unwrap();
        let Some(index) = Self::index_of(&state, selector) else {
            return Ok(false);
        };
        let control = &mut state.controls[index];
        if !control.probe.options.iter().any(|o| o == option_text) {
            return Ok(false);
        }
        control.value = Some(option_text.to_string());
        Ok(true)
    }

    async fn option_texts(&self, menu: &str, option_selector: &str) -> Result<Vec<String>> {
        let state = self.state.lock().unwrap();
        if option_selector != OPTION_SELECTOR {
            return Ok(Vec::new());
        }
        let options = state
            .open_menu
            .map(|i| &state.controls[i])
            .filter(|c| Self::menu_selector(c) == menu)
            .map(|c| c.menu.clone())
            .unwrap_or_default();
        Ok(options)
    }

    async fn click_option(&self, menu: &str, option_selector: &str, index: usize) -> Result<bool> {
        let mut state = self.state.lock().unwrap();
        let Some(open) = state.open_menu else {
            return Ok(false);
        };
        if option_selector != OPTION_SELECTOR || Self::menu_selector(&state.controls[open]) != menu {
            return Ok(false);
        }
        let Some(text) = state.controls[open].menu.get(index).cloned() else {
            return Ok(false);
        };
        state.controls[open].value = Some(text.clone());
        state.open_menu = None;

        if let Some((on_value, probe)) = state.controls[open].reveals.clone() {
            let already = state.controls.iter().any(|c| c.probe.id == probe.id);
            if on_value == text && !already {
                state.controls.insert(open + 1, FakeControl::from_probe(probe));
            }
        }
        Ok(true)
    }

    async fn notify_change(&self, _selector: &str) -> Result<()> {
        Ok(())
    }

    async fn read_committed(&self, selector: &str) -> Result<Option<String>> {
        self.read_value(selector).await
    }

    async fn dismiss(&self) -> Result<()> {
        self.state.lock().unwrap().open_menu = None;
        Ok(())
    }

    async fn upload_file(&self, _selector: &str, path: &Path) -> Result<bool> {
        self.state.lock().unwrap().uploads.push(path.to_path_buf());
        Ok(true)
    }

    async fn click_button_with_text(&self, _candidates: &[&str]) -> Result<bool> {
        Ok(false)
    }

    async fn body_text(&self) -> Result<String> {
        Ok(self.state.lock().unwrap().body.clone())
    }

    async fn screenshot(&self, path: &Path) -> Result<()> {
        self.state.lock().unwrap().screenshots.push(path.to_path_buf());
        Ok(())
    }
}

/// 固定回答的生成器
pub struct FixedAnswer(pub &'static str);

#[async_trait]
impl GenerativeAnswerer for FixedAnswer {
    async fn answer(&self, _request: &GenerativeRequest) -> Result<String> {
        Ok(self.0.to_string())
    }
}

/// 永远答不完的生成器
pub struct SlowAnswer(pub Duration);

#[async_trait]
impl GenerativeAnswerer for SlowAnswer {
    async fn answer(&self, _request: &GenerativeRequest) -> Result<String> {
        tokio::time::sleep(self.0).await;
        Ok("too late".to_string())
    }
}

pub fn profile() -> ApplicantProfile {
    let mut profile = ApplicantProfile::default();
    profile.contact.first_name = "Ada".into();
    profile.contact.last_name = "Lovelace".into();
    profile.contact.email = "ada@example.com".into();
    profile.education.school = "Texas A&M University".into();
    profile.work_authorization.authorized_to_work = Some(true);
    profile.work_authorization.require_visa_sponsorship = Some(false);
    profile
}

pub fn job(id: &str) -> JobRef {
    let mut job = JobRef::new(id, format!("https://boards.example.com/acme/jobs/{}", id));
    job.title = "Rust Engineer".into();
    job.company = "Acme".into();
    job
}
