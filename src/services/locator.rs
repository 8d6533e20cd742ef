//! 定位策略表
//!
//! 每张表按优先级排列，调用方依次尝试，第一条返回可用元素的策略胜出。
//! 新站点的写法只需要在表里加一行，不写站点特判。

use anyhow::Result;

use crate::infrastructure::{FormPage, LocatorStrategy};

/// 伪下拉框的触发器
pub const TRIGGER_STRATEGIES: &[LocatorStrategy] = &[
    LocatorStrategy {
        name: "sibling-toggle",
        extract: r#"(el.closest('[class*="select__control"], [class*="select-shell"]') || el.parentElement).querySelector('[class*="indicator"], [class*="toggle"], [class*="arrow"], button')"#,
        predicate: "t !== el",
    },
    LocatorStrategy {
        name: "role-correlated",
        extract: r#"el.closest('[role="combobox"]') || (token ? document.querySelector('[role="combobox"][aria-controls="' + token + '"]') : null)"#,
        predicate: "true",
    },
    LocatorStrategy {
        name: "ancestor-container",
        extract: r#"el.closest('[class*="select__control"], [class*="select-shell"], [class*="select__container"], [class*="dropdown"]')"#,
        predicate: "true",
    },
    LocatorStrategy {
        name: "control",
        extract: "el",
        predicate: "true",
    },
];

/// 菜单：先用作用域标记精确定位，最后才按位置兜底
pub const MENU_STRATEGIES: &[LocatorStrategy] = &[
    LocatorStrategy {
        name: "scope-id",
        extract: "token ? document.getElementById(token) : null",
        predicate: "t !== el",
    },
    LocatorStrategy {
        name: "listbox-suffix",
        extract: "token ? document.getElementById(token + '-listbox') : null",
        predicate: "true",
    },
    LocatorStrategy {
        name: "labelledby",
        extract: r#"el.id ? document.querySelector('[role="listbox"][aria-labelledby~="' + el.id + '"]') : null"#,
        predicate: "true",
    },
    LocatorStrategy {
        name: "field-container",
        extract: r#"(el.closest('.field, .form-field, [class*="select__container"], [class*="select-shell"]') || el.parentElement).querySelector('[role="listbox"], [class*="select__menu"], [class*="menu"]')"#,
        predicate: "true",
    },
    LocatorStrategy {
        name: "single-visible-menu",
        extract: r#"(() => { const menus = Array.from(document.querySelectorAll('[role="listbox"], [class*="select__menu"]')).filter(m => m.offsetWidth || m.offsetHeight); return menus.length === 1 ? menus[0] : null; })()"#,
        predicate: "true",
    },
];

/// 菜单内选项的选择器，依次尝试
pub const OPTION_SELECTORS: &[&str] = &[
    r#"[role="option"]"#,
    r#"[class*="select__option"]"#,
    r#"[class*="option"]"#,
    "li",
];

pub const SUBMIT_SELECTORS: &[&str] = &[
    "#submit_app",
    r#"button[type="submit"]"#,
    r#"input[type="submit"]"#,
    r#"[data-qa="btn-submit"]"#,
];

pub const SUBMIT_TEXTS: &[&str] = &["submit application", "submit"];

pub const APPLY_TEXTS: &[&str] = &["apply for this job", "apply now", "apply"];

/// 依次尝试策略，返回第一个命中的选择器和策略名
pub async fn first_match(
    page: &dyn FormPage,
    anchor: &str,
    token: Option<&str>,
    strategies: &[LocatorStrategy],
) -> Result<Option<(String, &'static str)>> {
    for strategy in strategies {
        if let Some(selector) = page.locate(anchor, token, strategy).await? {
            return Ok(Some((selector, strategy.name)));
        }
    }
    Ok(None)
}
