//! 注入页面执行的 JS 片段
//!
//! 参数一律经 `serde_json::to_string` 转成 JS 字面量，避免引号注入。

use crate::infrastructure::form_page::LocatorStrategy;

fn lit(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "\"\"".to_string())
}

const HELPERS: &str = r#"
    const clean = (s) => (s || '').replace(/\s+/g, ' ').trim();
    const visible = (n) => !!(n && (n.offsetWidth || n.offsetHeight || n.getClientRects().length));
    const press = (n) => {
        n.scrollIntoView({ block: 'center' });
        for (const type of ['mousedown', 'mouseup', 'click']) {
            n.dispatchEvent(new MouseEvent(type, { bubbles: true, cancelable: true, view: window }));
        }
    };
"#;

/// 枚举表单控件
pub fn probe_controls() -> String {
    format!(
        r#"
        (() => {{
            {HELPERS}
            const byId = (id) => id ? document.getElementById(id) : null;
            const labelFor = (el) => {{
                if (el.id) {{
                    const l = document.querySelector('label[for="' + CSS.escape(el.id) + '"]');
                    if (l) return clean(l.innerText);
                }}
                const ids = el.getAttribute('aria-labelledby');
                if (ids) {{
                    const text = ids.split(/\s+/).map(byId).filter(Boolean).map(n => clean(n.innerText)).join(' ');
                    if (text) return text;
                }}
                const wrap = el.closest('label');
                if (wrap) return clean(wrap.innerText);
                const field = el.closest('.field, .form-field, [class*="question"], fieldset');
                if (field) {{
                    const l = field.querySelector('label, legend');
                    if (l) return clean(l.innerText);
                }}
                return '';
            }};
            const marker = /select__control|select-shell|select__container|dropdown|combobox/i;
            const containerClass = (el) => {{
                let node = el.parentElement;
                for (let depth = 0; node && depth < 5; depth++, node = node.parentElement) {{
                    const cls = typeof node.className === 'string' ? node.className : '';
                    if (marker.test(cls)) return cls;
                }}
                return '';
            }};
            const skipped = ['hidden', 'submit', 'button', 'reset', 'image'];
            return Array.from(document.querySelectorAll('input, select, textarea'))
                .filter(el => !skipped.includes((el.getAttribute('type') || '').toLowerCase()))
                .map(el => ({{
                    tag: el.tagName.toLowerCase(),
                    inputType: (el.getAttribute('type') || '').toLowerCase(),
                    id: el.id || '',
                    name: el.getAttribute('name') || '',
                    role: el.getAttribute('role') || '',
                    readonly: el.readOnly === true || el.hasAttribute('readonly'),
                    required: el.required === true || el.getAttribute('aria-required') === 'true',
                    ariaControls: el.getAttribute('aria-controls') || '',
                    ariaOwns: el.getAttribute('aria-owns') || '',
                    ariaHaspopup: el.getAttribute('aria-haspopup') || '',
                    dataControls: el.getAttribute('data-controls') || '',
                    list: el.getAttribute('list') || '',
                    containerClass: containerClass(el),
                    label: labelFor(el),
                    ariaLabel: el.getAttribute('aria-label') || '',
                    placeholder: el.getAttribute('placeholder') || '',
                    options: el.tagName === 'SELECT' ? Array.from(el.options).map(o => clean(o.text)) : [],
                    visible: visible(el),
                }}));
        }})()
        "#
    )
}

/// 按策略定位；命中的元素打上 `data-af-ref` 以便后续直接选中
pub fn locate(anchor: &str, token: Option<&str>, strategy: &LocatorStrategy) -> String {
    let token = token.map(lit).unwrap_or_else(|| "null".to_string());
    format!(
        r#"
        (() => {{
            {HELPERS}
            const el = document.querySelector({anchor});
            if (!el) return null;
            const token = {token};
            const t = (function (el, token) {{ return {extract}; }})(el, token);
            if (!t || !visible(t) || t.disabled) return null;
            if (!(function (t, el) {{ return {predicate}; }})(t, el)) return null;
            if (!t.getAttribute('data-af-ref')) {{
                window.__afRef = (window.__afRef || 0) + 1;
                t.setAttribute('data-af-ref', 'af-' + window.__afRef);
            }}
            return '[data-af-ref="' + t.getAttribute('data-af-ref') + '"]';
        }})()
        "#,
        anchor = lit(anchor),
        extract = strategy.extract,
        predicate = strategy.predicate,
    )
}

pub fn click(selector: &str) -> String {
    format!(
        r#"
        (() => {{
            {HELPERS}
            const el = document.querySelector({sel});
            if (!el) return false;
            if (typeof el.focus === 'function') el.focus();
            press(el);
            return true;
        }})()
        "#,
        sel = lit(selector)
    )
}

pub fn fill(selector: &str, value: &str) -> String {
    format!(
        r#"
        (() => {{
            const el = document.querySelector({sel});
            if (!el) return false;
            el.focus();
            const proto = el.tagName === 'TEXTAREA' ? HTMLTextAreaElement.prototype : HTMLInputElement.prototype;
            const setter = Object.getOwnPropertyDescriptor(proto, 'value').set;
            setter.call(el, {value});
            el.dispatchEvent(new Event('input', {{ bubbles: true }}));
            el.dispatchEvent(new Event('change', {{ bubbles: true }}));
            el.dispatchEvent(new FocusEvent('focusout', {{ bubbles: true }}));
            return true;
        }})()
        "#,
        sel = lit(selector),
        value = lit(value)
    )
}

pub fn read_value(selector: &str) -> String {
    format!(
        r#"
        (() => {{
            const el = document.querySelector({sel});
            if (!el) return null;
            if (el.tagName === 'SELECT') {{
                const opt = el.selectedOptions[0];
                return opt ? opt.text.replace(/\s+/g, ' ').trim() : null;
            }}
            return el.value === '' ? null : el.value;
        }})()
        "#,
        sel = lit(selector)
    )
}

pub fn select_native(selector: &str, option_text: &str) -> String {
    format!(
        r#"
        (() => {{
            const el = document.querySelector({sel});
            if (!el || el.tagName !== 'SELECT') return false;
            const wanted = {text};
            const opt = Array.from(el.options).find(o => o.text.replace(/\s+/g, ' ').trim() === wanted);
            if (!opt) return false;
            el.value = opt.value;
            el.dispatchEvent(new Event('input', {{ bubbles: true }}));
            el.dispatchEvent(new Event('change', {{ bubbles: true }}));
            return true;
        }})()
        "#,
        sel = lit(selector),
        text = lit(option_text)
    )
}

pub fn option_texts(menu: &str, option_selector: &str) -> String {
    format!(
        r#"
        (() => {{
            {HELPERS}
            const menu = document.querySelector({menu});
            if (!menu) return [];
            return Array.from(menu.querySelectorAll({opt})).filter(visible).map(n => clean(n.innerText));
        }})()
        "#,
        menu = lit(menu),
        opt = lit(option_selector)
    )
}

pub fn click_option(menu: &str, option_selector: &str, index: usize) -> String {
    format!(
        r#"
        (() => {{
            {HELPERS}
            const menu = document.querySelector({menu});
            if (!menu) return false;
            const entry = Array.from(menu.querySelectorAll({opt})).filter(visible)[{index}];
            if (!entry) return false;
            press(entry);
            return true;
        }})()
        "#,
        menu = lit(menu),
        opt = lit(option_selector),
        index = index
    )
}

pub fn notify_change(selector: &str) -> String {
    format!(
        r#"
        (() => {{
            const el = document.querySelector({sel});
            if (!el) return false;
            el.dispatchEvent(new Event('input', {{ bubbles: true }}));
            el.dispatchEvent(new Event('change', {{ bubbles: true }}));
            el.dispatchEvent(new FocusEvent('focusout', {{ bubbles: true }}));
            return true;
        }})()
        "#,
        sel = lit(selector)
    )
}

pub fn read_committed(selector: &str) -> String {
    format!(
        r#"
        (() => {{
            const clean = (s) => (s || '').replace(/\s+/g, ' ').trim();
            const el = document.querySelector({sel});
            if (!el) return null;
            const box = el.closest('[class*="select__control"], [class*="select-shell"], [class*="select__container"], .field') || el.parentElement;
            const shown = box && box.querySelector('[class*="single-value"], [class*="singleValue"], [class*="selected-value"]');
            if (shown && clean(shown.innerText)) return clean(shown.innerText);
            if (el.value) return clean(el.value);
            const hidden = box && box.querySelector('input[type="hidden"]');
            return hidden && hidden.value ? clean(hidden.value) : null;
        }})()
        "#,
        sel = lit(selector)
    )
}

pub fn dismiss() -> String {
    r#"
    (() => {
        const active = document.activeElement;
        if (!active) return false;
        active.dispatchEvent(new KeyboardEvent('keydown', { key: 'Escape', bubbles: true }));
        if (typeof active.blur === 'function') active.blur();
        return true;
    })()
    "#
    .to_string()
}

pub fn click_button_with_text(candidates: &[&str]) -> String {
    let list = serde_json::to_string(candidates).unwrap_or_else(|_| "[]".to_string());
    format!(
        r#"
        (() => {{
            {HELPERS}
            const wanted = {list}.map(c => c.toLowerCase());
            const nodes = Array.from(document.querySelectorAll('button, a, input[type="submit"], [role="button"]')).filter(visible);
            for (const word of wanted) {{
                const hit = nodes.find(n => clean(n.innerText || n.value).toLowerCase().includes(word));
                if (hit) {{
                    press(hit);
                    return true;
                }}
            }}
            return false;
        }})()
        "#
    )
}

pub fn body_text() -> String {
    "(() => document.body ? document.body.innerText : '')()".to_string()
}
