//! WebAssembly bindings for IPFence

use std::net::IpAddr;
use std::sync::OnceLock;

use wasm_bindgen::prelude::*;

use ipf_compiler::{decompose_range_text, parse_address, Filter, FilterConfig, Verdict};

static FILTER: OnceLock<Filter> = OnceLock::new();

fn build_from_json(config_json: &str) -> Result<Filter, String> {
    FilterConfig::from_json(config_json)
        .and_then(|config| config.build())
        .map_err(|e| format!("Failed to build filter: {}", e))
}

fn parse_all<I>(addrs: I) -> Result<Vec<IpAddr>, String>
where
    I: IntoIterator<Item = String>,
{
    addrs
        .into_iter()
        .map(|addr| parse_address(&addr).map_err(|e| e.to_string()))
        .collect()
}

/// Verdict for `addr`; [`Verdict::Pass`] until a filter is installed.
fn verdict_for(filter: Option<&Filter>, addr: &str) -> Result<Verdict, String> {
    let ip = parse_address(addr).map_err(|e| e.to_string())?;
    Ok(filter.map_or(Verdict::Pass, |f| f.verdict(ip)))
}

#[wasm_bindgen]
pub fn init(config_json: &str) -> Result<(), JsValue> {
    if FILTER.get().is_some() {
        return Err(JsValue::from_str("Already initialized. Reload the page to reinitialize."));
    }

    let filter = build_from_json(config_json).map_err(|e| JsValue::from_str(&e))?;

    FILTER
        .set(filter)
        .map_err(|_| JsValue::from_str("Failed to set filter state"))?;

    Ok(())
}

#[wasm_bindgen]
pub fn is_initialized() -> bool {
    FILTER.get().is_some()
}

/// Verdict name (`"allow"`, `"block"` or `"pass"`) for one address.
#[wasm_bindgen]
pub fn check(addr: &str) -> Result<String, JsValue> {
    verdict_for(FILTER.get(), addr)
        .map(|v| v.as_str().to_string())
        .map_err(|e| JsValue::from_str(&e))
}

/// Verdict name for a group of addresses answered together.
#[wasm_bindgen]
pub fn check_answers(addrs: JsValue) -> Result<String, JsValue> {
    let array = js_sys::Array::from(&addrs);
    let texts = array
        .iter()
        .map(|value| {
            value
                .as_string()
                .ok_or_else(|| JsValue::from_str("Address must be a string"))
        })
        .collect::<Result<Vec<_>, _>>()?;
    let ips = parse_all(texts).map_err(|e| JsValue::from_str(&e))?;

    let verdict = match FILTER.get() {
        Some(filter) => filter.verdict_any(ips),
        None => Verdict::Pass,
    };
    Ok(verdict.as_str().to_string())
}

#[wasm_bindgen]
pub fn get_filter_info() -> JsValue {
    let result = js_sys::Object::new();
    let Some(filter) = FILTER.get() else {
        let _ = js_sys::Reflect::set(&result, &"initialized".into(), &JsValue::from(false));
        return result.into();
    };

    let stats = filter.stats();
    let _ = js_sys::Reflect::set(&result, &"initialized".into(), &JsValue::from(true));
    let _ = js_sys::Reflect::set(&result, &"blockV4".into(), &JsValue::from(stats.block.v4_total() as u32));
    let _ = js_sys::Reflect::set(&result, &"blockV6".into(), &JsValue::from(stats.block.v6 as u32));
    let _ = js_sys::Reflect::set(&result, &"hasAllowList".into(), &JsValue::from(stats.allow.is_some()));
    if let Some(allow) = stats.allow {
        let _ = js_sys::Reflect::set(&result, &"allowV4".into(), &JsValue::from(allow.v4_total() as u32));
        let _ = js_sys::Reflect::set(&result, &"allowV6".into(), &JsValue::from(allow.v6 as u32));
    }

    let buckets = js_sys::Object::new();
    let _ = js_sys::Reflect::set(&buckets, &"p8".into(), &JsValue::from(stats.block.v4_p8 as u32));
    let _ = js_sys::Reflect::set(&buckets, &"p16".into(), &JsValue::from(stats.block.v4_p16 as u32));
    let _ = js_sys::Reflect::set(&buckets, &"p24".into(), &JsValue::from(stats.block.v4_p24 as u32));
    let _ = js_sys::Reflect::set(&buckets, &"rest".into(), &JsValue::from(stats.block.v4_rest as u32));
    let _ = js_sys::Reflect::set(&result, &"blockBuckets".into(), &buckets);

    result.into()
}

/// Minimal CIDR cover of `start..=end`, as an array of strings.
#[wasm_bindgen]
pub fn decompose_range(start: &str, end: &str) -> Result<JsValue, JsValue> {
    let blocks = decompose_range_text(start, end).map_err(|e| JsValue::from_str(&e.to_string()))?;

    let array = js_sys::Array::new_with_length(blocks.len() as u32);
    for (i, block) in blocks.iter().enumerate() {
        array.set(i as u32, JsValue::from_str(&block.to_string()));
    }
    Ok(array.into())
}
