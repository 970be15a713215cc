//! HTTP 请求封装模块
//!
//! 使用 `web_sys::fetch` 实现核心库的 `HttpClient`。

use battwatch::error::{AppError, AppResult};
use battwatch::request::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;
use web_sys::{Headers, Request, RequestInit, Response};

fn method_str(method: HttpMethod) -> &'static str {
    match method {
        HttpMethod::Get => "GET",
        HttpMethod::Post => "POST",
    }
}

fn js_err(context: &str, e: JsValue) -> AppError {
    AppError::Network(format!("{}: {:?}", context, e))
}

/// 构建 fetch 请求
fn build_request(req: &HttpRequest) -> AppResult<Request> {
    let headers = Headers::new().map_err(|e| js_err("创建 Headers 失败", e))?;
    for (key, value) in &req.headers {
        headers
            .set(key, value)
            .map_err(|e| js_err("设置 Header 失败", e))?;
    }

    let opts = RequestInit::new();
    opts.set_method(method_str(req.method));
    opts.set_headers(&headers.into());
    if let Some(body) = &req.body {
        opts.set_body(&JsValue::from_str(body));
    }

    Request::new_with_str_and_init(&req.url, &opts).map_err(|e| js_err("请求构建失败", e))
}

/// 读取响应体文本
async fn read_text(response: &Response) -> AppResult<String> {
    let promise = response.text().map_err(|e| js_err("读取响应失败", e))?;
    let text = JsFuture::from(promise)
        .await
        .map_err(|e| js_err("读取响应失败", e))?;
    Ok(text.as_string().unwrap_or_default())
}

/// 基于浏览器 fetch 的客户端
///
/// 只有 fetch 被拒绝（断网、CORS）时返回 `Err`，非 2xx 状态照常返回。
#[derive(Debug, Clone, Copy, Default)]
pub struct FetchClient;

#[async_trait::async_trait(?Send)]
impl HttpClient for FetchClient {
    async fn send(&self, req: HttpRequest) -> AppResult<HttpResponse> {
        let request = build_request(&req)?;

        let window =
            web_sys::window().ok_or_else(|| AppError::Network("无法获取 window 对象".into()))?;

        let resp_value = JsFuture::from(window.fetch_with_request(&request))
            .await
            .map_err(|e| js_err("网络错误", e))?;

        let response: Response = resp_value
            .dyn_into()
            .map_err(|e| js_err("Response 类型转换失败", e))?;

        let status = response.status();
        let body = read_text(&response).await?;
        Ok(HttpResponse { status, body })
    }
}
