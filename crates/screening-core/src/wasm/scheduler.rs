use crate::host::{HostError, Scheduler};
use async_trait::async_trait;
use js_sys::{Date, Function, Promise};
use std::time::Duration;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen::closure::Closure;
use wasm_bindgen_futures::JsFuture;

/// `setTimeout`-driven scheduler on the page's event loop.
pub struct TimerScheduler {
    origin_ms: f64,
}

impl TimerScheduler {
    pub fn new() -> Self {
        Self {
            origin_ms: Date::now(),
        }
    }
}

impl Default for TimerScheduler {
    fn default() -> Self {
        Self::new()
    }
}

fn set_timeout(callback: &Function, delay: Duration) -> bool {
    match web_sys::window() {
        Some(window) => window
            .set_timeout_with_callback_and_timeout_and_arguments_0(callback, delay.as_millis() as i32)
            .is_ok(),
        None => false,
    }
}

#[async_trait(?Send)]
impl Scheduler for TimerScheduler {
    fn now(&self) -> Duration {
        Duration::from_secs_f64(((Date::now() - self.origin_ms) / 1000.0).max(0.0))
    }

    async fn sleep(&self, duration: Duration) {
        let promise = Promise::new(&mut |resolve, _reject| {
            if !set_timeout(&resolve, duration) {
                let _ = resolve.call0(&JsValue::NULL);
            }
        });
        let _ = JsFuture::from(promise).await;
    }

    fn defer(&self, delay: Duration, task: Box<dyn FnOnce()>) -> Result<(), HostError> {
        let callback = Closure::once_into_js(move || task());
        if set_timeout(callback.unchecked_ref(), delay) {
            Ok(())
        } else {
            Err(HostError::Platform("setTimeout unavailable".into()))
        }
    }
}
