pub mod decorators;

use crate::core::urls::{view_fn, Request, Response, ViewFn};
use crate::utils::error::Result;
use std::fmt;

/// 可登記在模組中的視圖類別
#[derive(Clone)]
pub struct ViewClass {
    name: String,
    handler: ViewFn,
}

impl ViewClass {
    pub fn new<F>(name: &str, handler: F) -> Self
    where
        F: Fn(&Request) -> Result<Response> + Send + Sync + 'static,
    {
        Self {
            name: name.to_string(),
            handler: view_fn(handler),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn as_view(&self) -> ViewFn {
        self.handler.clone()
    }
}

impl fmt::Debug for ViewClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewClass").field("name", &self.name).finish()
    }
}

/// 直接渲染固定模板的視圖
pub fn template_view(template_name: &str) -> ViewFn {
    let template_name = template_name.to_string();
    view_fn(move |_request: &Request| Ok(Response::render(&template_name)))
}
