//! Handler chain and continuation passing.
//!
//! # Flow
//!
//! ```text
//! Pipeline::execute(request, terminal)
//!     → handlers[0].execute(request, next₀)
//!         → next₀.run(request) → handlers[1].execute(request, next₁)
//!             → ... → nextₙ.run(request) → terminal.handle(request)
//! ```
//!
//! Each continuation holds the remaining handler slice and the terminal
//! handler. A handler short-circuits by returning a response without
//! calling `next.run`.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;

use crate::error::PipelineError;
use crate::pipeline::{Request, Response};

/// A step in the request pipeline.
///
/// Client rejections are returned as `Ok(Response)`. `Err` is reserved for
/// faults that should surface as a 500.
#[async_trait]
pub trait Handler: Send + Sync {
    /// Stable name used in logs and chain-state errors.
    fn name(&self) -> &'static str;

    async fn execute(&self, request: Request, next: Next<'_>) -> Result<Response, PipelineError>;
}

/// The route handler invoked once every pipeline handler has delegated.
#[async_trait]
pub trait RouteHandler: Send + Sync {
    async fn handle(&self, request: Request) -> Result<Response, PipelineError>;
}

#[async_trait]
impl<F, Fut> RouteHandler for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Response, PipelineError>> + Send + 'static,
{
    async fn handle(&self, request: Request) -> Result<Response, PipelineError> {
        (self)(request).await
    }
}

/// Continuation handed to a handler: runs the rest of the chain.
///
/// A continuation fires at most once. A second `run` returns
/// [`PipelineError::InvalidChainState`] without touching the chain.
pub struct Next<'a> {
    owner: &'static str,
    remaining: &'a [Arc<dyn Handler>],
    terminal: &'a dyn RouteHandler,
    fired: AtomicBool,
}

impl<'a> Next<'a> {
    fn new(
        owner: &'static str,
        remaining: &'a [Arc<dyn Handler>],
        terminal: &'a dyn RouteHandler,
    ) -> Self {
        Self {
            owner,
            remaining,
            terminal,
            fired: AtomicBool::new(false),
        }
    }

    pub async fn run(&self, request: Request) -> Result<Response, PipelineError> {
        if self.fired.swap(true, Ordering::AcqRel) {
            return Err(PipelineError::InvalidChainState {
                handler: self.owner,
            });
        }

        match self.remaining.split_first() {
            Some((handler, rest)) => {
                let next = Next::new(handler.name(), rest, self.terminal);
                handler.execute(request, next).await
            }
            None => self.terminal.handle(request).await,
        }
    }
}

/// Ordered handler chain. Registration order is execution order.
#[derive(Clone, Default)]
pub struct Pipeline {
    handlers: Vec<Arc<dyn Handler>>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a handler to the end of the chain.
    pub fn with<H: Handler + 'static>(mut self, handler: H) -> Self {
        self.handlers.push(Arc::new(handler));
        self
    }

    pub fn handler_names(&self) -> Vec<&'static str> {
        self.handlers.iter().map(|h| h.name()).collect()
    }

    /// Run `request` through every handler, then `terminal`.
    ///
    /// Failures from handlers or the terminal propagate unchanged.
    pub async fn execute(
        &self,
        request: Request,
        terminal: &dyn RouteHandler,
    ) -> Result<Response, PipelineError> {
        Next::new("pipeline", &self.handlers, terminal)
            .run(request)
            .await
    }
}
