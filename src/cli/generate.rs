//! One-shot generation command

use anyhow::Result;

use crate::app::AppContext;
use crate::config::{GatewayConfig, GenerationRequest};

/// Submit one request through the executor and print the generated text
pub async fn generate(config: GatewayConfig, request: GenerationRequest) -> Result<()> {
    let submission = request.validate()?;
    let ctx = AppContext::launch(&config).await?;

    let result = match ctx.backend.submit(submission) {
        Ok(handle) => ctx.backend.wait(handle).await,
        Err(e) => Err(e),
    };
    ctx.release().await;

    println!("{}", result?);
    Ok(())
}
