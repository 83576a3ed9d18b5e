//! Single tool call execution against a provider

use crate::error::Error;
use crate::tools::{ToolCallRequest, ToolCallResult, ToolDescriptor, ToolFailure, ToolProvider};
use std::time::Instant;
use tracing::{info, warn};

/// Executes one tool call at a time; every outcome is returned as data
pub struct ToolInvoker<'a> {
    provider: &'a dyn ToolProvider,
}

impl<'a> ToolInvoker<'a> {
    pub fn new(provider: &'a dyn ToolProvider) -> Self {
        Self { provider }
    }

    /// Execute a call with exactly one provider round-trip.
    ///
    /// When a descriptor is given the arguments are checked against its
    /// schema first, and a mismatch fails without contacting the provider.
    pub async fn invoke(
        &self,
        call: &ToolCallRequest,
        descriptor: Option<&ToolDescriptor>,
    ) -> ToolCallResult {
        let start_time = Instant::now();

        let checked = call.argument_map().and_then(|arguments| {
            if let Some(descriptor) = descriptor {
                descriptor.check_arguments(&arguments)?;
            }
            Ok(arguments)
        });
        let arguments = match checked {
            Ok(arguments) => arguments,
            Err(e) => {
                warn!("Rejected arguments for tool '{}': {}", call.tool_name, e);
                return ToolCallResult::failure(call, ToolFailure::InvalidArguments, e)
                    .with_duration(start_time.elapsed().as_millis() as u64);
            }
        };

        info!("Calling tool '{}' on '{}'", call.tool_name, self.provider.name());
        let outcome = self.provider.call_tool(&call.tool_name, arguments).await;
        let duration = start_time.elapsed().as_millis() as u64;

        let result = match outcome {
            Ok(output) if output.is_error => {
                ToolCallResult::failure(call, ToolFailure::Execution, output.content)
            }
            Ok(output) => ToolCallResult::success(call, output.content).with_data(output.data),
            Err(e @ Error::Provider(_)) => {
                ToolCallResult::failure(call, ToolFailure::Unavailable, e.to_string())
            }
            Err(e) => ToolCallResult::failure(call, ToolFailure::Execution, e.to_string()),
        };

        if result.success {
            info!("Tool '{}' finished in {}ms", call.tool_name, duration);
        } else {
            warn!(
                "Tool '{}' failed after {}ms: {}",
                call.tool_name, duration, result.content
            );
        }
        result.with_duration(duration)
    }
}
