use std::sync::Arc;

use opcua::server::callbacks;
use opcua::server::prelude::*;
use opcua::server::session::SessionManager;
use opcua::sync::RwLock;

use crate::diagnosis::{parse_command, CommandError, DiagnosisLed, LedCommand};

/// `dropMessage(Receiver: String, Message: String)`
pub struct DropMessage {
    led: Arc<DiagnosisLed>,
}

impl DropMessage {
    pub fn new(led: Arc<DiagnosisLed>) -> Self {
        Self { led }
    }

    /// Validates the input arguments into a command for this LED.
    pub fn command(&self, args: &[Variant]) -> Result<LedCommand, CommandError> {
        if args.len() != 2 {
            return Err(CommandError::ArgumentCount(args.len()));
        }
        let receiver = string_arg(args, 0)?;
        let message = string_arg(args, 1)?;
        parse_command(self.led.receiver(), receiver, message)
    }
}

fn string_arg(args: &[Variant], index: usize) -> Result<&str, CommandError> {
    match &args[index] {
        Variant::String(s) => Ok(s.as_ref()),
        _ => Err(CommandError::NotAString(index)),
    }
}

impl callbacks::Method for DropMessage {
    fn call(
        &mut self,
        _session_id: &NodeId,
        _session_manager: Arc<RwLock<SessionManager>>,
        request: &CallMethodRequest,
    ) -> Result<CallMethodResult, StatusCode> {
        let args = request.input_arguments.as_deref().unwrap_or(&[]);
        let command = self.command(args).map_err(|e| {
            tracing::info!("Rejected dropMessage: {}", e);
            StatusCode::BadMethodInvalid
        })?;

        self.led.switch(command).map_err(|e| {
            tracing::warn!("Failed to drive diagnosis LED: {:#}", e);
            StatusCode::BadCommunicationError
        })?;

        Ok(CallMethodResult {
            status_code: StatusCode::Good,
            input_argument_results: Some(vec![StatusCode::Good, StatusCode::Good]),
            input_argument_diagnostic_infos: None,
            output_arguments: None,
        })
    }
}
