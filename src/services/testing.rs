//! 测试用模型替身

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::llm::{Instruction, LlmError, OutputSchema};

use super::model_client::ModelClient;

/// 记录调用次数并返回预设结果的模型
pub struct ScriptedModel {
    calls: AtomicUsize,
    reply: Mutex<Option<Result<Value, LlmError>>>,
    seen: Mutex<Vec<Instruction>>,
}

impl ScriptedModel {
    pub fn replying(reply: Result<Value, LlmError>) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            reply: Mutex::new(Some(reply)),
            seen: Mutex::new(Vec::new()),
        })
    }

    /// 出站调用次数
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// 收到的指令
    pub fn seen(&self) -> Vec<Instruction> {
        self.seen.lock().clone()
    }
}

#[async_trait]
impl ModelClient for ScriptedModel {
    async fn generate(
        &self,
        instruction: &Instruction,
        _schema: &OutputSchema,
    ) -> Result<Value, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().push(instruction.clone());
        self.reply
            .lock()
            .take()
            .unwrap_or_else(|| Err(LlmError::InvalidReply("no scripted reply".to_string())))
    }

    fn model_name(&self) -> String {
        "scripted".to_string()
    }
}
