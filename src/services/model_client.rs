//! 模型调用能力接口

use async_trait::async_trait;
use serde_json::Value;

use crate::llm::{Instruction, LlmError, OutputSchema};

/// 外部模型调用的抽象边界
///
/// 实现方负责传输和厂商细节；一次调用对应一次出站请求，不做重试
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// 提交指令和要求的输出结构，返回模型给出的结构化结果
    async fn generate(
        &self,
        instruction: &Instruction,
        schema: &OutputSchema,
    ) -> Result<Value, LlmError>;

    /// 当前使用的模型名（用于日志）
    fn model_name(&self) -> String {
        String::new()
    }
}
